//! Configuration loading and typed config structures for the Deskbound simulation.
//!
//! The canonical configuration lives in `deskbound-config.yaml` at the
//! project root. Every field has a default, so an empty document yields a
//! playable office: a 10x10 grid, the standard tier table, a shop selling
//! tables, plants and employees.

use std::path::Path;

use deskbound_agents::TierTable;
use deskbound_ledger::ShopOffer;
use deskbound_types::{FootprintSize, GridCell, Tier, WorldPoint};
use deskbound_world::PrefabDef;
use serde::Deserialize;
use tracing::warn;

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is not usable.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `deskbound-config.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Grid size, placement in the world, pre-occupied cells.
    #[serde(default)]
    pub grid: GridConfig,

    /// Scheduler step length and seek retry interval.
    #[serde(default)]
    pub time: TimeConfig,

    /// Work interval and payout per tier.
    #[serde(default)]
    pub tiers: TierTable,

    /// Money settings.
    #[serde(default)]
    pub economy: EconomyConfig,

    /// Items on sale and their escalating costs.
    #[serde(default = "default_shop")]
    pub shop: Vec<ShopItemConfig>,

    /// Placeable object definitions.
    #[serde(default = "default_prefabs")]
    pub prefabs: Vec<PrefabDef>,

    /// Settings for the built-in straight-line navigator.
    #[serde(default)]
    pub navigation: NavigationConfig,

    /// Run boundaries and real-time pacing.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,

    /// Seed for cosmetic randomness.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            time: TimeConfig::default(),
            tiers: TierTable::default(),
            economy: EconomyConfig::default(),
            shop: default_shop(),
            prefabs: default_prefabs(),
            navigation: NavigationConfig::default(),
            simulation: SimulationBoundsConfig::default(),
            seed: default_seed(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override run boundaries:
    /// - `DESKBOUND_TICK_INTERVAL_MS` overrides `simulation.tick_interval_ms`
    /// - `DESKBOUND_MAX_TICKS` overrides `simulation.max_ticks`
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string. Blank input yields defaults.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.simulation.apply_env_overrides();
        Ok(config)
    }

    /// Look up a prefab by name.
    pub fn prefab(&self, name: &str) -> Option<&PrefabDef> {
        self.prefabs.iter().find(|prefab| prefab.name == name)
    }

    /// Check every value the simulation relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.width == 0 || self.grid.height == 0 {
            return Err(invalid("grid", "width and height must be at least 1"));
        }
        if !self.grid.cell_size.is_finite() || self.grid.cell_size <= 0.0 {
            return Err(invalid("grid.cell_size", "must be a positive number"));
        }
        if self.time.tick_ms == 0 {
            return Err(invalid("time.tick_ms", "must be at least 1"));
        }
        if self.time.seek_retry_ms == 0 {
            return Err(invalid("time.seek_retry_ms", "must be at least 1"));
        }
        for tier in Tier::ALL {
            if self.tiers.profile(tier).work_interval_ms == 0 {
                return Err(invalid(format!("tiers.{tier}.work_interval_ms"), "must be at least 1"));
            }
        }
        if !self.navigation.agent_speed.is_finite() || self.navigation.agent_speed <= 0.0 {
            return Err(invalid("navigation.agent_speed", "must be a positive number"));
        }
        if !self.navigation.stopping_distance.is_finite() || self.navigation.stopping_distance < 0.0 {
            return Err(invalid("navigation.stopping_distance", "must be zero or positive"));
        }
        for (i, prefab) in self.prefabs.iter().enumerate() {
            if self.prefabs.iter().skip(i.saturating_add(1)).any(|other| other.name == prefab.name) {
                return Err(invalid(format!("prefabs.{}", prefab.name), "defined more than once"));
            }
        }
        for item in &self.shop {
            if item.costs.is_empty() {
                return Err(invalid(format!("shop.{}.costs", item.name), "needs at least one cost"));
            }
            match &item.offer {
                ShopOffer::Placeable { prefab } if self.prefab(prefab).is_none() => {
                    return Err(invalid(
                        format!("shop.{}.offer.prefab", item.name),
                        format!("unknown prefab `{prefab}`"),
                    ));
                }
                ShopOffer::Placeable { .. } | ShopOffer::Employee { .. } => {}
            }
        }
        Ok(())
    }
}

/// A rectangle of cells blocked from the start (walls, pillars).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ObstacleConfig {
    /// Lowest column.
    pub x: i32,
    /// Lowest row.
    pub y: i32,
    /// Width in cells.
    #[serde(default = "default_one")]
    pub width: u32,
    /// Height in cells.
    #[serde(default = "default_one")]
    pub height: u32,
}

impl ObstacleConfig {
    /// Origin cell of the obstacle.
    pub const fn origin(&self) -> GridCell {
        GridCell::new(self.x, self.y)
    }

    /// Size of the obstacle.
    pub const fn size(&self) -> FootprintSize {
        FootprintSize::new(self.width, self.height)
    }
}

/// Grid configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GridConfig {
    /// Number of columns.
    #[serde(default = "default_grid_extent")]
    pub width: u32,

    /// Number of rows.
    #[serde(default = "default_grid_extent")]
    pub height: u32,

    /// Edge length of one cell in world units.
    #[serde(default = "default_cell_size")]
    pub cell_size: f64,

    /// World x of the grid's corner.
    #[serde(default)]
    pub origin_x: f64,

    /// World z of the grid's corner.
    #[serde(default)]
    pub origin_z: f64,

    /// Grid rotation around its corner, counter-clockwise in degrees.
    #[serde(default)]
    pub rotation_degrees: f64,

    /// Cells occupied before anything is placed.
    #[serde(default)]
    pub obstacles: Vec<ObstacleConfig>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: default_grid_extent(),
            height: default_grid_extent(),
            cell_size: default_cell_size(),
            origin_x: 0.0,
            origin_z: 0.0,
            rotation_degrees: 0.0,
            obstacles: Vec::new(),
        }
    }
}

/// Simulated time configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TimeConfig {
    /// Simulated milliseconds per scheduler step.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Delay between failed claim attempts of a seeking employee.
    #[serde(default = "default_seek_retry_ms")]
    pub seek_retry_ms: u64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            seek_retry_ms: default_seek_retry_ms(),
        }
    }
}

/// Economy configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct EconomyConfig {
    /// Coins in the wallet at start.
    #[serde(default)]
    pub starting_money: u64,
}

/// One item on sale.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShopItemConfig {
    /// Unique item name.
    pub name: String,
    /// What the item delivers.
    pub offer: ShopOffer,
    /// Price of the first, second, ... purchase. The last entry repeats.
    pub costs: Vec<u64>,
}

/// Built-in navigator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct NavigationConfig {
    /// Walking speed in world units per simulated second.
    #[serde(default = "default_agent_speed")]
    pub agent_speed: f64,

    /// Distance at which an employee counts as arrived.
    #[serde(default = "default_stopping_distance")]
    pub stopping_distance: f64,

    /// Where hired employees appear.
    #[serde(default)]
    pub spawn_point: WorldPoint,

    /// Scheduler steps before a new employee is on the navmesh.
    #[serde(default = "default_navmesh_ready_ticks")]
    pub navmesh_ready_ticks: u32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            agent_speed: default_agent_speed(),
            stopping_distance: default_stopping_distance(),
            spawn_point: WorldPoint::ORIGIN,
            navmesh_ready_ticks: default_navmesh_ready_ticks(),
        }
    }
}

/// Run boundary configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Maximum number of scheduler steps (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,

    /// Maximum wall-clock seconds (0 = unlimited).
    #[serde(default)]
    pub max_real_time_seconds: u64,

    /// Real-time milliseconds between scheduler steps (0 = as fast as possible).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for SimulationBoundsConfig {
    fn default() -> Self {
        Self {
            max_ticks: 0,
            max_real_time_seconds: 0,
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl SimulationBoundsConfig {
    /// Override boundaries with environment variables when set.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(val) = env_u64("DESKBOUND_TICK_INTERVAL_MS") {
            self.tick_interval_ms = val;
        }
        if let Some(val) = env_u64("DESKBOUND_MAX_TICKS") {
            self.max_ticks = val;
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(val) => Some(val),
        Err(err) => {
            warn!(key, value = %raw, error = %err, "ignoring unparseable environment override");
            None
        }
    }
}

const fn default_seed() -> u64 {
    42
}

const fn default_one() -> u32 {
    1
}

const fn default_grid_extent() -> u32 {
    10
}

const fn default_cell_size() -> f64 {
    1.0
}

const fn default_tick_ms() -> u64 {
    100
}

const fn default_seek_retry_ms() -> u64 {
    1000
}

const fn default_agent_speed() -> f64 {
    3.5
}

const fn default_stopping_distance() -> f64 {
    0.1
}

const fn default_navmesh_ready_ticks() -> u32 {
    1
}

const fn default_tick_interval_ms() -> u64 {
    100
}

fn default_prefabs() -> Vec<PrefabDef> {
    vec![
        PrefabDef {
            name: String::from("table"),
            footprint: Some(FootprintSize::new(2, 1)),
            interaction_offsets: vec![WorldPoint::new(0.0, -1.0), WorldPoint::new(0.0, 1.0)],
            resource: true,
        },
        PrefabDef {
            name: String::from("plant"),
            footprint: Some(FootprintSize::new(1, 1)),
            interaction_offsets: Vec::new(),
            resource: false,
        },
    ]
}

fn default_shop() -> Vec<ShopItemConfig> {
    let placeable = |name: &str, costs: Vec<u64>| ShopItemConfig {
        name: name.to_owned(),
        offer: ShopOffer::Placeable {
            prefab: name.to_owned(),
        },
        costs,
    };
    let employee = |tier: Tier, costs: Vec<u64>| ShopItemConfig {
        name: tier.as_str().to_owned(),
        offer: ShopOffer::Employee { tier },
        costs,
    };
    vec![
        placeable("table", vec![0, 50, 100, 200, 400]),
        placeable("plant", vec![10]),
        employee(Tier::Intern, vec![0, 40, 80]),
        employee(Tier::Junior, vec![150, 250]),
        employee(Tier::Mid, vec![400, 600]),
        employee(Tier::Senior, vec![1000, 1500]),
    ]
}
