//! Enumeration types for the Deskbound simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Seniority of an employee.
///
/// The tier is fixed when the employee is hired. It selects the work
/// interval and the payout per work tick from the tier table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Tier {
    /// Slowest and cheapest.
    Intern,
    /// Second tier.
    Junior,
    /// Third tier.
    Mid,
    /// Fastest and best paid.
    Senior,
}

impl Tier {
    /// Every tier, from lowest to highest.
    pub const ALL: [Self; 4] = [Self::Intern, Self::Junior, Self::Mid, Self::Senior];

    /// Lowercase name used in configuration and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Intern => "intern",
            Self::Junior => "junior",
            Self::Mid => "mid",
            Self::Senior => "senior",
        }
    }
}

impl core::fmt::Display for Tier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse phase of an employee's task state machine.
///
/// The full state (deadlines, assigned resource, destination) lives in the
/// agents crate; this projection is what observers and events carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TaskPhase {
    /// Spawned, waiting for the navigator to report it is on the navmesh.
    AwaitingNavmesh,
    /// Looking for a free resource, retrying on a fixed interval.
    Seeking,
    /// Walking to the interaction point of a claimed resource.
    Traveling,
    /// Sitting at a resource and producing periodic payouts.
    Working,
}

/// State of the active placement session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum PlacementMode {
    /// The ghost follows the pointer and is re-validated on every update.
    FreeFloat,
    /// The ghost is anchored at a grid cell, pending confirm or cancel.
    Locked,
}

/// Why a placement session ended without placing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum CancelReason {
    /// The user cancelled.
    Explicit,
    /// A new session was started while this one was active.
    Superseded,
    /// The prefab lacked footprint data; the session never became usable.
    MalformedPrefab,
}

/// What a shop item delivers when bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ShopItemKind {
    /// A placeable object that goes through a placement session.
    Placeable,
    /// An employee that is spawned immediately.
    Employee,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_names_match_serde() {
        for tier in Tier::ALL {
            let json = serde_json::to_string(&tier).unwrap_or_default();
            assert_eq!(json, format!("\"{}\"", tier.as_str()));
        }
    }

    #[test]
    fn tiers_are_ordered_by_seniority() {
        assert!(Tier::Intern < Tier::Junior);
        assert!(Tier::Mid < Tier::Senior);
    }
}
