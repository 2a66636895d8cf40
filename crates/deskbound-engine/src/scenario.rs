//! Scripted player actions for a headless run.
//!
//! The `scenario` section of `deskbound-config.yaml` lists commands and the
//! tick at which each is issued:
//!
//! ```yaml
//! scenario:
//!   steps:
//!     - command: { action: place, item: table, cell: { x: 2, y: 2 } }
//!     - command: { action: hire, tier: intern }
//!     - at_tick: 600
//!       command: { action: place, item: table, cell: { x: 6, y: 2 }, quarter_turns: 1 }
//! ```
//!
//! Steps at tick 0 are applied before the first step; later ones are queued
//! with the operator from the step callback.

use std::path::Path;

use deskbound_core::OperatorCommand;
use serde::Deserialize;

use crate::error::EngineError;

/// One scripted command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScenarioStep {
    /// Tick after which the command is issued (0 = before the first step).
    #[serde(default)]
    pub at_tick: u64,
    /// The command.
    pub command: OperatorCommand,
}

/// The whole script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScenarioConfig {
    /// Commands, in any order.
    #[serde(default)]
    pub steps: Vec<ScenarioStep>,
}

impl ScenarioConfig {
    /// Split off every step due at or before `tick`, in tick order.
    pub fn take_due(&mut self, tick: u64) -> Vec<OperatorCommand> {
        self.steps.sort_by_key(|step| step.at_tick);
        let split = self.steps.partition_point(|step| step.at_tick <= tick);
        self.steps.drain(..split).map(|step| step.command).collect()
    }

    /// Put commands that could not be issued back at the front of the
    /// script, due at `tick` and in their original order.
    pub fn defer(&mut self, tick: u64, commands: Vec<OperatorCommand>) {
        let deferred: Vec<ScenarioStep> = commands
            .into_iter()
            .map(|command| ScenarioStep { at_tick: tick, command })
            .collect();
        self.steps.splice(0..0, deferred);
    }

    /// Whether every step has been issued.
    pub const fn is_finished(&self) -> bool {
        self.steps.is_empty()
    }

    /// Parse the `scenario` section out of a full config document.
    pub fn parse(yaml: &str) -> Result<Self, EngineError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: serde_yml::Value = serde_yml::from_str(yaml).map_err(|e| EngineError::Scenario {
            message: format!("failed to parse config YAML: {e}"),
        })?;
        raw.get("scenario").map_or_else(
            || Ok(Self::default()),
            |section| {
                serde_yml::from_value(section.clone()).map_err(|e| EngineError::Scenario {
                    message: format!("failed to parse scenario section: {e}"),
                })
            },
        )
    }

    /// Load the `scenario` section from the config file, or an empty script
    /// when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| EngineError::Scenario {
            message: format!("failed to read config file: {e}"),
        })?;
        Self::parse(&contents)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use deskbound_types::{GridCell, Tier};

    use super::*;

    const YAML: &str = r"
grid:
  width: 12
scenario:
  steps:
    - at_tick: 50
      command: { action: hire, tier: junior }
    - command: { action: place, item: table, cell: { x: 2, y: 2 } }
    - command: { action: hire, tier: intern }
";

    #[test]
    fn parses_scenario_section() {
        let scenario = ScenarioConfig::parse(YAML).unwrap();
        assert_eq!(scenario.steps.len(), 3);
        assert_eq!(
            scenario.steps.get(1).map(|s| &s.command),
            Some(&OperatorCommand::Place {
                item: String::from("table"),
                cell: GridCell::new(2, 2),
                quarter_turns: 0,
            })
        );
    }

    #[test]
    fn missing_section_is_empty() {
        assert!(ScenarioConfig::parse("grid: { width: 4 }\n").unwrap().is_finished());
        assert!(ScenarioConfig::parse("").unwrap().is_finished());
    }

    #[test]
    fn take_due_keeps_order_and_later_steps() {
        let mut scenario = ScenarioConfig::parse(YAML).unwrap();
        let now = scenario.take_due(0);
        assert_eq!(now.len(), 2);
        assert!(matches!(now.first(), Some(OperatorCommand::Place { .. })));
        assert!(scenario.take_due(49).is_empty());
        assert_eq!(
            scenario.take_due(50),
            vec![OperatorCommand::Hire { tier: Tier::Junior }]
        );
        assert!(scenario.is_finished());
    }

    #[test]
    fn malformed_section_is_an_error() {
        let err = ScenarioConfig::parse("scenario:\n  steps:\n    - command: { action: fly }\n");
        assert!(matches!(err, Err(EngineError::Scenario { .. })));
    }

    #[test]
    fn deferred_steps_come_out_first_next_tick() {
        let mut scenario = ScenarioConfig::parse(YAML).unwrap();
        let busy = scenario.take_due(0);
        scenario.defer(0, busy);
        assert_eq!(scenario.steps.len(), 3);

        let retried = scenario.take_due(1);
        assert_eq!(
            retried,
            vec![
                OperatorCommand::Place {
                    item: String::from("table"),
                    cell: GridCell::new(2, 2),
                    quarter_turns: 0,
                },
                OperatorCommand::Hire { tier: Tier::Intern },
            ]
        );
        assert_eq!(
            scenario.take_due(50),
            vec![OperatorCommand::Hire { tier: Tier::Junior }]
        );
    }
}
