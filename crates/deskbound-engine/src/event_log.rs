//! Step callback that writes every core event to the log and feeds the
//! scripted scenario to the operator.

use std::sync::Arc;

use deskbound_core::{OperatorState, Simulation, StepCallback, StepSummary};
use deskbound_types::CoreEvent;
use tracing::{debug, info, warn};

use crate::scenario::ScenarioConfig;

/// Logs events and releases scenario steps as their tick comes up.
pub struct EventLogCallback {
    operator: Arc<OperatorState>,
    scenario: ScenarioConfig,
    events_logged: u64,
}

impl EventLogCallback {
    /// A callback that will issue the remaining `scenario` steps.
    pub const fn new(operator: Arc<OperatorState>, scenario: ScenarioConfig) -> Self {
        Self {
            operator,
            scenario,
            events_logged: 0,
        }
    }

    /// Number of events written so far.
    pub const fn events_logged(&self) -> u64 {
        self.events_logged
    }

    /// Log one event. High-frequency events go to `debug`.
    pub fn log_event(&mut self, tick: u64, event: &CoreEvent) {
        self.events_logged = self.events_logged.saturating_add(1);
        let payload = serde_json::to_string(event).unwrap_or_default();
        match event {
            CoreEvent::PlacementValidityChanged { .. }
            | CoreEvent::WorkTick { .. }
            | CoreEvent::MoneyChanged { .. } => {
                debug!(tick, kind = event.kind(), event = %payload, "core event");
            }
            _ => info!(tick, kind = event.kind(), event = %payload, "core event"),
        }
    }
}

impl StepCallback for EventLogCallback {
    fn on_step(&mut self, summary: &StepSummary, _sim: &Simulation) {
        for event in &summary.events {
            self.log_event(summary.tick, event);
        }

        let mut deferred = Vec::new();
        for command in self.scenario.take_due(summary.tick) {
            // Once the queue is busy, later steps wait too so order holds.
            if !deferred.is_empty() {
                deferred.push(command);
                continue;
            }
            if let Err(command) = self.operator.try_queue_command(command) {
                deferred.push(command);
            }
        }
        if !deferred.is_empty() {
            warn!(
                tick = summary.tick,
                deferred = deferred.len(),
                "command queue busy, retrying scenario steps next tick"
            );
            self.scenario.defer(summary.tick, deferred);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use deskbound_core::config::SimulationBoundsConfig;
    use deskbound_core::{SimulationConfig, run_simulation};

    use super::*;

    #[tokio::test]
    async fn scenario_steps_are_queued_when_due() {
        let yaml = "scenario:\n  steps:\n    - at_tick: 2\n      command: { action: hire, tier: intern }\n";
        let scenario = ScenarioConfig::parse(yaml).unwrap();
        let operator = Arc::new(OperatorState::new(&SimulationBoundsConfig {
            max_ticks: 4,
            max_real_time_seconds: 0,
            tick_interval_ms: 0,
        }));
        let mut sim = Simulation::new(&SimulationConfig::default()).unwrap();
        let mut callback = EventLogCallback::new(Arc::clone(&operator), scenario);

        run_simulation(&mut sim, &operator, &mut callback).await.unwrap();

        assert_eq!(sim.roster().len(), 1);
        assert!(callback.events_logged() >= 1);
        let spawned_at = sim.roster().iter().next().map(|e| e.spawned_at_ms);
        assert_eq!(spawned_at, Some(200));
    }
}
