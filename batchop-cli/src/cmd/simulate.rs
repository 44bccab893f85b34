use std::time::Duration;

use async_trait::async_trait;
use batchop_exec::{Action, ActionError};
use tracing::debug;

use crate::SimulationArgs;

/// Stand-in for a remote call: waits for the configured latency, then
/// succeeds or fails as instructed.
pub struct SimulatedAction {
    service: String,
    latency: Duration,
    jitter_ms: u64,
    fail: bool,
}

impl SimulatedAction {
    pub fn new(service: impl Into<String>, simulation: &SimulationArgs, fail: bool) -> Self {
        Self {
            service: service.into(),
            latency: Duration::from_millis(simulation.latency_ms),
            jitter_ms: simulation.jitter_ms,
            fail,
        }
    }

    fn delay(&self) -> Duration {
        if self.jitter_ms == 0 {
            return self.latency;
        }
        self.latency + Duration::from_millis(fastrand::u64(0..=self.jitter_ms))
    }
}

#[async_trait]
impl Action for SimulatedAction {
    async fn run(&self, payload: &serde_json::Value) -> Result<(), ActionError> {
        let delay = self.delay();
        debug!(
            service = %self.service,
            delay_ms = delay.as_millis() as u64,
            %payload,
            "calling service"
        );
        tokio::time::sleep(delay).await;
        if self.fail {
            return Err(ActionError::new(format!(
                "{} rejected the update",
                self.service
            )));
        }
        Ok(())
    }

    async fn compensate(&self, _payload: &serde_json::Value) -> Result<(), ActionError> {
        debug!(service = %self.service, "rolling back update");
        Ok(())
    }
}
