use log::warn;
use tokio::time::Duration;

use crate::global_variables::{
    STATIONARY_DWELL_SECS, TICK_PERIOD_MS, TRAVEL_DWELL_SECS, YELLOW_LIGHT_SECS,
};

/// Runtime knobs for the engine. Light durations are fixed constants.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Period between simulation passes.
    pub tick_period: Duration,
    /// Wait between an emergency vehicle's dispatch, arrival and clearance.
    pub travel_dwell: Duration,
    /// Single wait before clearing a vehicle that has nowhere to go.
    pub stationary_dwell: Duration,
    /// Seed for the lane model's random source; entropy when unset.
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(TICK_PERIOD_MS),
            travel_dwell: Duration::from_secs(TRAVEL_DWELL_SECS),
            stationary_dwell: Duration::from_secs(STATIONARY_DWELL_SECS),
            rng_seed: None,
        }
    }
}

impl EngineConfig {
    /// Returns false (and warns) when the tick period is too coarse for the
    /// light cycle: transitions are detected by elapsed time, so a tick at or
    /// above the YELLOW duration can run a light past its state unnoticed.
    pub fn validate(&self) -> bool {
        let shortest_state = Duration::from_secs(YELLOW_LIGHT_SECS as u64);
        if self.tick_period.is_zero() || self.tick_period >= shortest_state {
            warn!(
                "Tick period {:?} must be non-zero and shorter than the {:?} yellow phase",
                self.tick_period, shortest_state
            );
            return false;
        }
        true
    }
}
