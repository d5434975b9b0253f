//! `From` implementations bridging `rover_config` types to `rover_core` types.

use std::time::Duration;

use crate::config::{AvoidanceCfg, SensorCfg};

impl From<&rover_config::Sensor> for SensorCfg {
    fn from(c: &rover_config::Sensor) -> Self {
        Self {
            trigger_pulse: Duration::from_micros(c.trigger_pulse_us),
            settle_timeout: Duration::from_millis(c.settle_timeout_ms),
            rise_timeout: Duration::from_millis(c.rise_timeout_ms),
            max_echo: Duration::from_millis(c.max_echo_ms),
            poll: Duration::from_micros(c.poll_us),
        }
    }
}

// Cruise speed lives under [drive], the rest under [avoidance].
impl From<&rover_config::Config> for AvoidanceCfg {
    fn from(c: &rover_config::Config) -> Self {
        Self {
            threshold_cm: c.avoidance.threshold_cm,
            cruise_speed: c.drive.cruise_speed,
            tick: Duration::from_millis(c.avoidance.tick_ms),
            recheck: Duration::from_millis(c.avoidance.recheck_ms),
            release_cancels_wait: c.avoidance.release_cancels_wait,
        }
    }
}
