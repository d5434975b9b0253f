//! Runtime configuration for the sensing and control loop.
//!
//! These are separate from the TOML-deserialized config in `rover_config`;
//! see `conversions` for the mapping.

use std::time::Duration;

/// Echo timing parameters for `DistanceSensor`.
#[derive(Debug, Clone)]
pub struct SensorCfg {
    /// Trigger high time. HC-SR04 needs at least 10 us.
    pub trigger_pulse: Duration,
    /// Bound on waiting for a stale echo to drop before pinging.
    pub settle_timeout: Duration,
    /// Bound on waiting for the echo rising edge.
    pub rise_timeout: Duration,
    /// Bound on the echo high time. Kept above the sensor's ~38 ms
    /// out-of-range pulse so "nothing ahead" reads as a long distance.
    pub max_echo: Duration,
    /// Sleep between echo polls. Zero spins on `Clock::now`, which only ends if
    /// the clock moves without being slept (a wall clock, or an
    /// auto-advancing `TestClock`).
    pub poll: Duration,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            trigger_pulse: Duration::from_micros(10),
            settle_timeout: Duration::from_millis(30),
            rise_timeout: Duration::from_millis(30),
            max_echo: Duration::from_millis(40),
            poll: Duration::ZERO,
        }
    }
}

/// Obstacle avoidance policy.
#[derive(Debug, Clone)]
pub struct AvoidanceCfg {
    /// Readings at or below this count as an obstacle.
    pub threshold_cm: f64,
    /// Duty used for `forward` on both motors.
    pub cruise_speed: u8,
    /// Delay between ticks while stopped or driving.
    pub tick: Duration,
    /// Delay between rechecks while braked in front of an obstacle.
    pub recheck: Duration,
    /// Button release during an obstacle wait returns to Stopped.
    pub release_cancels_wait: bool,
}

impl Default for AvoidanceCfg {
    fn default() -> Self {
        Self {
            threshold_cm: 10.0,
            cruise_speed: 150,
            tick: Duration::from_millis(50),
            recheck: Duration::from_millis(100),
            release_cancels_wait: false,
        }
    }
}

impl AvoidanceCfg {
    pub(crate) fn check(&self) -> Result<(), &'static str> {
        if !(self.threshold_cm.is_finite() && self.threshold_cm > 0.0) {
            return Err("threshold_cm must be finite and > 0");
        }
        if self.cruise_speed == 0 {
            return Err("cruise_speed must be > 0");
        }
        if self.tick.is_zero() || self.recheck.is_zero() {
            return Err("tick and recheck periods must be non-zero");
        }
        Ok(())
    }
}
