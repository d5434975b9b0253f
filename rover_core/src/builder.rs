//! Type-state builder for `ObstacleAvoidance`.
//!
//! `build()` only exists once a rangefinder, a drivetrain and a run-enable
//! source have been supplied; the clock defaults to `MonotonicClock`.

use rover_traits::{Clock, MonotonicClock};

use crate::avoidance::ObstacleAvoidance;
use crate::button::RunEnable;
use crate::config::AvoidanceCfg;
use crate::drive::Drivetrain;
use crate::error::{Result, RoverError};
use crate::guard::BrakeGuard;
use crate::sensor::Rangefinder;
use crate::status::RunState;

/// Placeholder for a component not yet supplied.
pub struct Missing;

pub struct ObstacleAvoidanceBuilder<R, D, B, C> {
    range: R,
    drive: D,
    button: B,
    clock: C,
    cfg: AvoidanceCfg,
}

impl Default for ObstacleAvoidanceBuilder<Missing, Missing, Missing, MonotonicClock> {
    fn default() -> Self {
        Self {
            range: Missing,
            drive: Missing,
            button: Missing,
            clock: MonotonicClock::new(),
            cfg: AvoidanceCfg::default(),
        }
    }
}

impl ObstacleAvoidanceBuilder<Missing, Missing, Missing, MonotonicClock> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R, D, B, C> ObstacleAvoidanceBuilder<R, D, B, C> {
    pub fn with_rangefinder<R2: Rangefinder>(self, range: R2) -> ObstacleAvoidanceBuilder<R2, D, B, C> {
        ObstacleAvoidanceBuilder {
            range,
            drive: self.drive,
            button: self.button,
            clock: self.clock,
            cfg: self.cfg,
        }
    }

    pub fn with_drivetrain<D2: Drivetrain>(self, drive: D2) -> ObstacleAvoidanceBuilder<R, D2, B, C> {
        ObstacleAvoidanceBuilder {
            range: self.range,
            drive,
            button: self.button,
            clock: self.clock,
            cfg: self.cfg,
        }
    }

    pub fn with_run_enable<B2: RunEnable>(self, button: B2) -> ObstacleAvoidanceBuilder<R, D, B2, C> {
        ObstacleAvoidanceBuilder {
            range: self.range,
            drive: self.drive,
            button,
            clock: self.clock,
            cfg: self.cfg,
        }
    }

    pub fn with_clock<C2: Clock>(self, clock: C2) -> ObstacleAvoidanceBuilder<R, D, B, C2> {
        ObstacleAvoidanceBuilder {
            range: self.range,
            drive: self.drive,
            button: self.button,
            clock,
            cfg: self.cfg,
        }
    }

    pub fn with_cfg(mut self, cfg: AvoidanceCfg) -> Self {
        self.cfg = cfg;
        self
    }
}

impl<R, D, B, C> ObstacleAvoidanceBuilder<R, D, B, C>
where
    R: Rangefinder,
    D: Drivetrain,
    B: RunEnable,
    C: Clock,
{
    /// Validate the policy and take ownership of the drivetrain. From here on
    /// the vehicle is guaranteed a final brake.
    pub fn build(self) -> Result<ObstacleAvoidance<R, D, B, C>> {
        self.cfg
            .check()
            .map_err(|msg| RoverError::Config(msg.to_string()))?;
        Ok(ObstacleAvoidance {
            range: self.range,
            drive: BrakeGuard::new(self.drive),
            button: self.button,
            clock: self.clock,
            cfg: self.cfg,
            state: RunState::Stopped,
            ticks: 0,
            obstacles: 0,
            sensor_timeouts: 0,
        })
    }
}
