//! The obstacle avoidance control loop.
//!
//! Each tick pulls at most one button sample and one range reading, runs the
//! transition function once, issues exactly one drivetrain command, and
//! returns how long to wait before the next tick. Nothing inside a tick
//! blocks longer than one bounded sensor measurement.

use std::sync::atomic::{AtomicBool, Ordering};

use rover_traits::Clock;
use tracing::{debug, error, info, warn};

use crate::button::RunEnable;
use crate::config::AvoidanceCfg;
use crate::drive::Drivetrain;
use crate::error::{Result, RoverError};
use crate::guard::BrakeGuard;
use crate::sensor::Rangefinder;
use crate::status::{DriveAction, Reading, RunReport, RunState, StopCause, Tick};

/// Classify a measurement against the threshold. Sensor timeouts become
/// `Reading::NoEcho`; every other error is returned.
pub fn classify(measured: Result<f64>, threshold_cm: f64) -> Result<Reading> {
    match measured {
        Ok(d) if d > threshold_cm => Ok(Reading::Clear(d)),
        Ok(d) => Ok(Reading::Obstacle(d)),
        Err(RoverError::SensorTimeout { edge }) => Ok(Reading::NoEcho(edge)),
        Err(e) => Err(e),
    }
}

/// The state transition table.
///
/// Inputs are pulled lazily so the button and the sensor are only sampled
/// when the current state needs them:
/// - Stopped/Driving: button first; the sensor is pinged only while enabled.
/// - ObstacleWait: sensor first; the button is read once the path is clear
///   (or every tick when `release_cancels_wait` is set).
pub fn transition(
    state: RunState,
    cfg: &AvoidanceCfg,
    mut run_enabled: impl FnMut() -> Result<bool>,
    mut range: impl FnMut() -> Result<Reading>,
) -> Result<(RunState, DriveAction, Option<Reading>)> {
    let coast = DriveAction::Stop { brake: false };
    let brake = DriveAction::Stop { brake: true };
    let cruise = DriveAction::Forward(cfg.cruise_speed);

    match state {
        RunState::Stopped | RunState::Driving => {
            if !run_enabled()? {
                return Ok((RunState::Stopped, coast, None));
            }
            let reading = range()?;
            let (next, action) = match reading {
                Reading::Clear(_) => (RunState::Driving, cruise),
                Reading::Obstacle(_) | Reading::NoEcho(_) => (RunState::ObstacleWait, brake),
            };
            Ok((next, action, Some(reading)))
        }
        RunState::ObstacleWait => {
            if cfg.release_cancels_wait && !run_enabled()? {
                return Ok((RunState::Stopped, coast, None));
            }
            let reading = range()?;
            if !matches!(reading, Reading::Clear(_)) {
                return Ok((RunState::ObstacleWait, brake, Some(reading)));
            }
            if run_enabled()? {
                Ok((RunState::Driving, cruise, Some(reading)))
            } else {
                Ok((RunState::Stopped, coast, Some(reading)))
            }
        }
    }
}

pub struct ObstacleAvoidance<R, D: Drivetrain, B, C> {
    pub(crate) range: R,
    pub(crate) drive: BrakeGuard<D>,
    pub(crate) button: B,
    pub(crate) clock: C,
    pub(crate) cfg: AvoidanceCfg,
    pub(crate) state: RunState,
    pub(crate) ticks: u64,
    pub(crate) obstacles: u64,
    pub(crate) sensor_timeouts: u64,
}

impl<R, D, B, C> ObstacleAvoidance<R, D, B, C>
where
    R: Rangefinder,
    D: Drivetrain,
    B: RunEnable,
    C: Clock,
{
    pub fn state(&self) -> RunState {
        self.state
    }

    /// One control iteration. Pin failures are returned and end the run;
    /// sensor timeouts are absorbed as a braked `NoEcho` tick.
    pub fn tick(&mut self) -> Result<Tick> {
        let prev = self.state;
        let threshold_cm = self.cfg.threshold_cm;
        let Self {
            range,
            drive,
            button,
            cfg,
            ..
        } = self;

        let (next, action, reading) = transition(
            prev,
            cfg,
            || button.is_enabled(),
            || classify(range.measure(), threshold_cm),
        )?;

        match action {
            DriveAction::Forward(speed) => drive.forward(speed)?,
            DriveAction::Stop { brake } => drive.stop(brake)?,
        }

        self.ticks += 1;
        self.state = next;
        let distance_cm = reading.and_then(|r| r.distance_cm());

        if let Some(Reading::NoEcho(edge)) = reading {
            self.sensor_timeouts += 1;
            warn!(%edge, state = %next, "sensor timeout; holding brake");
        }
        match (prev, next) {
            (RunState::ObstacleWait, RunState::ObstacleWait) => {}
            (_, RunState::ObstacleWait) => {
                if matches!(reading, Some(Reading::Obstacle(_))) {
                    self.obstacles += 1;
                    info!(distance_cm, "obstacle detected; braking");
                }
            }
            (RunState::ObstacleWait, _) if reading.is_none() => {
                info!("button released during obstacle wait; stopping");
            }
            (RunState::ObstacleWait, _) => {
                info!(distance_cm, state = %next, "path clear; resuming");
            }
            (from, to) if from != to => debug!(%from, %to, "state change"),
            _ => {}
        }
        debug!(distance_cm, ?action, state = %next, "tick");

        let next_tick = match next {
            RunState::ObstacleWait => self.cfg.recheck,
            RunState::Stopped | RunState::Driving => self.cfg.tick,
        };
        Ok(Tick {
            state: next,
            action,
            reading,
            next_tick,
        })
    }

    /// Tick until `shutdown` is set, `max_ticks` is reached, or a fatal error
    /// occurs. Every exit path ends with one final braked stop before the
    /// drivetrain is released.
    pub fn run(mut self, shutdown: &AtomicBool, max_ticks: Option<u64>) -> Result<RunReport> {
        info!(
            threshold_cm = self.cfg.threshold_cm,
            cruise_speed = self.cfg.cruise_speed,
            tick_ms = self.cfg.tick.as_millis() as u64,
            recheck_ms = self.cfg.recheck.as_millis() as u64,
            "control loop started"
        );

        let outcome = loop {
            if shutdown.load(Ordering::Relaxed) {
                info!("interrupt received; stopping");
                break Ok(StopCause::Interrupted);
            }
            if max_ticks.is_some_and(|n| self.ticks >= n) {
                break Ok(StopCause::TickLimit);
            }
            match self.tick() {
                Ok(t) => self.clock.sleep(t.next_tick),
                Err(e) => break Err(e),
            }
        };

        let Self {
            drive,
            state,
            ticks,
            obstacles,
            sensor_timeouts,
            ..
        } = self;
        let released = drive.release();

        let cause = match outcome {
            Ok(cause) => cause,
            Err(e) => {
                error!(error = %e, ticks, "control loop failed");
                return Err(e);
            }
        };
        released?;

        let report = RunReport {
            ticks,
            obstacles,
            sensor_timeouts,
            final_state: state,
            cause,
        };
        info!(?report, "control loop finished");
        Ok(report)
    }
}
