//! HC-SR04 style time-of-flight ranging.
//!
//! One measurement is: wait for a stale echo to drop, pulse the trigger for
//! at least 10 us, time the echo high period, convert to centimeters. Every
//! wait is bounded and reports which edge went missing.

use std::time::Duration;

use rover_traits::{Clock, DigitalInput, DigitalOutput};
use tracing::trace;

use crate::config::SensorCfg;
use crate::error::{EchoEdge, Result};
use crate::hw_error::pin_err;
use crate::util::wait_for_level;

/// Half the speed of sound (343 m/s) in cm/s: echo seconds to one-way cm.
pub const CM_PER_SECOND_ROUND_TRIP: f64 = 17_150.0;

/// Convert an echo high time to a one-way distance in centimeters.
#[inline]
pub fn echo_to_cm(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * CM_PER_SECOND_ROUND_TRIP
}

/// Anything that produces a fresh distance reading on demand.
pub trait Rangefinder {
    /// Distance in centimeters, or `RoverError::SensorTimeout` when no valid
    /// echo was observed.
    fn measure(&mut self) -> Result<f64>;
}

impl<R: Rangefinder + ?Sized> Rangefinder for &mut R {
    fn measure(&mut self) -> Result<f64> {
        (**self).measure()
    }
}

impl<R: Rangefinder + ?Sized> Rangefinder for Box<R> {
    fn measure(&mut self) -> Result<f64> {
        (**self).measure()
    }
}

pub struct DistanceSensor<T, E, C> {
    trigger: T,
    echo: E,
    clock: C,
    cfg: SensorCfg,
}

impl<T, E, C> DistanceSensor<T, E, C>
where
    T: DigitalOutput,
    E: DigitalInput,
    C: Clock,
{
    /// Takes ownership of both lines and parks the trigger low.
    pub fn new(mut trigger: T, echo: E, clock: C, cfg: SensorCfg) -> Result<Self> {
        trigger.set_low().map_err(pin_err)?;
        Ok(Self {
            trigger,
            echo,
            clock,
            cfg,
        })
    }

    /// Fire one ping and return the echo high time.
    pub fn measure_echo(&mut self) -> Result<Duration> {
        let Self {
            trigger,
            echo,
            clock,
            cfg,
        } = self;
        let clock: &C = clock;
        let mut echo_high = || echo.is_high().map_err(pin_err);

        wait_for_level(
            clock,
            &mut echo_high,
            false,
            cfg.settle_timeout,
            cfg.poll,
            EchoEdge::Settle,
        )?;

        trigger.set_high().map_err(pin_err)?;
        clock.sleep(cfg.trigger_pulse);
        trigger.set_low().map_err(pin_err)?;

        let rise = wait_for_level(
            clock,
            &mut echo_high,
            true,
            cfg.rise_timeout,
            cfg.poll,
            EchoEdge::Rising,
        )?;
        let fall = wait_for_level(
            clock,
            &mut echo_high,
            false,
            cfg.max_echo,
            cfg.poll,
            EchoEdge::Falling,
        )?;
        Ok(fall.saturating_duration_since(rise))
    }
}

impl<T, E, C> Rangefinder for DistanceSensor<T, E, C>
where
    T: DigitalOutput,
    E: DigitalInput,
    C: Clock,
{
    fn measure(&mut self) -> Result<f64> {
        let echo = self.measure_echo()?;
        let cm = echo_to_cm(echo);
        trace!(echo_us = echo.as_micros() as u64, distance_cm = cm, "ping");
        Ok(cm)
    }
}
