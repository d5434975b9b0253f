//! One H-bridge channel: two direction lines plus a PWM enable line.
//!
//! | command        | pin1 | pin2 | duty      |
//! |----------------|------|------|-----------|
//! | drive(s >= 0)  | high | low  | min(s,255)|
//! | drive(s < 0)   | low  | high | min(-s,255)|
//! | stop(coast)    | low  | low  | 0         |
//! | stop(brake)    | high | high | 0         |

use std::fmt;

use rover_traits::{DigitalOutput, PwmOutput};

use crate::error::Result;
use crate::hw_error::pin_err;

pub const MAX_DUTY: u8 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorId {
    /// ENA / IN1 / IN2
    Left,
    /// ENB / IN3 / IN4
    Right,
}

impl fmt::Display for MotorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MotorId::Left => "left",
            MotorId::Right => "right",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopMode {
    /// Not stopped; last command was `drive`.
    #[default]
    None,
    Coast,
    Brake,
}

pub struct MotorChannel<P, D> {
    id: MotorId,
    enable: P,
    pin1: D,
    pin2: D,
    speed: i32,
    stop_mode: StopMode,
}

impl<P: PwmOutput, D: DigitalOutput> MotorChannel<P, D> {
    pub fn new(id: MotorId, enable: P, pin1: D, pin2: D) -> Self {
        Self {
            id,
            enable,
            pin1,
            pin2,
            speed: 0,
            stop_mode: StopMode::None,
        }
    }

    pub fn id(&self) -> MotorId {
        self.id
    }

    /// Last commanded signed speed after clamping.
    pub fn speed(&self) -> i32 {
        self.speed
    }

    pub fn stop_mode(&self) -> StopMode {
        self.stop_mode
    }

    /// Sign picks the direction, magnitude (clamped to 255) is the duty.
    /// Zero is treated as forward at zero duty.
    pub fn drive(&mut self, signed_speed: i32) -> Result<()> {
        let forward = signed_speed >= 0;
        let duty = u8::try_from(signed_speed.unsigned_abs().min(u32::from(MAX_DUTY)))
            .unwrap_or(MAX_DUTY);
        self.pin1.set_level(forward).map_err(pin_err)?;
        self.pin2.set_level(!forward).map_err(pin_err)?;
        self.enable.set_duty(duty).map_err(pin_err)?;
        self.speed = if forward {
            i32::from(duty)
        } else {
            -i32::from(duty)
        };
        self.stop_mode = StopMode::None;
        Ok(())
    }

    /// Zero duty, then both direction lines high (brake) or low (coast).
    pub fn stop(&mut self, brake: bool) -> Result<()> {
        self.enable.set_duty(0).map_err(pin_err)?;
        self.pin1.set_level(brake).map_err(pin_err)?;
        self.pin2.set_level(brake).map_err(pin_err)?;
        self.speed = 0;
        self.stop_mode = if brake {
            StopMode::Brake
        } else {
            StopMode::Coast
        };
        Ok(())
    }
}
