//! Pin backends for the rover.
//!
//! - `gpio` (feature `hardware`): Raspberry Pi lines through `rppal`.
//! - `sim`: a simulated vehicle in front of a single obstacle, used by
//!   default and by the CLI tests.
//!
//! Both hand out the same `VehicleLines` bundle so the caller wires the core
//! components identically regardless of backend.
pub mod error;
pub mod sim;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;

pub use error::HwError;

/// BCM pin numbers consumed by `gpio::open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinMap {
    pub ena: u8,
    pub in1: u8,
    pub in2: u8,
    pub enb: u8,
    pub in3: u8,
    pub in4: u8,
    pub trig: u8,
    pub echo: u8,
    pub button: u8,
}

/// Enable (PWM) line plus the two H-bridge direction lines of one motor.
pub struct MotorLines<P, D> {
    pub enable: P,
    pub pin1: D,
    pub pin2: D,
}

/// Every line the rover needs, already configured for its role.
pub struct VehicleLines<P, D, I> {
    pub left: MotorLines<P, D>,
    pub right: MotorLines<P, D>,
    pub trigger: D,
    pub echo: I,
    pub button: I,
}
