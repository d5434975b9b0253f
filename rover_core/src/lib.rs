#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core rover logic (hardware-agnostic).
//!
//! All pin access goes through `rover_traits::{DigitalOutput, DigitalInput,
//! PwmOutput}` and all time through `rover_traits::Clock`, so the same control
//! loop runs against real GPIO, the simulator, or scripted mocks.
//!
//! ## Architecture
//!
//! - **Motors**: one `MotorChannel` per H-bridge side, mirrored by `DriveController`
//! - **Sensing**: `DistanceSensor` times the HC-SR04 echo with bounded waits
//! - **Run enable**: `RunButton` with configurable polarity
//! - **Control**: `ObstacleAvoidance`, a three-state machine (`status::RunState`)
//! - **Safety**: `BrakeGuard` guarantees one final brake on every exit path

pub mod avoidance;
pub mod builder;
pub mod button;
pub mod config;
pub mod conversions;
pub mod drive;
pub mod error;
pub mod guard;
pub mod hw_error;
pub mod mocks;
pub mod motor;
pub mod sensor;
pub mod status;
pub mod util;

pub use avoidance::{ObstacleAvoidance, classify, transition};
pub use builder::{Missing, ObstacleAvoidanceBuilder};
pub use button::{RunButton, RunEnable};
pub use config::{AvoidanceCfg, SensorCfg};
pub use drive::{DriveController, Drivetrain};
pub use error::{EchoEdge, Result, RoverError};
pub use guard::BrakeGuard;
pub use motor::{MAX_DUTY, MotorChannel, MotorId, StopMode};
pub use sensor::{DistanceSensor, Rangefinder, echo_to_cm};
pub use status::{DriveAction, Reading, RunReport, RunState, StopCause, Tick};

