//! Control loop state and per-tick outcomes.

use std::fmt;
use std::time::Duration;

use crate::error::EchoEdge;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    /// Button released; motors coasting.
    #[default]
    Stopped,
    /// Button held and path clear; motors at cruise duty.
    Driving,
    /// Braked until a valid reading above the threshold arrives.
    ObstacleWait,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunState::Stopped => "stopped",
            RunState::Driving => "driving",
            RunState::ObstacleWait => "obstacle-wait",
        })
    }
}

/// Command issued to the drivetrain during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveAction {
    Forward(u8),
    Stop { brake: bool },
}

/// A range query classified against the obstacle threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Clear(f64),
    Obstacle(f64),
    /// No valid echo; never interpreted as clear.
    NoEcho(EchoEdge),
}

impl Reading {
    pub fn distance_cm(&self) -> Option<f64> {
        match *self {
            Reading::Clear(d) | Reading::Obstacle(d) => Some(d),
            Reading::NoEcho(_) => None,
        }
    }
}

/// Result of one `ObstacleAvoidance::tick`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub state: RunState,
    pub action: DriveAction,
    /// None when the sensor was not queried this tick.
    pub reading: Option<Reading>,
    /// Delay before the next tick.
    pub next_tick: Duration,
}

/// Why `run` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    Interrupted,
    TickLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub ticks: u64,
    pub obstacles: u64,
    pub sensor_timeouts: u64,
    pub final_state: RunState,
    pub cause: StopCause,
}
