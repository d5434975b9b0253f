//! Scripted stand-ins for the control loop seams, shared by tests and benches.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::button::RunEnable;
use crate::drive::Drivetrain;
use crate::error::{EchoEdge, Result, RoverError};
use crate::sensor::Rangefinder;
use crate::status::DriveAction;

/// Replays a fixed list of readings. Once exhausted it reports falling-edge
/// timeouts, which the loop treats as "hold brake".
#[derive(Debug, Default, Clone)]
pub struct ScriptedRange {
    readings: VecDeque<Result<f64>>,
    queried: usize,
}

impl ScriptedRange {
    pub fn new(readings: impl IntoIterator<Item = Result<f64>>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
            queried: 0,
        }
    }

    pub fn distances(cm: impl IntoIterator<Item = f64>) -> Self {
        Self::new(cm.into_iter().map(Ok))
    }

    /// How many times `measure` was called.
    pub fn queried(&self) -> usize {
        self.queried
    }
}

impl Rangefinder for ScriptedRange {
    fn measure(&mut self) -> Result<f64> {
        self.queried += 1;
        self.readings.pop_front().unwrap_or(Err(RoverError::SensorTimeout {
            edge: EchoEdge::Falling,
        }))
    }
}

/// Replays button levels; the last value repeats forever.
#[derive(Debug, Clone)]
pub struct ScriptedButton {
    levels: VecDeque<bool>,
    last: bool,
}

impl ScriptedButton {
    pub fn new(levels: impl IntoIterator<Item = bool>) -> Self {
        Self {
            levels: levels.into_iter().collect(),
            last: false,
        }
    }

    pub fn held() -> Self {
        Self::new([true])
    }
}

impl RunEnable for ScriptedButton {
    fn is_enabled(&mut self) -> Result<bool> {
        if let Some(v) = self.levels.pop_front() {
            self.last = v;
        }
        Ok(self.last)
    }
}

/// Records every drivetrain command into a log shared with the test.
#[derive(Debug, Default, Clone)]
pub struct RecordingDrive {
    log: Rc<RefCell<Vec<DriveAction>>>,
    fail_forward: bool,
}

impl RecordingDrive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `forward` fail with a pin error.
    pub fn failing_forward(mut self) -> Self {
        self.fail_forward = true;
        self
    }

    pub fn actions(&self) -> Vec<DriveAction> {
        self.log.borrow().clone()
    }
}

impl Drivetrain for RecordingDrive {
    fn forward(&mut self, speed: u8) -> Result<()> {
        if self.fail_forward {
            return Err(RoverError::PinIo("enable line rejected duty".into()));
        }
        self.log.borrow_mut().push(DriveAction::Forward(speed));
        Ok(())
    }

    fn stop(&mut self, brake: bool) -> Result<()> {
        self.log.borrow_mut().push(DriveAction::Stop { brake });
        Ok(())
    }
}
