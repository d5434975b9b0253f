//! Scoped ownership of the drivetrain with a guaranteed final brake.
//!
//! `release` brakes once and drops the drivetrain (and with it the pins).
//! If the guard is dropped without `release` (early return, panic unwind),
//! `Drop` performs the same brake. Either way exactly one final
//! `stop(brake = true)` reaches the motors.

use tracing::{error, info, warn};

use crate::drive::Drivetrain;
use crate::error::{Result, RoverError};

pub struct BrakeGuard<D: Drivetrain> {
    drive: Option<D>,
}

impl<D: Drivetrain> BrakeGuard<D> {
    pub fn new(drive: D) -> Self {
        Self { drive: Some(drive) }
    }

    fn inner(&mut self) -> Result<&mut D> {
        self.drive
            .as_mut()
            .ok_or_else(|| RoverError::PinIo("drivetrain already released".into()))
    }

    /// Brake both motors, then release the drivetrain.
    pub fn release(mut self) -> Result<()> {
        let Some(mut drive) = self.drive.take() else {
            return Ok(());
        };
        let res = drive.stop(true);
        drop(drive);
        match &res {
            Ok(()) => info!("final brake applied; pins released"),
            Err(e) => error!(error = %e, "final brake failed"),
        }
        res
    }
}

impl<D: Drivetrain> Drivetrain for BrakeGuard<D> {
    fn forward(&mut self, speed: u8) -> Result<()> {
        self.inner()?.forward(speed)
    }

    fn stop(&mut self, brake: bool) -> Result<()> {
        self.inner()?.stop(brake)
    }
}

impl<D: Drivetrain> Drop for BrakeGuard<D> {
    fn drop(&mut self) {
        if let Some(mut drive) = self.drive.take() {
            warn!("drivetrain dropped without release; braking");
            if let Err(e) = drive.stop(true) {
                error!(error = %e, "final brake failed");
            }
        }
    }
}
