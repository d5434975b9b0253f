//! Two mirrored motor channels. No differential steering: every command goes
//! to both sides.

use tracing::debug;

use rover_traits::{DigitalOutput, PwmOutput};

use crate::error::Result;
use crate::motor::MotorChannel;

/// The drive commands the control loop issues.
pub trait Drivetrain {
    fn forward(&mut self, speed: u8) -> Result<()>;
    fn stop(&mut self, brake: bool) -> Result<()>;
}

impl<D: Drivetrain + ?Sized> Drivetrain for &mut D {
    fn forward(&mut self, speed: u8) -> Result<()> {
        (**self).forward(speed)
    }
    fn stop(&mut self, brake: bool) -> Result<()> {
        (**self).stop(brake)
    }
}

impl<D: Drivetrain + ?Sized> Drivetrain for Box<D> {
    fn forward(&mut self, speed: u8) -> Result<()> {
        (**self).forward(speed)
    }
    fn stop(&mut self, brake: bool) -> Result<()> {
        (**self).stop(brake)
    }
}

pub struct DriveController<P, D> {
    left: MotorChannel<P, D>,
    right: MotorChannel<P, D>,
}

impl<P: PwmOutput, D: DigitalOutput> DriveController<P, D> {
    pub fn new(left: MotorChannel<P, D>, right: MotorChannel<P, D>) -> Self {
        Self { left, right }
    }
}

impl<P: PwmOutput, D: DigitalOutput> Drivetrain for DriveController<P, D> {
    fn forward(&mut self, speed: u8) -> Result<()> {
        self.left.drive(i32::from(speed))?;
        self.right.drive(i32::from(speed))?;
        Ok(())
    }

    /// Both channels are always attempted; the first failure is returned.
    fn stop(&mut self, brake: bool) -> Result<()> {
        let left = self.left.stop(brake);
        let right = self.right.stop(brake);
        if let Err(e) = left.as_ref().and(right.as_ref()) {
            debug!(error = %e, brake, "stop incomplete");
        }
        left.and(right)
    }
}
