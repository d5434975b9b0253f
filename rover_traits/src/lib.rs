//! Primitive I/O seams between the control logic and the pins it drives.
//!
//! Each component owns the lines it was handed at construction; there is no
//! shared hardware handle. Errors cross this boundary boxed so backends can
//! bring their own error types.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// A push-pull output line (direction pins, ultrasonic trigger).
pub trait DigitalOutput {
    fn set_level(&mut self, high: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    fn set_high(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.set_level(true)
    }

    fn set_low(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.set_level(false)
    }
}

/// An input line sampled on demand (ultrasonic echo, run button).
pub trait DigitalInput {
    fn is_high(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}

/// A PWM-capable enable line. Duty is 0..=255 of full scale.
pub trait PwmOutput {
    fn set_duty(&mut self, duty: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: DigitalOutput + ?Sized> DigitalOutput for Box<T> {
    fn set_level(&mut self, high: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_level(high)
    }
}

impl<T: DigitalInput + ?Sized> DigitalInput for Box<T> {
    fn is_high(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        (**self).is_high()
    }
}

impl<T: PwmOutput + ?Sized> PwmOutput for Box<T> {
    fn set_duty(&mut self, duty: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_duty(duty)
    }
}
