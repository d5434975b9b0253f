//! Run-enable input: the vehicle may only drive while this reports true.

use rover_traits::DigitalInput;

use crate::error::Result;
use crate::hw_error::pin_err;

pub trait RunEnable {
    fn is_enabled(&mut self) -> Result<bool>;
}

impl<B: RunEnable + ?Sized> RunEnable for &mut B {
    fn is_enabled(&mut self) -> Result<bool> {
        (**self).is_enabled()
    }
}

/// A held push button with configurable polarity. The reference wiring is a
/// switch to GND with pull-up, i.e. active low.
pub struct RunButton<I> {
    input: I,
    active_low: bool,
}

impl<I: DigitalInput> RunButton<I> {
    pub fn new(input: I, active_low: bool) -> Self {
        Self { input, active_low }
    }
}

impl<I: DigitalInput> RunEnable for RunButton<I> {
    fn is_enabled(&mut self) -> Result<bool> {
        let high = self.input.is_high().map_err(pin_err)?;
        Ok(high != self.active_low)
    }
}
