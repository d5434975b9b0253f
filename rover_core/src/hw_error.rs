//! Maps `Box<dyn Error>` from trait boundaries to typed `RoverError`.
//!
//! The traits in `rover_traits` use `Box<dyn Error + Send + Sync>` so any
//! backend can plug in; this module converts those to our error enum, with an
//! optional feature-gated path for `rover_hardware::HwError` downcasting.

use crate::error::RoverError;

/// Map a trait-boundary error to a typed `RoverError`.
///
/// Known hardware errors are downcast first; anything else is a pin failure.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> RoverError {
    #[cfg(feature = "hardware-errors")]
    {
        use rover_hardware::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Unavailable(msg) => RoverError::Initialization(msg.clone()),
                other => RoverError::PinIo(other.to_string()),
            };
        }
    }

    if let Some(rover) = e.downcast_ref::<RoverError>() {
        return rover.clone();
    }
    RoverError::PinIo(e.to_string())
}

/// `map_err` adapter for boxed trait errors.
pub(crate) fn pin_err(e: Box<dyn std::error::Error + Send + Sync>) -> RoverError {
    map_hw_error(e.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_errors_become_pin_failures() {
        let e: Box<dyn std::error::Error + Send + Sync> = "line busy".into();
        assert_eq!(pin_err(e), RoverError::PinIo("line busy".into()));
    }

    #[test]
    fn rover_errors_pass_through() {
        let e: Box<dyn std::error::Error + Send + Sync> =
            Box::new(RoverError::Initialization("no gpio".into()));
        assert_eq!(pin_err(e), RoverError::Initialization("no gpio".into()));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hw_unavailable_maps_to_initialization() {
        let e: Box<dyn std::error::Error + Send + Sync> =
            Box::new(rover_hardware::HwError::Unavailable("/dev/gpiomem".into()));
        assert!(matches!(pin_err(e), RoverError::Initialization(m) if m.contains("gpiomem")));

        let e: Box<dyn std::error::Error + Send + Sync> =
            Box::new(rover_hardware::HwError::Pwm("GPIO 18".into()));
        assert!(matches!(pin_err(e), RoverError::PinIo(m) if m.contains("pwm error")));
    }
}
