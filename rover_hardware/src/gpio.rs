use rover_traits::{DigitalInput, DigitalOutput, PwmOutput};
use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::{debug, trace};

use crate::error::{HwError, Result};
use crate::{MotorLines, PinMap, VehicleLines};

pub struct GpioOutput(OutputPin);

impl DigitalOutput for GpioOutput {
    fn set_level(&mut self, high: bool) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if high {
            self.0.set_high();
        } else {
            self.0.set_low();
        }
        Ok(())
    }
}

pub struct GpioInput(InputPin);

impl DigitalInput for GpioInput {
    fn is_high(&mut self) -> std::result::Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.0.is_high())
    }
}

/// Software PWM on an enable pin at a fixed carrier frequency.
pub struct SoftPwm {
    pin: OutputPin,
    frequency_hz: f64,
    duty: u8,
}

impl SoftPwm {
    fn new(mut pin: OutputPin, frequency_hz: u32) -> Self {
        pin.set_low();
        Self {
            pin,
            frequency_hz: f64::from(frequency_hz),
            duty: 0,
        }
    }
}

impl PwmOutput for SoftPwm {
    fn set_duty(&mut self, duty: u8) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if duty == self.duty {
            return Ok(());
        }
        if duty == 0 {
            self.pin
                .clear_pwm()
                .map_err(|e| HwError::Pwm(format!("clear pwm on GPIO {}: {e}", self.pin.pin())))?;
            self.pin.set_low();
        } else {
            let fraction = f64::from(duty) / 255.0;
            self.pin
                .set_pwm_frequency(self.frequency_hz, fraction)
                .map_err(|e| HwError::Pwm(format!("set pwm on GPIO {}: {e}", self.pin.pin())))?;
        }
        trace!(pin = self.pin.pin(), duty, "pwm duty");
        self.duty = duty;
        Ok(())
    }
}

fn output(gpio: &Gpio, pin: u8) -> Result<OutputPin> {
    let mut out = gpio
        .get(pin)
        .map_err(|e| HwError::Gpio(format!("open output GPIO {pin}: {e}")))?
        .into_output();
    out.set_low();
    Ok(out)
}

fn input(gpio: &Gpio, pin: u8) -> Result<InputPin> {
    Ok(gpio
        .get(pin)
        .map_err(|e| HwError::Gpio(format!("open input GPIO {pin}: {e}")))?
        .into_input())
}

/// Claim every rover line. Outputs start low, so motors are idle (coast)
/// until the controller issues its first command.
///
/// `button_pull_up` selects the bias for the run button: pull-up for a
/// switch to GND (active low), pull-down otherwise.
pub fn open(
    pins: &PinMap,
    pwm_frequency_hz: u32,
    button_pull_up: bool,
) -> Result<VehicleLines<SoftPwm, GpioOutput, GpioInput>> {
    let gpio = Gpio::new().map_err(|e| HwError::Unavailable(e.to_string()))?;

    let button_pin = gpio
        .get(pins.button)
        .map_err(|e| HwError::Gpio(format!("open input GPIO {}: {e}", pins.button)))?;
    let button = if button_pull_up {
        button_pin.into_input_pullup()
    } else {
        button_pin.into_input_pulldown()
    };

    let lines = VehicleLines {
        left: MotorLines {
            enable: SoftPwm::new(output(&gpio, pins.ena)?, pwm_frequency_hz),
            pin1: GpioOutput(output(&gpio, pins.in1)?),
            pin2: GpioOutput(output(&gpio, pins.in2)?),
        },
        right: MotorLines {
            enable: SoftPwm::new(output(&gpio, pins.enb)?, pwm_frequency_hz),
            pin1: GpioOutput(output(&gpio, pins.in3)?),
            pin2: GpioOutput(output(&gpio, pins.in4)?),
        },
        trigger: GpioOutput(output(&gpio, pins.trig)?),
        echo: GpioInput(input(&gpio, pins.echo)?),
        button: GpioInput(button),
    };
    debug!(?pins, pwm_frequency_hz, "gpio lines claimed");
    Ok(lines)
}
