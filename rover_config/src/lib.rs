#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the rover.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Every section except `[pins]` has defaults matching the reference vehicle
//!   (10 cm threshold, cruise duty 150, 50 ms tick, 100 ms obstacle recheck).
use serde::Deserialize;
use std::path::Path;

/// BCM pin numbers for the L298N-style driver, HC-SR04 and run button.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Pins {
    /// Left motor PWM enable
    pub ena: u8,
    pub in1: u8,
    pub in2: u8,
    /// Right motor PWM enable
    pub enb: u8,
    pub in3: u8,
    pub in4: u8,
    /// Ultrasonic trigger output
    pub trig: u8,
    /// Ultrasonic echo input
    pub echo: u8,
    /// Run-enable button input
    pub button: u8,
}

impl Pins {
    pub fn all(&self) -> [(&'static str, u8); 9] {
        [
            ("ena", self.ena),
            ("in1", self.in1),
            ("in2", self.in2),
            ("enb", self.enb),
            ("in3", self.in3),
            ("in4", self.in4),
            ("trig", self.trig),
            ("echo", self.echo),
            ("button", self.button),
        ]
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Drive {
    /// Duty (of 255) applied to both motors while driving
    pub cruise_speed: u8,
    /// PWM carrier frequency on the enable pins
    pub pwm_frequency_hz: u32,
}

impl Default for Drive {
    fn default() -> Self {
        Self {
            cruise_speed: 150,
            pwm_frequency_hz: 2000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Avoidance {
    /// Readings at or below this distance count as an obstacle
    pub threshold_cm: f64,
    /// Control tick period while stopped or driving
    pub tick_ms: u64,
    /// Recheck period while braked in front of an obstacle
    pub recheck_ms: u64,
    /// Releasing the button while waiting on an obstacle returns to Stopped
    pub release_cancels_wait: bool,
}

impl Default for Avoidance {
    fn default() -> Self {
        Self {
            threshold_cm: 10.0,
            tick_ms: 50,
            recheck_ms: 100,
            release_cancels_wait: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Sensor {
    /// Trigger high time; HC-SR04 needs at least 10 us
    pub trigger_pulse_us: u64,
    /// Max wait for a stale echo from the previous cycle to drop
    pub settle_timeout_ms: u64,
    /// Max wait for the echo rising edge after the trigger
    pub rise_timeout_ms: u64,
    /// Max echo high time. Must exceed the ~38 ms pulse an HC-SR04 emits when
    /// nothing is in range, or an open road reads as a timeout.
    pub max_echo_ms: u64,
    /// Echo poll interval, 0 = spin
    pub poll_us: u64,
}

impl Default for Sensor {
    fn default() -> Self {
        Self {
            trigger_pulse_us: 10,
            settle_timeout_ms: 30,
            rise_timeout_ms: 30,
            max_echo_ms: 40,
            poll_us: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Button {
    /// Treat low level as pressed (switch to GND with pull-up)
    pub active_low: bool,
}

impl Default for Button {
    fn default() -> Self {
        Self { active_low: true }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Parameters of the simulated vehicle used when no GPIO backend is built in.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Sim {
    /// Distance to the obstacle at startup
    pub start_distance_cm: f64,
    /// Closing speed at full duty (255)
    pub approach_cm_per_s: f64,
    /// How long the obstacle stays after the vehicle came to rest; 0 = forever
    pub clear_after_ms: u64,
    /// Button released after this long; absent = held for the whole run
    pub button_hold_ms: Option<u64>,
    /// Echo line never rises (sensor unplugged)
    pub no_echo: bool,
}

impl Default for Sim {
    fn default() -> Self {
        Self {
            start_distance_cm: 80.0,
            approach_cm_per_s: 40.0,
            clear_after_ms: 1500,
            button_hold_ms: None,
            no_echo: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub drive: Drive,
    #[serde(default)]
    pub avoidance: Avoidance,
    #[serde(default)]
    pub sensor: Sensor,
    #[serde(default)]
    pub button: Button,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub sim: Sim,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration: {e}"))?;
    cfg.validate()
        .map_err(|e| eyre::eyre!("invalid configuration: {e}"))?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        let pins = self.pins.all();
        for (i, (name_a, a)) in pins.iter().enumerate() {
            if *a > 27 {
                eyre::bail!("pins.{name_a} = {a} is not a BCM GPIO (0..=27)");
            }
            for (name_b, b) in &pins[i + 1..] {
                if a == b {
                    eyre::bail!("pins.{name_a} and pins.{name_b} both use GPIO {a}");
                }
            }
        }

        // Drive
        if self.drive.cruise_speed == 0 {
            eyre::bail!("drive.cruise_speed must be > 0");
        }
        if self.drive.pwm_frequency_hz == 0 {
            eyre::bail!("drive.pwm_frequency_hz must be > 0");
        }

        // Avoidance
        if !(self.avoidance.threshold_cm.is_finite() && self.avoidance.threshold_cm > 0.0) {
            eyre::bail!("avoidance.threshold_cm must be finite and > 0");
        }
        if self.avoidance.tick_ms == 0 {
            eyre::bail!("avoidance.tick_ms must be >= 1");
        }
        if self.avoidance.recheck_ms == 0 {
            eyre::bail!("avoidance.recheck_ms must be >= 1");
        }
        if self.avoidance.tick_ms > 60_000 || self.avoidance.recheck_ms > 60_000 {
            eyre::bail!("avoidance tick periods are unreasonably large (>60s)");
        }

        // Sensor
        if self.sensor.trigger_pulse_us < 10 {
            eyre::bail!("sensor.trigger_pulse_us must be >= 10");
        }
        if self.sensor.settle_timeout_ms == 0 {
            eyre::bail!("sensor.settle_timeout_ms must be >= 1");
        }
        if self.sensor.rise_timeout_ms == 0 {
            eyre::bail!("sensor.rise_timeout_ms must be >= 1");
        }
        if self.sensor.max_echo_ms == 0 {
            eyre::bail!("sensor.max_echo_ms must be >= 1");
        }
        if self.sensor.poll_us >= 1000 {
            eyre::bail!("sensor.poll_us must be < 1000 (coarser polling breaks range resolution)");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
        }

        // Sim
        if !(self.sim.start_distance_cm.is_finite() && self.sim.start_distance_cm >= 0.0) {
            eyre::bail!("sim.start_distance_cm must be finite and >= 0");
        }
        if !(self.sim.approach_cm_per_s.is_finite() && self.sim.approach_cm_per_s >= 0.0) {
            eyre::bail!("sim.approach_cm_per_s must be finite and >= 0");
        }

        Ok(())
    }
}
