//! Simulated rover: two motors, an HC-SR04 and a run button, facing a
//! single obstacle.
//!
//! The world is advanced lazily from the injected clock whenever a line is
//! touched, so a `TestClock` gives fully deterministic runs. The vehicle
//! closes on the obstacle at `approach_cm_per_s * duty / 255` while both
//! bridges are in the forward configuration. After it has rested in front of
//! the obstacle for `clear_after`, the obstacle is removed and the range
//! resets to the start distance.
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use rover_traits::{Clock, DigitalInput, DigitalOutput, PwmOutput};
use tracing::{debug, trace};

use crate::{MotorLines, VehicleLines};

/// Delay between trigger fall and echo rise on a real HC-SR04.
const ECHO_LEAD: Duration = Duration::from_micros(460);
/// Echo width reported when nothing is in range.
const OUT_OF_RANGE_ECHO: Duration = Duration::from_millis(38);
const MIN_TRIGGER: Duration = Duration::from_micros(10);
const MIN_RANGE_CM: f64 = 2.0;
const CM_PER_SECOND_ROUND_TRIP: f64 = 17_150.0;

#[derive(Debug, Clone)]
pub struct SimParams {
    pub start_distance_cm: f64,
    pub approach_cm_per_s: f64,
    /// None keeps the obstacle forever
    pub clear_after: Option<Duration>,
    /// None holds the button for the whole run
    pub button_hold: Option<Duration>,
    pub button_active_low: bool,
    pub no_echo: bool,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            start_distance_cm: 80.0,
            approach_cm_per_s: 40.0,
            clear_after: Some(Duration::from_millis(1500)),
            button_hold: None,
            button_active_low: true,
            no_echo: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    fn idx(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct BridgeState {
    duty: u8,
    pin1: bool,
    pin2: bool,
}

impl BridgeState {
    /// Signed fraction of full speed, positive toward the obstacle.
    fn drive_fraction(self) -> f64 {
        let mag = f64::from(self.duty) / 255.0;
        match (self.pin1, self.pin2) {
            (true, false) => mag,
            (false, true) => -mag,
            _ => 0.0,
        }
    }
}

#[derive(Debug)]
struct WorldState {
    params: SimParams,
    started: Instant,
    last_update: Instant,
    distance_cm: f64,
    rest: Duration,
    bridges: [BridgeState; 2],
    trigger_high_since: Option<Instant>,
    echo: Option<(Instant, Instant)>,
    pings: u64,
    obstacles_cleared: u64,
}

impl WorldState {
    fn advance(&mut self, now: Instant) {
        let dt = now.saturating_duration_since(self.last_update);
        self.last_update = now;
        if dt.is_zero() {
            return;
        }
        let fraction = (self.bridges[0].drive_fraction() + self.bridges[1].drive_fraction()) / 2.0;
        if fraction != 0.0 {
            let moved = self.params.approach_cm_per_s * fraction * dt.as_secs_f64();
            self.distance_cm = (self.distance_cm - moved).max(MIN_RANGE_CM);
            self.rest = Duration::ZERO;
            return;
        }
        let Some(clear_after) = self.params.clear_after else {
            return;
        };
        if self.distance_cm < self.params.start_distance_cm {
            self.rest += dt;
            if self.rest >= clear_after {
                debug!(
                    from_cm = self.distance_cm,
                    to_cm = self.params.start_distance_cm,
                    "sim obstacle removed"
                );
                self.distance_cm = self.params.start_distance_cm;
                self.rest = Duration::ZERO;
                self.obstacles_cleared += 1;
            }
        }
    }

    fn button_held(&self, now: Instant) -> bool {
        self.params
            .button_hold
            .is_none_or(|hold| now.saturating_duration_since(self.started) < hold)
    }
}

struct Shared<C> {
    clock: C,
    state: RefCell<WorldState>,
}

impl<C: Clock> Shared<C> {
    fn with<R>(&self, f: impl FnOnce(&mut WorldState, Instant) -> R) -> R {
        let now = self.clock.now();
        let mut st = self.state.borrow_mut();
        st.advance(now);
        f(&mut st, now)
    }
}

/// Handle to the simulated world; clones share it.
pub struct SimWorld<C: Clock> {
    inner: Rc<Shared<C>>,
}

impl<C: Clock> Clone for SimWorld<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<C: Clock> SimWorld<C> {
    pub fn new(clock: C, params: SimParams) -> Self {
        let now = clock.now();
        let state = WorldState {
            distance_cm: params.start_distance_cm.max(MIN_RANGE_CM),
            params,
            started: now,
            last_update: now,
            rest: Duration::ZERO,
            bridges: [BridgeState::default(); 2],
            trigger_high_since: None,
            echo: None,
            pings: 0,
            obstacles_cleared: 0,
        };
        Self {
            inner: Rc::new(Shared {
                clock,
                state: RefCell::new(state),
            }),
        }
    }

    /// Line bundle wired to this world.
    pub fn lines(&self) -> VehicleLines<SimPwm<C>, SimPin<C>, SimInput<C>> {
        let motor = |side| MotorLines {
            enable: SimPwm {
                world: self.clone(),
                side,
            },
            pin1: SimPin {
                world: self.clone(),
                role: PinRole::Direction(side, 1),
            },
            pin2: SimPin {
                world: self.clone(),
                role: PinRole::Direction(side, 2),
            },
        };
        VehicleLines {
            left: motor(Side::Left),
            right: motor(Side::Right),
            trigger: SimPin {
                world: self.clone(),
                role: PinRole::Trigger,
            },
            echo: SimInput {
                world: self.clone(),
                role: InputRole::Echo,
            },
            button: SimInput {
                world: self.clone(),
                role: InputRole::Button,
            },
        }
    }

    pub fn distance_cm(&self) -> f64 {
        self.inner.with(|st, _| st.distance_cm)
    }

    /// Move the obstacle, e.g. to script a sudden intrusion.
    pub fn place_obstacle(&self, distance_cm: f64) {
        self.inner.with(|st, _| {
            st.distance_cm = distance_cm.max(MIN_RANGE_CM);
            st.rest = Duration::ZERO;
        });
    }

    pub fn duty(&self, side: Side) -> u8 {
        self.inner.with(|st, _| st.bridges[side.idx()].duty)
    }

    /// (pin1, pin2) levels of one bridge.
    pub fn direction(&self, side: Side) -> (bool, bool) {
        self.inner.with(|st, _| {
            let b = st.bridges[side.idx()];
            (b.pin1, b.pin2)
        })
    }

    /// Trigger pulses accepted by the simulated sensor.
    pub fn pings(&self) -> u64 {
        self.inner.with(|st, _| st.pings)
    }

    pub fn obstacles_cleared(&self) -> u64 {
        self.inner.with(|st, _| st.obstacles_cleared)
    }
}

#[derive(Debug, Clone, Copy)]
enum PinRole {
    Direction(Side, u8),
    Trigger,
}

pub struct SimPin<C: Clock> {
    world: SimWorld<C>,
    role: PinRole,
}

impl<C: Clock> DigitalOutput for SimPin<C> {
    fn set_level(&mut self, high: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let role = self.role;
        self.world.inner.with(|st, now| match role {
            PinRole::Direction(side, 1) => st.bridges[side.idx()].pin1 = high,
            PinRole::Direction(side, _) => st.bridges[side.idx()].pin2 = high,
            PinRole::Trigger => match (high, st.trigger_high_since) {
                (true, None) => st.trigger_high_since = Some(now),
                (false, Some(since)) => {
                    st.trigger_high_since = None;
                    if now.saturating_duration_since(since) < MIN_TRIGGER || st.params.no_echo {
                        return;
                    }
                    let width = Duration::try_from_secs_f64(st.distance_cm / CM_PER_SECOND_ROUND_TRIP)
                        .unwrap_or(OUT_OF_RANGE_ECHO)
                        .min(OUT_OF_RANGE_ECHO);
                    let rise = now + ECHO_LEAD;
                    st.echo = Some((rise, rise + width));
                    st.pings += 1;
                    trace!(distance_cm = st.distance_cm, width_us = width.as_micros() as u64, "sim echo scheduled");
                }
                _ => {}
            },
        });
        Ok(())
    }
}

pub struct SimPwm<C: Clock> {
    world: SimWorld<C>,
    side: Side,
}

impl<C: Clock> PwmOutput for SimPwm<C> {
    fn set_duty(&mut self, duty: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let side = self.side;
        self.world
            .inner
            .with(|st, _| st.bridges[side.idx()].duty = duty);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum InputRole {
    Echo,
    Button,
}

pub struct SimInput<C: Clock> {
    world: SimWorld<C>,
    role: InputRole,
}

impl<C: Clock> DigitalInput for SimInput<C> {
    fn is_high(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let role = self.role;
        Ok(self.world.inner.with(|st, now| match role {
            InputRole::Echo => st
                .echo
                .is_some_and(|(rise, fall)| now >= rise && now < fall),
            InputRole::Button => st.button_held(now) != st.params.button_active_low,
        }))
    }
}
