//! Bounded waits on digital lines.

use std::time::{Duration, Instant};

use rover_traits::Clock;

use crate::error::{EchoEdge, Result, RoverError};

/// Poll `read` until it reports `target`, or fail with a `SensorTimeout` for
/// `edge` once `timeout` has elapsed. Returns the instant the level was seen.
///
/// A zero `poll` spins; otherwise the clock sleeps between reads. Spinning
/// never calls `Clock::sleep`, so a clock that only moves when slept (a plain
/// `TestClock`) never reaches the deadline. Tests that spin use
/// `TestClock::auto_advancing`.
pub fn wait_for_level<C: Clock>(
    clock: &C,
    mut read: impl FnMut() -> Result<bool>,
    target: bool,
    timeout: Duration,
    poll: Duration,
    edge: EchoEdge,
) -> Result<Instant> {
    let deadline = clock.now() + timeout;
    loop {
        if read()? == target {
            return Ok(clock.now());
        }
        if clock.now() >= deadline {
            return Err(RoverError::SensorTimeout { edge });
        }
        if poll.is_zero() {
            std::hint::spin_loop();
        } else {
            clock.sleep(poll);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_traits::clock::test_clock::TestClock;

    #[test]
    fn returns_when_level_seen() {
        let clock = TestClock::new();
        let start = clock.now();
        let watcher = clock.clone();
        let seen = wait_for_level(
            &clock,
            || Ok(watcher.us_since(start) >= 300),
            true,
            Duration::from_millis(1),
            Duration::from_micros(100),
            EchoEdge::Rising,
        )
        .expect("level should be seen");
        assert_eq!(seen.saturating_duration_since(start), Duration::from_micros(300));
    }

    #[test]
    fn times_out_with_edge() {
        let clock = TestClock::new();
        let err = wait_for_level(
            &clock,
            || Ok(true),
            false,
            Duration::from_micros(500),
            Duration::from_micros(100),
            EchoEdge::Falling,
        )
        .expect_err("line never drops");
        assert_eq!(
            err,
            RoverError::SensorTimeout {
                edge: EchoEdge::Falling
            }
        );
    }

    #[test]
    fn zero_poll_spins_to_deadline_on_self_advancing_clock() {
        let clock = TestClock::auto_advancing(Duration::from_micros(1));
        let start = clock.now();
        let err = wait_for_level(
            &clock,
            || Ok(false),
            true,
            Duration::from_micros(200),
            Duration::ZERO,
            EchoEdge::Rising,
        )
        .expect_err("line never rises");
        assert_eq!(
            err,
            RoverError::SensorTimeout {
                edge: EchoEdge::Rising
            }
        );
        let waited = clock.now().saturating_duration_since(start);
        assert!(waited >= Duration::from_micros(200) && waited < Duration::from_micros(210));
    }

    #[test]
    fn read_errors_propagate() {
        let clock = TestClock::new();
        let err = wait_for_level(
            &clock,
            || Err(RoverError::PinIo("echo".into())),
            true,
            Duration::from_millis(1),
            Duration::from_micros(100),
            EchoEdge::Rising,
        )
        .expect_err("read failure");
        assert!(matches!(err, RoverError::PinIo(_)));
    }
}
