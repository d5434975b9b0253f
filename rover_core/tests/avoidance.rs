use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use proptest::prelude::*;
use rover_core::mocks::{RecordingDrive, ScriptedButton, ScriptedRange};
use rover_core::{
    AvoidanceCfg, DriveAction, Drivetrain, EchoEdge, ObstacleAvoidanceBuilder, Reading,
    RoverError, RunState, StopCause,
};
use rover_traits::clock::test_clock::TestClock;
use rstest::rstest;

const FWD: DriveAction = DriveAction::Forward(150);
const BRAKE: DriveAction = DriveAction::Stop { brake: true };
const COAST: DriveAction = DriveAction::Stop { brake: false };

fn timeout() -> rover_core::Result<f64> {
    Err(RoverError::SensorTimeout {
        edge: EchoEdge::Falling,
    })
}

#[test]
fn obstacle_then_clear_brakes_and_resumes() {
    let drive = RecordingDrive::new();
    let mut range = ScriptedRange::distances([15.0, 8.0, 8.0, 12.0]);
    let mut ctl = ObstacleAvoidanceBuilder::new()
        .with_rangefinder(&mut range)
        .with_drivetrain(drive.clone())
        .with_run_enable(ScriptedButton::held())
        .with_clock(TestClock::new())
        .build()
        .unwrap();

    let states: Vec<RunState> = (0..4).map(|_| ctl.tick().unwrap().state).collect();
    assert_eq!(
        states,
        [
            RunState::Driving,
            RunState::ObstacleWait,
            RunState::ObstacleWait,
            RunState::Driving
        ]
    );
    assert_eq!(drive.actions(), [FWD, BRAKE, BRAKE, FWD]);
}

#[test]
fn next_tick_uses_recheck_period_while_blocked() {
    let cfg = AvoidanceCfg {
        tick: Duration::from_millis(20),
        recheck: Duration::from_millis(70),
        ..AvoidanceCfg::default()
    };
    let mut ctl = ObstacleAvoidanceBuilder::new()
        .with_rangefinder(ScriptedRange::distances([50.0, 3.0]))
        .with_drivetrain(RecordingDrive::new())
        .with_run_enable(ScriptedButton::held())
        .with_clock(TestClock::new())
        .with_cfg(cfg)
        .build()
        .unwrap();
    assert_eq!(ctl.tick().unwrap().next_tick, Duration::from_millis(20));
    let t = ctl.tick().unwrap();
    assert_eq!(t.reading, Some(Reading::Obstacle(3.0)));
    assert_eq!(t.next_tick, Duration::from_millis(70));
}

#[test]
fn releasing_button_while_driving_coasts_without_ping() {
    let drive = RecordingDrive::new();
    let mut range = ScriptedRange::distances([40.0, 40.0]);
    let mut ctl = ObstacleAvoidanceBuilder::new()
        .with_rangefinder(&mut range)
        .with_drivetrain(drive.clone())
        .with_run_enable(ScriptedButton::new([true, false]))
        .with_clock(TestClock::new())
        .build()
        .unwrap();

    ctl.tick().unwrap();
    let t = ctl.tick().unwrap();
    assert_eq!(t.state, RunState::Stopped);
    assert!(t.reading.is_none());
    assert_eq!(drive.actions(), [FWD, COAST]);
    drop(ctl);
    assert_eq!(range.queried(), 1);
}

#[rstest]
#[case::from_stopped(vec![timeout(), timeout(), Ok(30.0)], vec![BRAKE, BRAKE, FWD])]
#[case::from_driving(vec![Ok(30.0), timeout(), timeout(), Ok(30.0)], vec![FWD, BRAKE, BRAKE, FWD])]
#[case::inside_wait(vec![Ok(5.0), timeout(), Ok(9.0), timeout(), Ok(11.0)], vec![BRAKE, BRAKE, BRAKE, BRAKE, FWD])]
fn sensor_timeouts_never_count_as_clear(
    #[case] readings: Vec<rover_core::Result<f64>>,
    #[case] expected: Vec<DriveAction>,
) {
    let drive = RecordingDrive::new();
    let n = readings.len();
    let timeouts = readings.iter().filter(|r| r.is_err()).count() as u64;
    let mut ctl = ObstacleAvoidanceBuilder::new()
        .with_rangefinder(ScriptedRange::new(readings))
        .with_drivetrain(drive.clone())
        .with_run_enable(ScriptedButton::held())
        .with_clock(TestClock::new())
        .build()
        .unwrap();
    for _ in 0..n {
        ctl.tick().unwrap();
    }
    assert_eq!(drive.actions(), expected);

    let report = ctl
        .run(&AtomicBool::new(false), Some(n as u64))
        .unwrap();
    assert_eq!(report.sensor_timeouts, timeouts);
    assert_eq!(report.cause, StopCause::TickLimit);
}

#[test]
fn button_release_is_ignored_until_path_clears() {
    let drive = RecordingDrive::new();
    // held for the first tick, released afterwards
    let button = ScriptedButton::new([true, false]);
    let mut ctl = ObstacleAvoidanceBuilder::new()
        .with_rangefinder(ScriptedRange::distances([4.0, 4.0, 4.0, 25.0]))
        .with_drivetrain(drive.clone())
        .with_run_enable(button)
        .with_clock(TestClock::new())
        .build()
        .unwrap();
    for _ in 0..4 {
        ctl.tick().unwrap();
    }
    assert_eq!(ctl.state(), RunState::Stopped);
    assert_eq!(drive.actions(), [BRAKE, BRAKE, BRAKE, COAST]);
}

#[test]
fn release_cancels_wait_when_enabled() {
    let drive = RecordingDrive::new();
    let mut ctl = ObstacleAvoidanceBuilder::new()
        .with_rangefinder(ScriptedRange::distances([4.0, 4.0]))
        .with_drivetrain(drive.clone())
        .with_run_enable(ScriptedButton::new([true, false]))
        .with_clock(TestClock::new())
        .with_cfg(AvoidanceCfg {
            release_cancels_wait: true,
            ..AvoidanceCfg::default()
        })
        .build()
        .unwrap();
    ctl.tick().unwrap();
    let t = ctl.tick().unwrap();
    assert_eq!(t.state, RunState::Stopped);
    assert_eq!(drive.actions(), [BRAKE, COAST]);
}

#[test]
fn tick_limit_ends_with_one_final_brake() {
    let drive = RecordingDrive::new();
    let clock = TestClock::new();
    let ctl = ObstacleAvoidanceBuilder::new()
        .with_rangefinder(ScriptedRange::distances([20.0, 20.0, 20.0]))
        .with_drivetrain(drive.clone())
        .with_run_enable(ScriptedButton::held())
        .with_clock(clock.clone())
        .build()
        .unwrap();
    let report = ctl.run(&AtomicBool::new(false), Some(3)).unwrap();
    assert_eq!(report.ticks, 3);
    assert_eq!(report.final_state, RunState::Driving);
    assert_eq!(drive.actions(), [FWD, FWD, FWD, BRAKE]);
    // three sleeps of one tick period each
    assert_eq!(clock.elapsed(), Duration::from_millis(150));
}

#[test]
fn interrupt_before_first_tick_still_brakes_once() {
    let drive = RecordingDrive::new();
    let ctl = ObstacleAvoidanceBuilder::new()
        .with_rangefinder(ScriptedRange::default())
        .with_drivetrain(drive.clone())
        .with_run_enable(ScriptedButton::held())
        .with_clock(TestClock::new())
        .build()
        .unwrap();
    let report = ctl.run(&AtomicBool::new(true), None).unwrap();
    assert_eq!(report.cause, StopCause::Interrupted);
    assert_eq!(report.ticks, 0);
    assert_eq!(drive.actions(), [BRAKE]);
}

#[test]
fn pin_failure_ends_run_with_final_brake() {
    let drive = RecordingDrive::new().failing_forward();
    let ctl = ObstacleAvoidanceBuilder::new()
        .with_rangefinder(ScriptedRange::distances([50.0]))
        .with_drivetrain(drive.clone())
        .with_run_enable(ScriptedButton::held())
        .with_clock(TestClock::new())
        .build()
        .unwrap();
    let err = ctl.run(&AtomicBool::new(false), None).unwrap_err();
    assert!(matches!(err, RoverError::PinIo(_)));
    assert_eq!(drive.actions(), [BRAKE]);
}

#[test]
fn dropping_the_controller_brakes_once() {
    let drive = RecordingDrive::new();
    let mut ctl = ObstacleAvoidanceBuilder::new()
        .with_rangefinder(ScriptedRange::distances([50.0]))
        .with_drivetrain(drive.clone())
        .with_run_enable(ScriptedButton::held())
        .with_clock(TestClock::new())
        .build()
        .unwrap();
    ctl.tick().unwrap();
    drop(ctl);
    assert_eq!(drive.actions(), [FWD, BRAKE]);
}

#[test]
fn obstacle_count_only_includes_fresh_detections() {
    let ctl = ObstacleAvoidanceBuilder::new()
        .with_rangefinder(ScriptedRange::distances([50.0, 5.0, 5.0, 50.0, 7.0]))
        .with_drivetrain(RecordingDrive::new())
        .with_run_enable(ScriptedButton::held())
        .with_clock(TestClock::new())
        .build()
        .unwrap();
    let report = ctl.run(&AtomicBool::new(false), Some(5)).unwrap();
    assert_eq!(report.obstacles, 2);
    assert_eq!(report.final_state, RunState::ObstacleWait);
}

#[rstest]
#[case::zero_threshold(AvoidanceCfg { threshold_cm: 0.0, ..AvoidanceCfg::default() })]
#[case::nan_threshold(AvoidanceCfg { threshold_cm: f64::NAN, ..AvoidanceCfg::default() })]
#[case::zero_speed(AvoidanceCfg { cruise_speed: 0, ..AvoidanceCfg::default() })]
#[case::zero_tick(AvoidanceCfg { tick: Duration::ZERO, ..AvoidanceCfg::default() })]
fn build_rejects_bad_policy(#[case] cfg: AvoidanceCfg) {
    let drive = RecordingDrive::new();
    let err = ObstacleAvoidanceBuilder::new()
        .with_rangefinder(ScriptedRange::default())
        .with_drivetrain(drive.clone())
        .with_run_enable(ScriptedButton::held())
        .with_clock(TestClock::new())
        .with_cfg(cfg)
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, RoverError::Config(_)));
    // nothing was owned yet, so nothing was commanded
    assert!(drive.actions().is_empty());
}

/// Raises the shutdown flag after `remaining` drivetrain commands, the way a
/// Ctrl-C landing mid-run would.
struct InterruptAfter<'a> {
    inner: RecordingDrive,
    flag: &'a AtomicBool,
    remaining: usize,
}

impl InterruptAfter<'_> {
    fn count_down(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.flag.store(true, Ordering::Relaxed);
        }
    }
}

impl Drivetrain for InterruptAfter<'_> {
    fn forward(&mut self, speed: u8) -> rover_core::Result<()> {
        self.inner.forward(speed)?;
        self.count_down();
        Ok(())
    }

    fn stop(&mut self, brake: bool) -> rover_core::Result<()> {
        self.inner.stop(brake)?;
        self.count_down();
        Ok(())
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]
    #[test]
    fn interrupt_mid_run_ends_with_exactly_one_brake(
        readings in prop::collection::vec(prop::option::of(1.0f64..60.0), 0..48),
        levels in prop::collection::vec(any::<bool>(), 0..48),
        k in 1usize..40,
    ) {
        let shutdown = AtomicBool::new(false);
        let log = RecordingDrive::new();
        let drive = InterruptAfter { inner: log.clone(), flag: &shutdown, remaining: k };
        let range = ScriptedRange::new(readings.into_iter().map(|r| match r {
            Some(cm) => Ok(cm),
            None => timeout(),
        }));

        let report = ObstacleAvoidanceBuilder::new()
            .with_rangefinder(range)
            .with_drivetrain(drive)
            .with_run_enable(ScriptedButton::new(levels))
            .with_clock(TestClock::new())
            .build()
            .unwrap()
            .run(&shutdown, None)
            .unwrap();

        prop_assert_eq!(report.cause, StopCause::Interrupted);
        prop_assert_eq!(report.ticks, k as u64);
        let actions = log.actions();
        // one command per tick, then the single final brake
        prop_assert_eq!(actions.len(), k + 1, "{:?}", actions);
        prop_assert_eq!(actions[k], BRAKE);
    }
}
