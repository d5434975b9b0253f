//! The full stack against the simulated vehicle.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use rover_core::{
    AvoidanceCfg, DistanceSensor, DriveController, MotorChannel, MotorId, ObstacleAvoidanceBuilder,
    RunButton, RunState, SensorCfg, StopCause,
};
use rover_hardware::sim::{SimParams, SimWorld, Side};
use rover_traits::clock::test_clock::TestClock;

fn run_sim(params: SimParams, max_ticks: u64) -> (SimWorld<TestClock>, rover_core::RunReport) {
    let clock = TestClock::new();
    let world = SimWorld::new(clock.clone(), params.clone());
    let lines = world.lines();
    let drive = DriveController::new(
        MotorChannel::new(MotorId::Left, lines.left.enable, lines.left.pin1, lines.left.pin2),
        MotorChannel::new(MotorId::Right, lines.right.enable, lines.right.pin1, lines.right.pin2),
    );
    let sensor = DistanceSensor::new(
        lines.trigger,
        lines.echo,
        clock.clone(),
        SensorCfg {
            poll: Duration::from_micros(5),
            ..SensorCfg::default()
        },
    )
    .unwrap();
    let report = ObstacleAvoidanceBuilder::new()
        .with_rangefinder(sensor)
        .with_drivetrain(drive)
        .with_run_enable(RunButton::new(lines.button, params.button_active_low))
        .with_clock(clock)
        .with_cfg(AvoidanceCfg::default())
        .build()
        .unwrap()
        .run(&AtomicBool::new(false), Some(max_ticks))
        .unwrap();
    (world, report)
}

#[test]
fn approaches_brakes_and_resumes_after_clearing() {
    let (world, report) = run_sim(SimParams::default(), 250);
    assert_eq!(report.cause, StopCause::TickLimit);
    assert!(report.obstacles >= 1, "{report:?}");
    assert!(world.obstacles_cleared() >= 1);
    assert_eq!(report.sensor_timeouts, 0);
    // final brake on both bridges
    for side in [Side::Left, Side::Right] {
        assert_eq!(world.duty(side), 0);
        assert_eq!(world.direction(side), (true, true));
    }
}

#[test]
fn stops_short_of_a_permanent_obstacle() {
    let (world, report) = run_sim(
        SimParams {
            clear_after: None,
            ..SimParams::default()
        },
        200,
    );
    assert_eq!(report.obstacles, 1);
    assert_eq!(report.final_state, RunState::ObstacleWait);
    let d = world.distance_cm();
    // one tick of travel at cruise duty is ~1.2 cm
    assert!(d <= 10.0 && d > 8.0, "stopped at {d} cm");
}

#[test]
fn open_road_keeps_driving() {
    let (world, report) = run_sim(
        SimParams {
            start_distance_cm: 600.0,
            clear_after: None,
            ..SimParams::default()
        },
        20,
    );
    assert_eq!(report.sensor_timeouts, 0, "{report:?}");
    assert_eq!(report.obstacles, 0);
    assert_eq!(report.final_state, RunState::Driving);
    assert!(world.distance_cm() < 600.0);
    assert_eq!(world.pings(), 20);
}

#[test]
fn nothing_in_range_keeps_driving() {
    let (world, report) = run_sim(
        SimParams {
            start_distance_cm: 2_000.0,
            clear_after: None,
            ..SimParams::default()
        },
        20,
    );
    assert_eq!(report.sensor_timeouts, 0, "{report:?}");
    assert_eq!(report.final_state, RunState::Driving);
    assert!(world.distance_cm() < 2_000.0);
}

#[test]
fn released_button_never_moves_or_pings() {
    let (world, report) = run_sim(
        SimParams {
            button_hold: Some(Duration::ZERO),
            ..SimParams::default()
        },
        20,
    );
    assert_eq!(report.final_state, RunState::Stopped);
    assert_eq!(world.pings(), 0);
    assert!((world.distance_cm() - 80.0).abs() < 1e-9);
}

#[test]
fn silent_sensor_keeps_vehicle_braked() {
    let (world, report) = run_sim(
        SimParams {
            no_echo: true,
            ..SimParams::default()
        },
        10,
    );
    assert_eq!(report.sensor_timeouts, 10);
    assert_eq!(report.final_state, RunState::ObstacleWait);
    assert!((world.distance_cm() - 80.0).abs() < 1e-9);
}
