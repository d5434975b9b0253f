//! Backend assembly and command execution.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use rover_config::Config;
use rover_core::error::Result as CoreResult;
use rover_core::{
    AvoidanceCfg, BrakeGuard, DistanceSensor, DriveController, Drivetrain, MotorChannel, MotorId,
    ObstacleAvoidanceBuilder, Rangefinder, RoverError, RunButton, RunEnable, RunReport, SensorCfg,
    StopCause,
};
use rover_hardware::VehicleLines;
use rover_traits::{Clock, DigitalInput, DigitalOutput, PwmOutput};
use serde_json::json;
use tracing::{info, warn};

use crate::cli::{Commands, RtLock};
use crate::rt::setup_rt_once;

/// HC-SR04 needs ~60 ms between pings for the previous echo to die out.
const MEASURE_SPACING: Duration = Duration::from_millis(60);

/// The rover's components, wired from one set of lines.
struct Parts<P, D, I, C> {
    drive: DriveController<P, D>,
    sensor: DistanceSensor<D, I, C>,
    button: RunButton<I>,
}

fn assemble<P, D, I, C>(
    lines: VehicleLines<P, D, I>,
    clock: C,
    cfg: &Config,
) -> CoreResult<Parts<P, D, I, C>>
where
    P: PwmOutput,
    D: DigitalOutput,
    I: DigitalInput,
    C: Clock,
{
    let VehicleLines {
        left,
        right,
        trigger,
        echo,
        button,
    } = lines;
    let sensor = DistanceSensor::new(trigger, echo, clock, SensorCfg::from(&cfg.sensor))?;
    let drive = DriveController::new(
        MotorChannel::new(MotorId::Left, left.enable, left.pin1, left.pin2),
        MotorChannel::new(MotorId::Right, right.enable, right.pin1, right.pin2),
    );
    Ok(Parts {
        drive,
        sensor,
        button: RunButton::new(button, cfg.button.active_low),
    })
}

/// Execute one subcommand against an opened backend.
pub fn execute<P, D, I, C>(
    cmd: &Commands,
    lines: VehicleLines<P, D, I>,
    clock: C,
    cfg: &Config,
    json: bool,
    shutdown: &AtomicBool,
) -> eyre::Result<()>
where
    P: PwmOutput,
    D: DigitalOutput,
    I: DigitalInput,
    C: Clock + Clone,
{
    let parts = assemble(lines, clock.clone(), cfg)?;
    match *cmd {
        Commands::Run {
            max_ticks,
            rt,
            rt_prio,
            rt_lock,
        } => {
            setup_rt_once(rt, rt_prio, rt_lock.unwrap_or(RtLock::os_default()));
            let report = run_loop(parts, clock, cfg, shutdown, max_ticks)?;
            print_report(&report, json);
        }
        Commands::Measure { count } => measure(parts, &clock, count, json, shutdown)?,
        Commands::SelfCheck => self_check(parts, json)?,
    }
    Ok(())
}

fn run_loop<P, D, I, C>(
    parts: Parts<P, D, I, C>,
    clock: C,
    cfg: &Config,
    shutdown: &AtomicBool,
    max_ticks: Option<u64>,
) -> CoreResult<RunReport>
where
    P: PwmOutput,
    D: DigitalOutput,
    I: DigitalInput,
    C: Clock,
{
    ObstacleAvoidanceBuilder::new()
        .with_rangefinder(parts.sensor)
        .with_drivetrain(parts.drive)
        .with_run_enable(parts.button)
        .with_clock(clock)
        .with_cfg(AvoidanceCfg::from(cfg))
        .build()?
        .run(shutdown, max_ticks)
}

fn print_report(report: &RunReport, json: bool) {
    let cause = match report.cause {
        StopCause::Interrupted => "interrupted",
        StopCause::TickLimit => "tick-limit",
    };
    if json {
        println!(
            "{}",
            json!({
                "ticks": report.ticks,
                "obstacles": report.obstacles,
                "sensor_timeouts": report.sensor_timeouts,
                "final_state": report.final_state.to_string(),
                "cause": cause,
            })
        );
    } else {
        println!(
            "run complete ({cause}): {} ticks, {} obstacles, {} sensor timeouts, final state {}",
            report.ticks, report.obstacles, report.sensor_timeouts, report.final_state
        );
    }
}

/// Ping `count` times and print each reading. Timeouts are reported per
/// reading; pin failures abort. The motors are braked on every exit.
fn measure<P, D, I, C>(
    parts: Parts<P, D, I, C>,
    clock: &C,
    count: u32,
    json: bool,
    shutdown: &AtomicBool,
) -> CoreResult<()>
where
    P: PwmOutput,
    D: DigitalOutput,
    I: DigitalInput,
    C: Clock,
{
    let Parts { drive, mut sensor, .. } = parts;
    let drive = BrakeGuard::new(drive);
    for i in 0..count {
        if shutdown.load(std::sync::atomic::Ordering::Relaxed) {
            info!("interrupt received; stopping");
            break;
        }
        if i > 0 {
            clock.sleep(MEASURE_SPACING);
        }
        match sensor.measure() {
            Ok(cm) if json => println!("{}", json!({ "index": i, "distance_cm": cm })),
            Ok(cm) => println!("reading {i}: {cm:.1} cm"),
            Err(RoverError::SensorTimeout { edge }) => {
                warn!(%edge, "no echo");
                if json {
                    println!("{}", json!({ "index": i, "error": format!("no echo ({edge})") }));
                } else {
                    println!("reading {i}: no echo ({edge})");
                }
            }
            Err(e) => return Err(e),
        }
    }
    drive.release()
}

/// Brake both motors, read the button and take one distance reading.
fn self_check<P, D, I, C>(mut parts: Parts<P, D, I, C>, json: bool) -> CoreResult<()>
where
    P: PwmOutput,
    D: DigitalOutput,
    I: DigitalInput,
    C: Clock,
{
    parts.drive.stop(true)?;
    let held = parts.button.is_enabled()?;
    let cm = parts.sensor.measure()?;
    info!(distance_cm = cm, button_held = held, "self-check passed");
    if json {
        println!(
            "{}",
            json!({ "ok": true, "distance_cm": cm, "button_held": held })
        );
    } else {
        println!(
            "self-check ok: motors braked, button {}, distance {cm:.1} cm",
            if held { "held" } else { "released" }
        );
    }
    Ok(())
}
