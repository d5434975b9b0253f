//! `rover`: drive while the button is held, brake for obstacles.

mod cli;
mod error_fmt;
mod rt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use rover_config::Config;
use rover_core::RoverError;
use rover_traits::MonotonicClock;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::cli::{Cli, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = real_main(&cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: &Cli) -> eyre::Result<()> {
    color_eyre::install()?;

    let cfg = rover_config::load_file(&cli.config)
        .map_err(|e| RoverError::Config(format!("{e:#}")))?;
    // Held until return so the file writer flushes on every exit path
    let _log_guard = init_tracing(cli, &cfg)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))?;
    }

    tracing::info!(config = %cli.config.display(), backend = BACKEND, "rover starting");
    open_and_execute(cli, &cfg, &shutdown)
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
const BACKEND: &str = "gpio";
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
const BACKEND: &str = "sim";

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_and_execute(cli: &Cli, cfg: &Config, shutdown: &AtomicBool) -> eyre::Result<()> {
    let p = cfg.pins;
    let pins = rover_hardware::PinMap {
        ena: p.ena,
        in1: p.in1,
        in2: p.in2,
        enb: p.enb,
        in3: p.in3,
        in4: p.in4,
        trig: p.trig,
        echo: p.echo,
        button: p.button,
    };
    let lines = rover_hardware::gpio::open(&pins, cfg.drive.pwm_frequency_hz, cfg.button.active_low)
        .map_err(|e| rover_core::hw_error::map_hw_error(&e))?;
    run::execute(&cli.cmd, lines, MonotonicClock::new(), cfg, cli.json, shutdown)
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn open_and_execute(cli: &Cli, cfg: &Config, shutdown: &AtomicBool) -> eyre::Result<()> {
    use rover_hardware::sim::{SimParams, SimWorld};
    use std::time::Duration;

    let s = &cfg.sim;
    let params = SimParams {
        start_distance_cm: s.start_distance_cm,
        approach_cm_per_s: s.approach_cm_per_s,
        clear_after: (s.clear_after_ms > 0).then(|| Duration::from_millis(s.clear_after_ms)),
        button_hold: s.button_hold_ms.map(Duration::from_millis),
        button_active_low: cfg.button.active_low,
        no_echo: s.no_echo,
    };
    let world = SimWorld::new(MonotonicClock::new(), params);
    run::execute(&cli.cmd, world.lines(), MonotonicClock::new(), cfg, cli.json, shutdown)
}

/// Console layer (pretty or JSON, on stderr) plus an optional JSON-lines file
/// per `[logging]`. `RUST_LOG` wins over `--log-level`, which wins over the
/// config level.
fn init_tracing(
    cli: &Cli,
    cfg: &Config,
) -> eyre::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let level = cli
        .log_level
        .as_deref()
        .or(cfg.logging.level.as_deref())
        .unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let console = if cli.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let mut guard = None;
    let file = match cfg.logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| RoverError::Config(format!("logging.file {path:?} has no file name")))?;
            let appender = match cfg.logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, g) = tracing_appender::non_blocking(appender);
            guard = Some(g);
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .with(filter)
        .try_init()?;
    Ok(guard)
}
