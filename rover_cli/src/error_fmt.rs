//! Human-readable error descriptions, exit codes and structured JSON errors.

use rover_core::error::{EchoEdge, RoverError};
use serde_json::json;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(re) = err.downcast_ref::<RoverError>() {
        return match re {
            RoverError::SensorTimeout { edge } => {
                let causes = match edge {
                    EchoEdge::Settle => "ECHO line stuck high, or a second sensor on the same line",
                    EchoEdge::Rising => "Sensor unpowered, TRIG/ECHO swapped, or nothing returned the ping",
                    EchoEdge::Falling => "Echo held high past sensor.max_echo_ms; keep it above the 38 ms out-of-range pulse",
                };
                format!(
                    "What happened: No valid echo from the distance sensor ({edge}).\nLikely causes: {causes}.\nHow to fix: Check 5V/GND and the [pins] trig/echo values; use a level shifter on ECHO; adjust [sensor] timeouts if needed."
                )
            }
            RoverError::PinIo(msg) => format!(
                "What happened: A GPIO write or read failed ({msg}).\nLikely causes: Pin claimed by another process, or driver board disconnected.\nHow to fix: Stop other GPIO users, check wiring, then rerun. The motors were braked on exit."
            ),
            RoverError::Initialization(msg) => format!(
                "What happened: Hardware could not be initialized ({msg}).\nLikely causes: Not running on a Raspberry Pi, or insufficient GPIO permissions.\nHow to fix: Run on the target board as a user in the 'gpio' group, or build without the 'hardware' feature to use the simulator."
            ),
            RoverError::Config(msg) => format!(
                "What happened: Configuration is invalid or unreadable ({msg}).\nLikely causes: Missing [pins] entries, duplicated pins, or out-of-range values.\nHow to fix: Edit the TOML config (see etc/rover_config.toml) and try again."
            ),
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 initialization, 4 pin I/O, 5 configuration, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<RoverError>() {
        Some(RoverError::Initialization(_)) => 3,
        Some(RoverError::PinIo(_)) => 4,
        Some(RoverError::Config(_)) => 5,
        Some(RoverError::SensorTimeout { .. }) | None => 1,
    }
}

pub fn error_reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<RoverError>() {
        Some(RoverError::SensorTimeout { .. }) => "SensorTimeout",
        Some(RoverError::PinIo(_)) => "PinIo",
        Some(RoverError::Initialization(_)) => "Initialization",
        Some(RoverError::Config(_)) => "Config",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    let reason = error_reason_name(err);
    match err.downcast_ref::<RoverError>() {
        Some(RoverError::SensorTimeout { edge }) => json!({
            "reason": reason,
            "details": { "edge": edge.to_string() },
            "message": humanize(err),
        }),
        _ => json!({ "reason": reason, "message": humanize(err) }),
    }
    .to_string()
}
