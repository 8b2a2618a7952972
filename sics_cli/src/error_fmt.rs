//! Human-readable error descriptions and structured JSON error formatting.

use crate::cli::CliError;
use sics_core::SicsError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(ce) = err.downcast_ref::<CliError>() {
        return match ce {
            CliError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML or in TTY/BAUDRATE/METER_POLL_MS.\nHow to fix: Edit the config file or environment, then rerun."
            ),
            CliError::SelfCheckTimeout(ms) => format!(
                "What happened: The balance did not come online within {ms} ms.\nLikely causes: Wrong port or baud rate, balance switched off, or cable unplugged.\nHow to fix: Check serial.port and serial.baud_rate against the balance's interface menu, or raise --timeout-ms."
            ),
            CliError::SelfCheckClosed(msg) => format!(
                "What happened: The link closed before the balance came online ({msg}).\nLikely causes: The port could not be opened or the device disappeared.\nHow to fix: Check that the port exists and that this user may open it."
            ),
            CliError::NoSerialSupport => "What happened: This build has no serial port support.\nLikely causes: Built without the `hardware` feature.\nHow to fix: Pass --sim, or rebuild with `cargo build --features hardware`.".to_string(),
        };
    }

    if let Some(se) = err.downcast_ref::<SicsError>() {
        return match se {
            SicsError::OpenFailed(msg) => format!(
                "What happened: The serial port failed to open ({msg}).\nLikely causes: Wrong path, port in use, or missing permissions.\nHow to fix: Check serial.port (or TTY) and the user's dialout group membership."
            ),
            SicsError::Transport(msg) | SicsError::Disconnected(msg) => format!(
                "What happened: The serial link failed ({msg}).\nLikely causes: Cable unplugged or adapter reset.\nHow to fix: Reconnect the balance, then send `open` or restart."
            ),
            SicsError::Command(ce) => format!(
                "What happened: A command was rejected ({ce}).\nLikely causes: Quotes, control characters or non-ASCII text in the command.\nHow to fix: Send plain printable ASCII."
            ),
            SicsError::EngineStopped => "What happened: The engine thread stopped.\nLikely causes: An earlier fatal error.\nHow to fix: Re-run with --log-level=debug for details.".to_string(),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 2 config, 3 link, 4 self-check, 5 build, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(ce) = err.downcast_ref::<CliError>() {
        return match ce {
            CliError::Config(_) => 2,
            CliError::SelfCheckTimeout(_) | CliError::SelfCheckClosed(_) => 4,
            CliError::NoSerialSupport => 5,
        };
    }
    match err.downcast_ref::<SicsError>() {
        Some(SicsError::Config(_)) => 2,
        Some(SicsError::OpenFailed(_) | SicsError::Transport(_) | SicsError::Disconnected(_)) => 3,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(ce) = err.downcast_ref::<CliError>() {
        return match ce {
            CliError::Config(_) => "Config",
            CliError::SelfCheckTimeout(_) => "SelfCheckTimeout",
            CliError::SelfCheckClosed(_) => "SelfCheckClosed",
            CliError::NoSerialSupport => "NoSerialSupport",
        };
    }
    match err.downcast_ref::<SicsError>() {
        Some(SicsError::OpenFailed(_)) => "OpenFailed",
        Some(SicsError::Transport(_) | SicsError::Disconnected(_)) => "Transport",
        Some(SicsError::Config(_)) => "Config",
        Some(SicsError::Command(_)) => "Command",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}
