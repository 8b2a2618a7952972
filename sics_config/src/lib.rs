#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the MT-SICS balance driver.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Every section has defaults, so an empty file is a valid config.
//! - Deployment environment variables can override a handful of fields via
//!   [`Config::apply_env`]; numeric overrides are clamped into range.
use serde::Deserialize;
use std::path::Path;

/// Accepted serial baud rates.
pub const BAUD_RATE_RANGE: std::ops::RangeInclusive<u32> = 1200..=115_200;
/// Accepted measurement poll periods (ms).
pub const MEAS_POLL_RANGE_MS: std::ops::RangeInclusive<u64> = 200..=5000;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Serial {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM3`.
    pub port: String,
    pub baud_rate: u32,
}

impl Default for Serial {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 38_400,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Timing {
    /// Reply timeout for catalog commands (ms)
    pub cmd_timeout_ms: u64,
    /// Measurement poll period while online (ms)
    pub meas_poll_ms: u64,
    /// Heartbeat period while offline (ms)
    pub alive_poll_ms: u64,
    /// Wait used by the idle placeholder when nothing is queued (ms)
    pub idle_ms: u64,
    /// Wait after an ad-hoc raw command (ms)
    pub raw_timeout_ms: u64,
    /// Added to `meas_poll_ms` to form the sample request deadline (ms)
    pub sample_grace_ms: u64,
    /// Post-reply pause after a beep (ms); 0 disables
    pub beep_pause_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            cmd_timeout_ms: 500,
            meas_poll_ms: 250,
            alive_poll_ms: 1000,
            idle_ms: 50,
            raw_timeout_ms: 1000,
            sample_grace_ms: 3000,
            beep_pause_ms: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Device {
    /// Tag written to the balance with `I10` during initialization.
    pub device_id: String,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            device_id: "WT9999X".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub serial: Serial,
    pub timing: Timing,
    pub device: Device,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Parse `raw` as an integer and clamp it into `range`; unparseable input
/// yields `default`.
pub fn constrain<T>(raw: &str, default: T, range: std::ops::RangeInclusive<T>) -> T
where
    T: std::str::FromStr + Ord + Copy,
{
    match raw.trim().parse::<T>() {
        Ok(v) => v.clamp(*range.start(), *range.end()),
        Err(_) => default,
    }
}

impl Config {
    /// Apply deployment overrides: `TTY`, `BAUDRATE`, `METER_POLL_MS`,
    /// `MQTT_DEVICE_ID`. `lookup` is usually `|k| std::env::var(k).ok()`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(tty) = lookup("TTY").filter(|v| !v.trim().is_empty()) {
            self.serial.port = tty.trim().to_string();
        }
        if let Some(raw) = lookup("BAUDRATE") {
            self.serial.baud_rate = constrain(&raw, Serial::default().baud_rate, BAUD_RATE_RANGE);
        }
        if let Some(raw) = lookup("METER_POLL_MS") {
            self.timing.meas_poll_ms =
                constrain(&raw, Timing::default().meas_poll_ms, MEAS_POLL_RANGE_MS);
        }
        if let Some(id) = lookup("MQTT_DEVICE_ID").filter(|v| !v.trim().is_empty()) {
            self.device.device_id = id.trim().to_string();
        }
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Serial
        if self.serial.port.trim().is_empty() {
            eyre::bail!("serial.port must not be empty");
        }
        if !BAUD_RATE_RANGE.contains(&self.serial.baud_rate) {
            eyre::bail!(
                "serial.baud_rate must be in [{}, {}]",
                BAUD_RATE_RANGE.start(),
                BAUD_RATE_RANGE.end()
            );
        }

        // Timing
        if self.timing.cmd_timeout_ms == 0 {
            eyre::bail!("timing.cmd_timeout_ms must be >= 1");
        }
        if !MEAS_POLL_RANGE_MS.contains(&self.timing.meas_poll_ms) {
            eyre::bail!(
                "timing.meas_poll_ms must be in [{}, {}]",
                MEAS_POLL_RANGE_MS.start(),
                MEAS_POLL_RANGE_MS.end()
            );
        }
        if self.timing.alive_poll_ms == 0 {
            eyre::bail!("timing.alive_poll_ms must be >= 1");
        }
        if self.timing.idle_ms == 0 {
            eyre::bail!("timing.idle_ms must be >= 1");
        }
        if self.timing.raw_timeout_ms == 0 {
            eyre::bail!("timing.raw_timeout_ms must be >= 1");
        }
        if self.timing.cmd_timeout_ms > 60_000 || self.timing.alive_poll_ms > 60 * 60 * 1000 {
            eyre::bail!("timing values are unreasonably large");
        }

        // Device tag ends up inside a quoted I10 argument
        let id = &self.device.device_id;
        if id.is_empty() {
            eyre::bail!("device.device_id must not be empty");
        }
        if let Some(c) = id
            .chars()
            .find(|c| !c.is_ascii() || c.is_ascii_control() || *c == '"')
        {
            eyre::bail!("device.device_id contains forbidden character {c:?}");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = load_toml("").expect("parse empty");
        assert_eq!(cfg, Config::default());
        cfg.validate().expect("defaults validate");
    }

    #[test]
    fn constrain_clamps_and_falls_back() {
        assert_eq!(constrain("100", 250u64, MEAS_POLL_RANGE_MS), 200);
        assert_eq!(constrain("9000", 250u64, MEAS_POLL_RANGE_MS), 5000);
        assert_eq!(constrain(" 750 ", 250u64, MEAS_POLL_RANGE_MS), 750);
        assert_eq!(constrain("fast", 250u64, MEAS_POLL_RANGE_MS), 250);
    }
}
