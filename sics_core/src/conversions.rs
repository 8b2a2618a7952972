//! `From` implementations bridging `sics_config` types to `sics_core` types.

use crate::config::SessionSettings;
use std::time::Duration;

// ── SessionSettings ──────────────────────────────────────────────────────────

impl From<&sics_config::Config> for SessionSettings {
    fn from(c: &sics_config::Config) -> Self {
        let t = &c.timing;
        Self {
            cmd_timeout: Duration::from_millis(t.cmd_timeout_ms),
            idle: Duration::from_millis(t.idle_ms),
            raw_timeout: Duration::from_millis(t.raw_timeout_ms),
            meas_poll: Duration::from_millis(t.meas_poll_ms),
            alive_poll: Duration::from_millis(t.alive_poll_ms),
            sample_grace: Duration::from_millis(t.sample_grace_ms),
            beep_pause: Duration::from_millis(t.beep_pause_ms),
            device_id: c.device.device_id.clone(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_map_to_gateway_timing() {
        let s = SessionSettings::from(&sics_config::Config::default());
        assert_eq!(s.cmd_timeout, Duration::from_millis(500));
        assert_eq!(s.meas_poll, Duration::from_millis(250));
        assert_eq!(s.alive_poll, Duration::from_millis(1000));
        assert_eq!(s.sample_window(), Duration::from_millis(3250));
        assert_eq!(s.device_id, "WT9999X");
        assert!(s.validate().is_ok());
    }
}
