use crate::error::SicsError;
use std::time::Duration;

/// Timing and identity knobs for one session.
///
/// Defaults mirror a bare library user; the CLI maps `sics_config::Config`
/// into this via `conversions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Reply timeout for catalog commands
    pub cmd_timeout: Duration,
    /// Idle placeholder wait
    pub idle: Duration,
    /// Wait after a raw diagnostic command
    pub raw_timeout: Duration,
    /// Measurement poll period (Online only)
    pub meas_poll: Duration,
    /// Heartbeat period (Offline only)
    pub alive_poll: Duration,
    /// Added to `meas_poll` to form the sample request deadline
    pub sample_grace: Duration,
    /// Post-reply pause after a beep; zero disables
    pub beep_pause: Duration,
    /// Tag written with `I10` during initialization
    pub device_id: String,
    /// Events buffered for the consumer; newer events are dropped when full
    pub event_capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cmd_timeout: Duration::from_millis(300),
            idle: Duration::from_millis(50),
            raw_timeout: Duration::from_millis(1000),
            meas_poll: Duration::from_millis(100),
            alive_poll: Duration::from_millis(5000),
            sample_grace: Duration::from_millis(3000),
            beep_pause: Duration::ZERO,
            device_id: "Tagname".to_string(),
            event_capacity: 1024,
        }
    }
}

impl SessionSettings {
    /// How long an on-demand sample request waits for a weight reading.
    pub fn sample_window(&self) -> Duration {
        self.meas_poll + self.sample_grace
    }

    pub fn validate(&self) -> Result<(), SicsError> {
        let timers = [
            ("cmd_timeout", self.cmd_timeout),
            ("idle", self.idle),
            ("raw_timeout", self.raw_timeout),
            ("meas_poll", self.meas_poll),
            ("alive_poll", self.alive_poll),
        ];
        for (name, d) in timers {
            if d.is_zero() {
                return Err(SicsError::Config(format!("{name} must be > 0")));
            }
        }
        if self.event_capacity == 0 {
            return Err(SicsError::Config("event_capacity must be > 0".into()));
        }
        crate::catalog::check_text(&self.device_id)
            .map_err(|e| SicsError::Config(format!("device_id: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_poll_plus_grace() {
        let s = SessionSettings::default();
        assert_eq!(s.sample_window(), Duration::from_millis(3100));
        assert!(s.validate().is_ok());
    }

    #[test]
    fn zero_timer_is_rejected() {
        let s = SessionSettings {
            idle: Duration::ZERO,
            ..SessionSettings::default()
        };
        assert!(matches!(s.validate(), Err(SicsError::Config(m)) if m.contains("idle")));
    }

    #[test]
    fn zero_event_capacity_is_rejected() {
        let s = SessionSettings {
            event_capacity: 0,
            ..SessionSettings::default()
        };
        assert!(matches!(s.validate(), Err(SicsError::Config(m)) if m.contains("event_capacity")));
    }

    #[test]
    fn quoted_device_id_is_rejected() {
        let s = SessionSettings {
            device_id: "a\"b".into(),
            ..SessionSettings::default()
        };
        assert!(s.validate().is_err());
    }
}
