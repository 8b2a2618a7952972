//! Meter configuration and last measurement, with change detection.
//!
//! Setters report whether the stored record changed. Comparison is plain
//! `PartialEq` on the records, so a NaN value never equals anything and
//! always counts as a change.
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Serializer};

pub const MAKE: &str = "Mettler Toledo";
const UNINITIATED: &str = "Uninitiated";

/// A value not yet reported by the balance serializes as `"Uninitiated"`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Field<T> {
    #[default]
    Uninitiated,
    Known(T),
}

impl<T> Field<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Self::Known(v) => Some(v),
            Self::Uninitiated => None,
        }
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Uninitiated => s.serialize_str(UNINITIATED),
            Self::Known(v) => v.serialize(s),
        }
    }
}

fn replace<T: PartialEq>(slot: &mut Field<T>, value: T) -> bool {
    let next = Field::Known(value);
    if *slot == next {
        return false;
    }
    *slot = next;
    true
}

// ── Enumerated settings ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WeighMode {
    Normal,
    Dosing,
}

impl WeighMode {
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Normal),
            1 => Some(Self::Dosing),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EnvironmentalStability {
    #[serde(rename = "Very Stable")]
    VeryStable,
    Stable,
    Standard,
    Unstable,
    #[serde(rename = "Very Unstable")]
    VeryUnstable,
    Automatic,
}

impl EnvironmentalStability {
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::VeryStable),
            1 => Some(Self::Stable),
            2 => Some(Self::Standard),
            3 => Some(Self::Unstable),
            4 => Some(Self::VeryUnstable),
            5 => Some(Self::Automatic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AutoZeroMode {
    Off,
    On,
}

impl AutoZeroMode {
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Off),
            1 => Some(Self::On),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StandbyTimeout {
    Off,
    #[serde(rename = "5 min")]
    Min5,
    #[serde(rename = "10 min")]
    Min10,
    #[serde(rename = "30 min")]
    Min30,
    #[serde(rename = "60 min")]
    Min60,
    #[serde(rename = "120 min")]
    Min120,
    #[serde(rename = "240 min")]
    Min240,
}

impl StandbyTimeout {
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Off),
            1 => Some(Self::Min5),
            2 => Some(Self::Min10),
            3 => Some(Self::Min30),
            4 => Some(Self::Min60),
            5 => Some(Self::Min120),
            6 => Some(Self::Min240),
            _ => None,
        }
    }
}

// ── MeterConfiguration ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MeterSettings {
    pub weigh_mode: Field<WeighMode>,
    pub environmental_stability: Field<EnvironmentalStability>,
    pub auto_zero_mode: Field<AutoZeroMode>,
    pub standby_timeout: Field<StandbyTimeout>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MeterConfiguration {
    pub make: String,
    pub model: Field<String>,
    #[serde(rename = "Type")]
    pub scale_type: Field<String>,
    pub serial_number: Field<String>,
    pub firmware_rev: Field<String>,
    pub configuration: MeterSettings,
}

impl Default for MeterConfiguration {
    fn default() -> Self {
        Self {
            make: MAKE.to_string(),
            model: Field::Uninitiated,
            scale_type: Field::Uninitiated,
            serial_number: Field::Uninitiated,
            firmware_rev: Field::Uninitiated,
            configuration: MeterSettings::default(),
        }
    }
}

impl MeterConfiguration {
    pub fn set_model(&mut self, v: String) -> bool {
        replace(&mut self.model, v)
    }
    pub fn set_scale_type(&mut self, v: String) -> bool {
        replace(&mut self.scale_type, v)
    }
    pub fn set_serial_number(&mut self, v: String) -> bool {
        replace(&mut self.serial_number, v)
    }
    pub fn set_firmware_rev(&mut self, v: String) -> bool {
        replace(&mut self.firmware_rev, v)
    }
    pub fn set_weigh_mode(&mut self, v: WeighMode) -> bool {
        replace(&mut self.configuration.weigh_mode, v)
    }
    pub fn set_environmental_stability(&mut self, v: EnvironmentalStability) -> bool {
        replace(&mut self.configuration.environmental_stability, v)
    }
    pub fn set_auto_zero_mode(&mut self, v: AutoZeroMode) -> bool {
        replace(&mut self.configuration.auto_zero_mode, v)
    }
    pub fn set_standby_timeout(&mut self, v: StandbyTimeout) -> bool {
        replace(&mut self.configuration.standby_timeout, v)
    }
}

// ── Measurement ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MeasurementStatus {
    Offline,
    Good,
    /// Last good values, kept after the session left `Online`
    Stale,
}

/// Origin of a weight reading.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SampleId {
    #[default]
    Uninitiated,
    /// Routine measurement poll
    Polled,
    /// Unsolicited print from the balance keypad
    Manual,
    /// Tagged with a caller-supplied identifier
    Requested(String),
}

impl SampleId {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Uninitiated => UNINITIATED,
            Self::Polled => "Polled",
            Self::Manual => "Manual",
            Self::Requested(id) => id,
        }
    }

    pub const fn is_polled(&self) -> bool {
        matches!(self, Self::Polled)
    }
}

impl Serialize for SampleId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tare {
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Weight {
    pub value: f64,
    pub unit: String,
    pub stable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub status: MeasurementStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "sampleID")]
    pub sample_id: SampleId,
    pub meter_timestamp: Field<String>,
    pub tare: Tare,
    pub weight: Weight,
}

/// 1900-01-01T12:00:00Z, the "never measured" timestamp.
fn never() -> DateTime<Utc> {
    let naive = NaiveDate::from_ymd_opt(1900, 1, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap_or_default();
    DateTime::from_naive_utc_and_offset(naive, Utc)
}

impl Default for Measurement {
    fn default() -> Self {
        Self {
            status: MeasurementStatus::Offline,
            timestamp: never(),
            sample_id: SampleId::Uninitiated,
            meter_timestamp: Field::Uninitiated,
            tare: Tare {
                value: f64::NAN,
                unit: String::new(),
            },
            weight: Weight {
                value: f64::NAN,
                unit: String::new(),
                stable: false,
            },
        }
    }
}

impl Measurement {
    /// Store a weight reading; returns whether the weight record changed.
    pub fn record_weight(&mut self, weight: Weight, sample_id: SampleId, at: DateTime<Utc>) -> bool {
        self.status = MeasurementStatus::Good;
        self.timestamp = at;
        self.sample_id = sample_id;
        let changed = self.weight != weight;
        self.weight = weight;
        changed
    }

    /// Store a tare reading; returns whether the tare record changed.
    pub fn record_tare(&mut self, tare: Tare) -> bool {
        let changed = self.tare != tare;
        self.tare = tare;
        changed
    }

    pub fn mark_stale(&mut self) {
        if self.status == MeasurementStatus::Good {
            self.status = MeasurementStatus::Stale;
        }
    }
}

/// Last protocol error report received from the balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastError {
    pub message: String,
    pub offending_command_name: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn grams(value: f64, stable: bool) -> Weight {
        Weight {
            value,
            unit: "g".into(),
            stable,
        }
    }

    #[test]
    fn fresh_configuration_serializes_uninitiated() {
        let v = serde_json::to_value(MeterConfiguration::default()).expect("json");
        assert_eq!(
            v,
            json!({
                "Make": "Mettler Toledo",
                "Model": "Uninitiated",
                "Type": "Uninitiated",
                "SerialNumber": "Uninitiated",
                "FirmwareRev": "Uninitiated",
                "Configuration": {
                    "WeighMode": "Uninitiated",
                    "EnvironmentalStability": "Uninitiated",
                    "AutoZeroMode": "Uninitiated",
                    "StandbyTimeout": "Uninitiated"
                }
            })
        );
    }

    #[test]
    fn setters_report_changes_once() {
        let mut cfg = MeterConfiguration::default();
        assert!(cfg.set_model("XPE205".into()));
        assert!(!cfg.set_model("XPE205".into()));
        assert!(cfg.set_standby_timeout(StandbyTimeout::Min30));
        assert!(!cfg.set_standby_timeout(StandbyTimeout::Min30));
        let v = serde_json::to_value(&cfg).expect("json");
        assert_eq!(v["Configuration"]["StandbyTimeout"], "30 min");
    }

    #[test]
    fn code_tables() {
        assert_eq!(WeighMode::from_code(1), Some(WeighMode::Dosing));
        assert_eq!(WeighMode::from_code(2), None);
        assert_eq!(
            EnvironmentalStability::from_code(4),
            Some(EnvironmentalStability::VeryUnstable)
        );
        assert_eq!(EnvironmentalStability::from_code(6), None);
        assert_eq!(AutoZeroMode::from_code(0), Some(AutoZeroMode::Off));
        assert_eq!(StandbyTimeout::from_code(6), Some(StandbyTimeout::Min240));
        assert_eq!(StandbyTimeout::from_code(7), None);
    }

    #[test]
    fn initial_measurement_shape() {
        let v = serde_json::to_value(Measurement::default()).expect("json");
        assert_eq!(v["status"], "Offline");
        assert_eq!(v["timestamp"], "1900-01-01T12:00:00Z");
        assert_eq!(v["sampleID"], "Uninitiated");
        assert_eq!(v["meterTimestamp"], "Uninitiated");
        assert!(v["weight"]["value"].is_null());
        assert_eq!(v["weight"]["stable"], false);
    }

    #[test]
    fn nan_counts_as_changed_until_real_value() {
        let mut m = Measurement::default();
        assert!(m.record_tare(Tare {
            value: f64::NAN,
            unit: String::new()
        }));
        assert!(m.record_weight(grams(1.0, true), SampleId::Polled, Utc::now()));
        assert!(!m.record_weight(grams(1.0, true), SampleId::Polled, Utc::now()));
        assert!(m.record_weight(grams(1.0, false), SampleId::Polled, Utc::now()));
    }

    #[test]
    fn stale_only_from_good() {
        let mut m = Measurement::default();
        m.mark_stale();
        assert_eq!(m.status, MeasurementStatus::Offline);
        m.record_weight(grams(2.0, true), SampleId::Manual, Utc::now());
        m.mark_stale();
        assert_eq!(m.status, MeasurementStatus::Stale);
    }

    #[test]
    fn requested_sample_id_serializes_as_given() {
        let v = serde_json::to_value(SampleId::Requested("batch42".into())).expect("json");
        assert_eq!(v, "batch42");
    }
}
