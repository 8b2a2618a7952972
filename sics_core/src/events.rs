//! Events published by the engine, each stamped with UTC time.
//!
//! Serialized as `{"utc": ..., "event": "<name>", "payload": ...}`.
use crate::model::{Measurement, MeterConfiguration};
use crate::state::ConnectionState;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "lowercase")]
pub enum EventKind {
    Error(String),
    State(ConnectionState),
    Tx(String),
    Rx(String),
    Result(Measurement),
    Configuration(MeterConfiguration),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub utc: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    pub fn now(kind: EventKind) -> Self {
        Self {
            utc: Utc::now(),
            kind,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self.kind {
            EventKind::Error(_) => "error",
            EventKind::State(_) => "state",
            EventKind::Tx(_) => "tx",
            EventKind::Rx(_) => "rx",
            EventKind::Result(_) => "result",
            EventKind::Configuration(_) => "configuration",
        }
    }
}
