#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! MT-SICS instrument communication engine (transport-agnostic).
//!
//! Everything that talks to the balance goes through
//! `sics_traits::Transport`; time flows in as explicit `Instant`s so the
//! session can be driven deterministically in tests.
//!
//! ## Architecture
//!
//! - **Catalog / Command**: typed command builder rendering wire lines
//! - **Queue**: FIFO of instantiated commands, cleared on every transition
//! - **Reply**: line cleanup, tokenizing and field parsers
//! - **Model**: meter configuration and last measurement with change detection
//! - **State**: connection lifecycle and the transition table
//! - **Session**: scheduler, correlator and pollers over one transport
//! - **Engine**: actor thread owning a `Session`, driven by an inbox and deadlines

pub mod catalog;
pub mod command;
pub mod config;
pub mod conversions;
pub mod engine;
pub mod error;
pub mod events;
pub mod mocks;
pub mod model;
pub mod queue;
pub mod reply;
pub mod session;
pub mod state;
pub mod transport_error;

pub use catalog::{Catalog, CommandDescriptor, CommandKind};
pub use command::Command;
pub use config::SessionSettings;
pub use engine::{EngineHandle, Snapshot};
pub use error::{CommandError, Report, Result, SicsError};
pub use events::{Event, EventKind};
pub use model::{LastError, Measurement, MeterConfiguration, SampleId};
pub use session::Session;
pub use state::ConnectionState;
