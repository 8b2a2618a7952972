//! Transports for the MT-SICS engine: an in-memory balance for tests and
//! demos, and (behind the `hardware` feature) a real serial port.
pub mod error;
pub mod framer;
pub mod sim;

#[cfg(feature = "hardware")]
pub mod serial;

pub use error::HwError;
pub use framer::LineFramer;
pub use sim::{SimControl, SimulatedBalance};

#[cfg(feature = "hardware")]
pub use serial::SerialTransport;
