//! Seams between the MT-SICS engine and the outside world.
//!
//! Kept dependency-free so transports and test doubles can implement them
//! without pulling in the engine.
pub mod clock;
pub mod transport;

pub use clock::{Clock, MonotonicClock};
pub use transport::{BoxError, Transport, TransportEvent, TransportNotify};
