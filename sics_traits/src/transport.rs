//! Line-oriented transport contract consumed by the engine.

/// Error type used at the trait boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Notifications a transport delivers after it has been opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One complete inbound line, already delimited (terminator may remain).
    Line(String),
    /// Asynchronous fault on the link (read failure, device unplugged, ...).
    Error(String),
    /// The link is closed; no further events follow.
    Closed,
}

/// Callback handed to [`Transport::open`]; invoked from whichever thread
/// the transport reads on.
pub type TransportNotify = Box<dyn FnMut(TransportEvent) + Send>;

/// Half-duplex, line-framed link to an instrument.
///
/// Framing bytes into lines is the implementation's job; the engine never
/// sees partial lines.
pub trait Transport {
    /// Acquire the link and start delivering events through `notify`.
    fn open(&mut self, notify: TransportNotify) -> Result<(), BoxError>;

    /// Write one complete, already terminated line.
    fn write_line(&mut self, line: &[u8]) -> Result<(), BoxError>;

    /// Release the link. Implementations deliver [`TransportEvent::Closed`]
    /// once the link is down.
    fn close(&mut self) -> Result<(), BoxError>;

    fn is_open(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self, notify: TransportNotify) -> Result<(), BoxError> {
        (**self).open(notify)
    }

    fn write_line(&mut self, line: &[u8]) -> Result<(), BoxError> {
        (**self).write_line(line)
    }

    fn close(&mut self) -> Result<(), BoxError> {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}
