//! Test and helper mocks for sics_core

use sics_traits::{BoxError, Transport, TransportEvent, TransportNotify};

/// Transport that records written lines and never replies on its own.
///
/// Tests feed replies straight into the session; `close` delivers `Closed`
/// through the notify callback like a real port would.
#[derive(Default)]
pub struct RecordingTransport {
    written: Vec<String>,
    notify: Option<TransportNotify>,
    open: bool,
    pub fail_open: bool,
    pub fail_write: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines written so far, terminators stripped.
    pub fn written(&self) -> &[String] {
        &self.written
    }

    /// Push an event through the callback given at open.
    pub fn emit(&mut self, ev: TransportEvent) {
        if let Some(notify) = self.notify.as_mut() {
            notify(ev);
        }
    }
}

impl Transport for RecordingTransport {
    fn open(&mut self, notify: TransportNotify) -> Result<(), BoxError> {
        if self.fail_open {
            return Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such device",
            )));
        }
        self.notify = Some(notify);
        self.open = true;
        Ok(())
    }

    fn write_line(&mut self, line: &[u8]) -> Result<(), BoxError> {
        if !self.open {
            return Err(Box::new(std::io::Error::other("port not open")));
        }
        if self.fail_write {
            return Err(Box::new(std::io::Error::other("write failed")));
        }
        self.written
            .push(String::from_utf8_lossy(line).trim_end().to_string());
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        if self.open {
            self.open = false;
            self.emit(TransportEvent::Closed);
            self.notify = None;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
