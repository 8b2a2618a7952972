//! Real RS-232/USB serial link to an MT-SICS balance.
//!
//! A reader thread owns a cloned handle of the port, frames inbound bytes into
//! lines and forwards them through the notify callback. The reader always
//! reports `Closed` on exit; an I/O failure is reported as `Error` first.
use crate::error::HwError;
use crate::framer::LineFramer;
use serialport::SerialPort;
use sics_traits::{BoxError, Transport, TransportEvent, TransportNotify};
use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Read timeout used so the reader notices shutdown promptly.
const READ_POLL: Duration = Duration::from_millis(100);

pub struct SerialTransport {
    path: String,
    baud_rate: u32,
    port: Option<Box<dyn SerialPort>>,
    shutdown: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl SerialTransport {
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            port: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            reader: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn stop_reader(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
    }
}

fn read_loop(mut port: Box<dyn SerialPort>, shutdown: Arc<AtomicBool>, mut notify: TransportNotify) {
    let mut framer = LineFramer::new();
    let mut buf = [0u8; 256];
    while !shutdown.load(Ordering::Relaxed) {
        match port.read(&mut buf) {
            Ok(0) => {}
            Ok(n) => {
                framer.push(&buf[..n]);
                while let Some(line) = framer.next_line() {
                    trace!(%line, "serial rx");
                    notify(TransportEvent::Line(line));
                }
            }
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                if !shutdown.load(Ordering::Relaxed) {
                    warn!(error = %e, "serial read failed");
                    notify(TransportEvent::Error(HwError::Io(e).to_string()));
                }
                break;
            }
        }
    }
    debug!("serial reader exiting");
    notify(TransportEvent::Closed);
}

impl Transport for SerialTransport {
    fn open(&mut self, notify: TransportNotify) -> Result<(), BoxError> {
        if self.port.is_some() {
            return Err(Box::new(HwError::AlreadyOpen));
        }
        let port = serialport::new(&self.path, self.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(READ_POLL)
            .open()
            .map_err(|e| HwError::Serial(format!("{}: {e}", self.path)))?;
        let reader_port = port
            .try_clone()
            .map_err(|e| HwError::Serial(format!("{}: {e}", self.path)))?;

        self.shutdown = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::clone(&self.shutdown);
        let handle = std::thread::Builder::new()
            .name("sics-serial-rx".into())
            .spawn(move || read_loop(reader_port, shutdown, notify))?;
        self.reader = Some(handle);
        self.port = Some(port);
        debug!(path = %self.path, baud = self.baud_rate, "serial port opened");
        Ok(())
    }

    fn write_line(&mut self, line: &[u8]) -> Result<(), BoxError> {
        let port = self.port.as_mut().ok_or(HwError::NotOpen)?;
        port.write_all(line).map_err(HwError::Io)?;
        port.flush().map_err(HwError::Io)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.port = None;
        self.stop_reader();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.port = None;
        self.stop_reader();
    }
}
