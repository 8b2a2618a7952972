//! One MT-SICS session over a transport: command scheduler, response
//! correlator, periodic pollers and the connection state machine.
//!
//! `Session` is single-threaded and reads no clock of its own: every entry
//! point takes the current `Instant`, and `next_deadline` tells the caller
//! when to call `tick` again. The engine actor owns one session and drives
//! it from its inbox; tests drive it directly.
//!
//! Scheduling discipline: exactly one command is outstanding at a time.
//! The watchdog fires after the outstanding command's timeout; a solicited
//! reply resumes the scheduler early. Every state transition clears the
//! queue and resets the outstanding command to the idle placeholder.
use crate::catalog::{Catalog, CommandKind};
use crate::command::Command;
use crate::config::SessionSettings;
use crate::error::{Result, SicsError};
use crate::events::{Event, EventKind};
use crate::model::{self, LastError, Measurement, MeterConfiguration, SampleId, Tare, Weight};
use crate::queue::CommandQueue;
use crate::reply::{self, ReplyKind};
use crate::state::{ConnectionState, Resume, transition_after};
use crate::transport_error::map_transport_error;
use chrono::{Local, Utc};
use crossbeam_channel::{Sender, TrySendError};
use sics_traits::{Transport, TransportEvent, TransportNotify};
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone)]
struct PendingSample {
    id: String,
    deadline: Instant,
}

pub struct Session<T: Transport> {
    transport: T,
    settings: SessionSettings,
    catalog: Catalog,
    state: ConnectionState,
    queue: CommandQueue,
    outstanding: Command,
    watchdog_at: Instant,
    measure_poll_at: Instant,
    alive_poll_at: Instant,
    sample: Option<PendingSample>,
    meter: MeterConfiguration,
    measurement: Measurement,
    last_error: Option<LastError>,
    events: Sender<Event>,
}

impl<T: Transport> Session<T> {
    /// Build a closed session and start its scheduler loop at `now`.
    pub fn new(
        transport: T,
        settings: SessionSettings,
        events: Sender<Event>,
        now: Instant,
    ) -> Result<Self> {
        settings.validate()?;
        let catalog = Catalog::new(&settings);
        let outstanding = catalog.idle();
        let mut session = Self {
            transport,
            measure_poll_at: now + settings.meas_poll,
            alive_poll_at: now + settings.alive_poll,
            watchdog_at: now,
            settings,
            catalog,
            state: ConnectionState::Closed,
            queue: CommandQueue::new(),
            outstanding,
            sample: None,
            meter: MeterConfiguration::default(),
            measurement: Measurement::default(),
            last_error: None,
            events,
        };
        session.advance(Resume::Timeout, now);
        Ok(session)
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    pub const fn meter_configuration(&self) -> &MeterConfiguration {
        &self.meter
    }

    pub const fn measurement(&self) -> &Measurement {
        &self.measurement
    }

    pub const fn last_error(&self) -> Option<&LastError> {
        self.last_error.as_ref()
    }

    pub const fn outstanding(&self) -> &Command {
        &self.outstanding
    }

    pub fn queued(&self) -> impl Iterator<Item = &Command> {
        self.queue.iter()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn pending_sample(&self) -> Option<&str> {
        self.sample.as_ref().map(|p| p.id.as_str())
    }

    pub const fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub const fn watchdog_deadline(&self) -> Instant {
        self.watchdog_at
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Earliest instant at which `tick` has work to do.
    pub fn next_deadline(&self) -> Instant {
        let mut at = self
            .watchdog_at
            .min(self.measure_poll_at)
            .min(self.alive_poll_at);
        if let Some(p) = &self.sample {
            at = at.min(p.deadline);
        }
        at
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Acquire the transport. Only valid from `Closed`.
    pub fn open(&mut self, notify: TransportNotify) -> Result<()> {
        if self.state != ConnectionState::Closed {
            return Err(SicsError::State(format!("cannot open while {}", self.state)).into());
        }
        self.set_state(ConnectionState::Opening);
        match self.transport.open(notify) {
            Ok(()) => {
                self.set_state(ConnectionState::Offline);
                Ok(())
            }
            Err(e) => {
                let mapped = map_transport_error(&*e);
                error!(error = %mapped, "port failed to open");
                self.emit(EventKind::Error(format!("Port Failed to open: {mapped}")));
                self.set_state(ConnectionState::Closed);
                Err(SicsError::OpenFailed(mapped.to_string()).into())
            }
        }
    }

    /// Request the transport to close. `Closed` follows when the transport
    /// reports it, or at once if the link is already down.
    pub fn close(&mut self) {
        if matches!(
            self.state,
            ConnectionState::Closed | ConnectionState::Closing
        ) {
            debug!(state = %self.state, "close ignored");
            return;
        }
        self.set_state(ConnectionState::Closing);
        if !self.transport.is_open() {
            self.set_state(ConnectionState::Closed);
            return;
        }
        if let Err(e) = self.transport.close() {
            let mapped = map_transport_error(&*e);
            error!(error = %mapped, "port close failed");
            self.emit(EventKind::Error(format!("Port Error: {mapped}")));
            self.set_state(ConnectionState::Closed);
        }
    }

    /// Release the transport without going through the state machine.
    pub fn release(&mut self) {
        if self.transport.is_open() {
            if let Err(e) = self.transport.close() {
                warn!(error = %e, "transport close on shutdown failed");
            }
        }
    }

    pub fn on_transport_event(&mut self, ev: TransportEvent, now: Instant) {
        match ev {
            TransportEvent::Line(line) => self.on_line(&line, now),
            TransportEvent::Error(msg) => {
                error!(error = %msg, "transport fault");
                self.emit(EventKind::Error(format!("Port Error: {msg}")));
                self.close();
            }
            TransportEvent::Closed => {
                if self.state != ConnectionState::Closed {
                    self.set_state(ConnectionState::Closed);
                }
            }
        }
    }

    // ── Control surface ──────────────────────────────────────────────────────

    /// Tag the next weight reading with `id`. An empty id cancels any
    /// pending request; a new id supersedes an unclaimed one.
    pub fn request_sample(&mut self, id: &str, now: Instant) {
        let id = id.trim();
        let prev = self.sample.take();
        if id.is_empty() {
            if let Some(p) = prev {
                debug!(id = %p.id, "sample request cancelled");
            }
            return;
        }
        if let Some(p) = prev {
            debug!(old = %p.id, new = %id, "sample request superseded");
        }
        self.sample = Some(PendingSample {
            id: id.to_string(),
            deadline: now + self.settings.sample_window(),
        });
    }

    /// Queue a diagnostic line. Text naming a catalog entry queues that
    /// entry instead.
    pub fn send(&mut self, text: &str) -> Result<()> {
        let cmd = match self.catalog.by_name(text, Local::now().naive_local()) {
            Some(built) => built.map_err(SicsError::from)?,
            None => self.catalog.raw(text).map_err(SicsError::from)?,
        };
        self.enqueue(cmd);
        Ok(())
    }

    pub fn enqueue(&mut self, cmd: Command) {
        trace!(cmd = %cmd, depth = self.queue.len() + 1, "enqueue");
        self.queue.push(cmd);
    }

    fn enqueue_kind(&mut self, kind: CommandKind) {
        match self.catalog.fixed(kind) {
            Ok(cmd) => self.enqueue(cmd),
            Err(e) => error!(error = %e, kind = %kind, "cannot build command"),
        }
    }

    // ── Timers ───────────────────────────────────────────────────────────────

    /// Fire every deadline that has elapsed at `now`.
    pub fn tick(&mut self, now: Instant) {
        if self.sample.as_ref().is_some_and(|p| now >= p.deadline) {
            if let Some(p) = self.sample.take() {
                warn!(id = %p.id, "sample request timed out");
                self.emit(EventKind::Error(format!("Sample Request Timeout: {}", p.id)));
            }
        }
        if now >= self.measure_poll_at {
            if self.state == ConnectionState::Online {
                self.enqueue_kind(CommandKind::Tare);
                self.enqueue_kind(CommandKind::WeightImmediate);
            }
            self.measure_poll_at = now + self.settings.meas_poll;
        }
        if now >= self.alive_poll_at {
            if self.state == ConnectionState::Offline {
                self.enqueue_kind(CommandKind::Poll);
            }
            self.alive_poll_at = now + self.settings.alive_poll;
        }
        if now >= self.watchdog_at {
            self.advance(Resume::Timeout, now);
        }
    }

    // ── Scheduler ────────────────────────────────────────────────────────────

    fn set_state(&mut self, next: ConnectionState) {
        info!(from = %self.state, to = %next, "state change");
        if self.state == ConnectionState::Online && next != ConnectionState::Online {
            self.measurement.mark_stale();
        }
        self.queue.clear();
        self.state = next;
        self.outstanding = self.catalog.idle();
        self.emit(EventKind::State(next));
    }

    fn enqueue_init_sequence(&mut self) {
        match self.catalog.init_sequence(Local::now().naive_local()) {
            Ok(seq) => {
                for cmd in seq {
                    self.queue.push(cmd);
                }
            }
            Err(e) => {
                error!(error = %e, "cannot build initialization sequence");
                self.emit(EventKind::Error(format!("Initialization failed: {e}")));
            }
        }
    }

    fn advance(&mut self, cause: Resume, now: Instant) {
        if self.outstanding.response_required() {
            if let Some(next) = transition_after(self.state, self.outstanding.kind(), cause) {
                self.set_state(next);
                if next == ConnectionState::Initializing {
                    self.enqueue_init_sequence();
                }
            }
        }

        let pause = self.outstanding.pause_after_response();
        let next = if self.outstanding.response_required() && !pause.is_zero() {
            self.catalog.idle().with_timeout(pause)
        } else {
            self.queue.pop().unwrap_or_else(|| self.catalog.idle())
        };
        self.outstanding = next;
        self.watchdog_at = now + self.outstanding.timeout();
        self.transmit();
    }

    fn transmit(&mut self) {
        let wire = self.outstanding.wire();
        if wire.is_empty() {
            return;
        }
        if !self.transport.is_open() {
            debug!(cmd = %self.outstanding, "link down, command dropped");
            return;
        }
        match self.transport.write_line(&wire) {
            Ok(()) => {
                let line = self.outstanding.line().to_string();
                trace!(%line, "tx");
                self.emit(EventKind::Tx(line));
            }
            Err(e) => {
                let mapped = map_transport_error(&*e);
                error!(error = %mapped, cmd = %self.outstanding, "write failed");
                self.emit(EventKind::Error(format!("Port Error: {mapped}")));
                self.close();
            }
        }
    }

    // ── Correlator ───────────────────────────────────────────────────────────

    /// Classify one inbound line, update the model and resume the scheduler
    /// if it answered the outstanding command.
    pub fn on_line(&mut self, raw: &str, now: Instant) {
        let line = reply::clean_line(raw);
        if line.is_empty() {
            return;
        }
        trace!(%line, "rx");
        self.emit(EventKind::Rx(line.clone()));

        let Some(token) = reply::leading_token(&line) else {
            debug!(%line, "untokenizable line discarded");
            return;
        };
        if reply::is_error_report(token) {
            self.record_protocol_error(&line);
            return;
        }

        let solicited = self.outstanding.expected_reply() == Some(token);
        let accepted = match ReplyKind::from_token(token) {
            Some(kind) => self.dispatch(kind, &line),
            None => {
                if !solicited {
                    debug!(%line, "unsolicited line discarded");
                }
                true
            }
        };
        if solicited && accepted {
            self.advance(Resume::ReplyReceived, now);
        }
    }

    fn record_protocol_error(&mut self, line: &str) {
        let name = self.outstanding.kind().name().to_string();
        warn!(%line, command = %name, "balance reported an error");
        self.last_error = Some(LastError {
            message: line.to_string(),
            offending_command_name: name.clone(),
            timestamp: Utc::now(),
        });
        self.emit(EventKind::Error(format!("Protocol Error: {line} ({name})")));
    }

    /// Returns false when the line was malformed for its shape.
    fn dispatch(&mut self, kind: ReplyKind, line: &str) -> bool {
        match kind {
            ReplyKind::Weight => self.on_weight(line),
            ReplyKind::Tare => self.on_tare(line),
            ReplyKind::Model
            | ReplyKind::ScaleType
            | ReplyKind::SerialNumber
            | ReplyKind::Firmware => self.on_identity(kind, line),
            ReplyKind::WeighMode
            | ReplyKind::EnvStability
            | ReplyKind::AutoZero
            | ReplyKind::StandbyTimeout => self.on_code(kind, line),
        }
    }

    fn on_weight(&mut self, line: &str) -> bool {
        let Some(r) = reply::parse_weight(line) else {
            warn!(%line, "incorrect weight format");
            return false;
        };
        let sample_id = if let Some(p) = self.sample.take() {
            debug!(id = %p.id, "sample request claimed");
            SampleId::Requested(p.id)
        } else if self.outstanding.kind() == CommandKind::WeightImmediate {
            SampleId::Polled
        } else {
            SampleId::Manual
        };
        let polled = sample_id.is_polled();
        if !polled {
            for _ in 0..3 {
                self.enqueue_kind(CommandKind::Beep);
            }
        }
        let weight = Weight {
            value: r.value,
            unit: r.unit,
            stable: r.stable,
        };
        let changed = self.measurement.record_weight(weight, sample_id, Utc::now());
        if !polled || changed {
            self.emit(EventKind::Result(self.measurement.clone()));
        }
        true
    }

    fn on_tare(&mut self, line: &str) -> bool {
        let Some(r) = reply::parse_tare(line) else {
            warn!(%line, "incorrect tare format");
            return false;
        };
        let tare = Tare {
            value: r.value,
            unit: r.unit,
        };
        if self.measurement.record_tare(tare) {
            self.emit(EventKind::Result(self.measurement.clone()));
        }
        true
    }

    fn on_identity(&mut self, kind: ReplyKind, line: &str) -> bool {
        let Some(text) = reply::parse_quoted(kind.token(), line) else {
            warn!(%line, reply = kind.token(), "incorrect identity format");
            return false;
        };
        let changed = match kind {
            ReplyKind::Model => self.meter.set_model(text),
            ReplyKind::ScaleType => self.meter.set_scale_type(text),
            ReplyKind::SerialNumber => self.meter.set_serial_number(text),
            _ => self.meter.set_firmware_rev(text),
        };
        if changed {
            self.emit_configuration();
        }
        true
    }

    fn on_code(&mut self, kind: ReplyKind, line: &str) -> bool {
        let Some(code) = reply::parse_code(kind.token(), line) else {
            warn!(%line, reply = kind.token(), "incorrect setting format");
            return false;
        };
        let meter = &mut self.meter;
        let changed = match kind {
            ReplyKind::WeighMode => model::WeighMode::from_code(code).map(|v| meter.set_weigh_mode(v)),
            ReplyKind::EnvStability => model::EnvironmentalStability::from_code(code)
                .map(|v| meter.set_environmental_stability(v)),
            ReplyKind::AutoZero => {
                model::AutoZeroMode::from_code(code).map(|v| meter.set_auto_zero_mode(v))
            }
            _ => model::StandbyTimeout::from_code(code).map(|v| meter.set_standby_timeout(v)),
        };
        match changed {
            Some(true) => self.emit_configuration(),
            Some(false) => {}
            None => warn!(code, reply = kind.token(), "unknown setting code, field unchanged"),
        }
        true
    }

    // ── Events ───────────────────────────────────────────────────────────────

    fn emit_configuration(&self) {
        self.emit(EventKind::Configuration(self.meter.clone()));
    }

    fn emit(&self, kind: EventKind) {
        // A slow or absent consumer never stalls the session.
        match self.events.try_send(Event::now(kind)) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(ev)) => {
                debug!(event = ev.name(), "event queue full, event dropped");
            }
        }
    }
}
