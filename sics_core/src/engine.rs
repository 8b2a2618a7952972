//! Actor thread owning a [`Session`].
//!
//! The thread blocks on its inbox until the session's earliest deadline,
//! then fires every elapsed deadline. Control requests and transport
//! notifications share the inbox, so handlers run to completion and no
//! locks guard session state.
//!
//! Dropping the [`EngineHandle`] shuts the actor down, closes the transport
//! and joins the thread.
use crate::catalog::Catalog;
use crate::config::SessionSettings;
use crate::error::{Result, SicsError};
use crate::events::Event;
use crate::model::{LastError, Measurement, MeterConfiguration};
use crate::session::Session;
use crate::state::ConnectionState;
use chrono::Local;
use crossbeam_channel as xch;
use serde::Serialize;
use sics_traits::{Clock, Transport, TransportEvent};
use std::thread::JoinHandle;

/// Point-in-time view of the session, answered by the actor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub state: ConnectionState,
    pub meter_configuration: MeterConfiguration,
    pub measurement: Measurement,
    pub last_error: Option<LastError>,
    pub pending_sample: Option<String>,
    pub queued: usize,
}

impl Snapshot {
    fn of<T: Transport>(s: &Session<T>) -> Self {
        Self {
            state: s.state(),
            meter_configuration: s.meter_configuration().clone(),
            measurement: s.measurement().clone(),
            last_error: s.last_error().cloned(),
            pending_sample: s.pending_sample().map(str::to_string),
            queued: s.queue_len(),
        }
    }
}

enum Control {
    Open,
    Close,
    RequestSample(String),
    Send(String),
    Snapshot(xch::Sender<Snapshot>),
    Shutdown,
}

enum Message {
    Control(Control),
    Transport(TransportEvent),
}

pub struct EngineHandle {
    inbox: xch::Sender<Message>,
    events: xch::Receiver<Event>,
    catalog: Catalog,
    join_handle: Option<JoinHandle<()>>,
}

impl EngineHandle {
    /// Validate `settings`, build the session and start the actor thread.
    /// The session starts `Closed`; call [`EngineHandle::open`].
    pub fn spawn<T, C>(transport: T, settings: SessionSettings, clock: C) -> Result<Self>
    where
        T: Transport + Send + 'static,
        C: Clock + Send + 'static,
    {
        let (ev_tx, ev_rx) = xch::bounded(settings.event_capacity);
        let (inbox_tx, inbox_rx) = xch::unbounded();
        let catalog = Catalog::new(&settings);
        let session = Session::new(transport, settings, ev_tx, clock.now())?;
        let loopback = inbox_tx.clone();
        let join_handle = std::thread::Builder::new()
            .name("sics-engine".into())
            .spawn(move || run(session, &inbox_rx, &loopback, &clock))?;
        Ok(Self {
            inbox: inbox_tx,
            events: ev_rx,
            catalog,
            join_handle: Some(join_handle),
        })
    }

    fn post(&self, c: Control) -> Result<()> {
        self.inbox
            .send(Message::Control(c))
            .map_err(|_| SicsError::EngineStopped)?;
        Ok(())
    }

    pub fn open(&self) -> Result<()> {
        self.post(Control::Open)
    }

    pub fn close(&self) -> Result<()> {
        self.post(Control::Close)
    }

    /// Tag the next weight reading with `id`; an empty id cancels.
    pub fn request_sample(&self, id: &str) -> Result<()> {
        self.post(Control::RequestSample(id.to_string()))
    }

    /// Queue a diagnostic line or a catalog entry by name. Text that cannot
    /// be built into a command is rejected here, before it reaches the actor.
    pub fn send(&self, text: &str) -> Result<()> {
        match self.catalog.by_name(text, Local::now().naive_local()) {
            Some(built) => {
                built.map_err(SicsError::from)?;
            }
            None => {
                self.catalog.raw(text).map_err(SicsError::from)?;
            }
        }
        self.post(Control::Send(text.to_string()))
    }

    /// Event stream; clones share one bounded queue, so each event is seen
    /// once and events arriving while it is full are dropped.
    pub fn events(&self) -> xch::Receiver<Event> {
        self.events.clone()
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        let (tx, rx) = xch::bounded(1);
        self.post(Control::Snapshot(tx))?;
        Ok(rx.recv().map_err(|_| SicsError::EngineStopped)?)
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        let _ = self.inbox.send(Message::Control(Control::Shutdown));
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("engine thread joined"),
                Err(e) => tracing::warn!(?e, "engine thread panicked during shutdown"),
            }
        }
    }
}

fn run<T: Transport, C: Clock>(
    mut session: Session<T>,
    inbox: &xch::Receiver<Message>,
    loopback: &xch::Sender<Message>,
    clock: &C,
) {
    tracing::debug!("engine started");
    loop {
        session.tick(clock.now());
        let wait = session
            .next_deadline()
            .saturating_duration_since(clock.now());
        let msg = match inbox.recv_timeout(wait) {
            Ok(msg) => msg,
            Err(xch::RecvTimeoutError::Timeout) => continue,
            Err(xch::RecvTimeoutError::Disconnected) => break,
        };
        let now = clock.now();
        match msg {
            Message::Transport(ev) => session.on_transport_event(ev, now),
            Message::Control(Control::Open) => {
                let tx = loopback.clone();
                let notify = Box::new(move |ev| {
                    let _ = tx.send(Message::Transport(ev));
                });
                if let Err(e) = session.open(notify) {
                    tracing::warn!(error = %e, "open request failed");
                }
            }
            Message::Control(Control::Close) => session.close(),
            Message::Control(Control::RequestSample(id)) => session.request_sample(&id, now),
            Message::Control(Control::Send(text)) => {
                if let Err(e) = session.send(&text) {
                    tracing::warn!(error = %e, "send request rejected");
                }
            }
            Message::Control(Control::Snapshot(reply)) => {
                let _ = reply.send(Snapshot::of(&session));
            }
            Message::Control(Control::Shutdown) => break,
        }
    }
    session.release();
    tracing::debug!("engine stopped");
}
