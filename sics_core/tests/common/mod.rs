#![allow(dead_code)]

use crossbeam_channel::{Receiver, unbounded};
use sics_core::mocks::RecordingTransport;
use sics_core::{ConnectionState, Event, EventKind, Session, SessionSettings};
use sics_traits::TransportEvent;
use std::time::{Duration, Instant};

/// Session over a recording transport, driven with explicit instants.
pub struct Rig {
    pub s: Session<RecordingTransport>,
    events: Receiver<Event>,
    link: Option<Receiver<TransportEvent>>,
    pub t0: Instant,
    pub now: Instant,
}

/// Fast heartbeat so tests reach `Online` at t0 + 1s.
pub fn settings() -> SessionSettings {
    SessionSettings {
        alive_poll: Duration::from_millis(1000),
        device_id: "WT0001A".into(),
        ..SessionSettings::default()
    }
}

/// Reply a healthy balance gives to `cmd`.
pub fn canned(cmd: &str) -> String {
    let tok = cmd.split_whitespace().next().unwrap_or("");
    match tok {
        "@" | "I4" => "I4 A \"B123456789\"".into(),
        "I11" => "I11 A \"XPE205\"".into(),
        "I2" => "I2 A \"XPE205 220.00900 g\"".into(),
        "I3" => "I3 A \"2.10\"".into(),
        "M01" => "M01 A 0".into(),
        "M02" => "M02 A 2".into(),
        "M03" => "M03 A 1".into(),
        "M16" => "M16 A 1".into(),
        "TA" => "TA A      0.000 g".into(),
        "SI" => "S S      1.000 g".into(),
        other => format!("{other} A"),
    }
}

impl Rig {
    pub fn new(settings: SessionSettings) -> Self {
        let (tx, events) = unbounded();
        let t0 = Instant::now();
        let s = Session::new(RecordingTransport::new(), settings, tx, t0).expect("session");
        Self {
            s,
            events,
            link: None,
            t0,
            now: t0,
        }
    }

    pub fn open(&mut self) -> sics_core::Result<()> {
        let (tx, rx) = unbounded();
        self.link = Some(rx);
        self.s.open(Box::new(move |ev| {
            let _ = tx.send(ev);
        }))
    }

    /// Feed whatever the transport reported back into the session.
    pub fn pump(&mut self) {
        let Some(link) = self.link.clone() else {
            return;
        };
        while let Ok(ev) = link.try_recv() {
            self.s.on_transport_event(ev, self.now);
        }
    }

    /// Move time to t0 + `ms` and fire due deadlines.
    pub fn at(&mut self, ms: u64) {
        self.now = self.t0 + Duration::from_millis(ms);
        self.s.tick(self.now);
    }

    pub fn line(&mut self, l: &str) {
        self.s.on_line(l, self.now);
    }

    /// Answer the outstanding command like a healthy balance.
    pub fn answer(&mut self) {
        let cmd = self.s.outstanding().line().to_string();
        self.line(&canned(&cmd));
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.try_iter().collect()
    }

    pub fn written(&self) -> Vec<String> {
        self.s.transport().written().to_vec()
    }
}

/// Open, heartbeat at t0 + 1s and answer everything until `Online`.
pub fn online(settings: SessionSettings) -> Rig {
    let mut r = Rig::new(settings);
    r.open().expect("open");
    r.at(1000);
    for _ in 0..20 {
        if r.s.state() == ConnectionState::Online {
            break;
        }
        r.answer();
    }
    assert_eq!(r.s.state(), ConnectionState::Online);
    r
}

pub fn states(evs: &[Event]) -> Vec<ConnectionState> {
    evs.iter()
        .filter_map(|e| match &e.kind {
            EventKind::State(s) => Some(*s),
            _ => None,
        })
        .collect()
}

pub fn errors(evs: &[Event]) -> Vec<String> {
    evs.iter()
        .filter_map(|e| match &e.kind {
            EventKind::Error(m) => Some(m.clone()),
            _ => None,
        })
        .collect()
}

pub fn count(evs: &[Event], name: &str) -> usize {
    evs.iter().filter(|e| e.name() == name).count()
}
