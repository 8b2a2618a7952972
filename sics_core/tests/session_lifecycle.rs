mod common;

use common::{Rig, count, errors, online, settings, states};
use sics_core::model::{Field, MeasurementStatus};
use sics_core::{CommandKind, ConnectionState, SicsError};
use sics_traits::TransportEvent;
use std::time::Duration;
use ConnectionState::*;

#[test]
fn heartbeat_reply_leads_through_initialization_to_online() {
    let r = online(settings());
    let evs = r.events();
    assert_eq!(states(&evs), vec![Opening, Offline, Initializing, Online]);

    let written = r.written();
    assert_eq!(written.len(), 15);
    assert_eq!(written[0], "@");
    assert_eq!(
        &written[1..9],
        &["I11", "I2", "I4", "I3", "M01", "M02", "M03", "M16"]
    );
    assert!(written[9].starts_with("TIM "));
    assert!(written[10].starts_with("DAT "));
    assert_eq!(written[11], "I10 \"WT0001A\"");
    assert_eq!(&written[12..], &["M12 3", "TA", "SI"]);

    let cfg = r.s.meter_configuration();
    assert_eq!(cfg.model, Field::Known("XPE205".to_string()));
    assert_eq!(cfg.serial_number, Field::Known("B123456789".to_string()));
    // serial number arrives with the heartbeat, the I4 query repeats it
    assert_eq!(count(&evs, "configuration"), 8);
    assert_eq!(count(&evs, "result"), 2);
    assert_eq!(r.s.measurement().status, MeasurementStatus::Good);
}

#[test]
fn every_transition_leaves_an_empty_queue_and_idle_outstanding() {
    let mut r = online(settings());
    assert_eq!(r.s.queue_len(), 0);
    assert_eq!(r.s.outstanding().kind(), CommandKind::Pause);

    r.at(1150);
    assert_eq!(r.s.outstanding().kind(), CommandKind::Tare);
    r.at(1500);
    assert_eq!(r.s.state(), Offline);
    assert_eq!(r.s.queue_len(), 0);
    assert_eq!(r.s.outstanding().kind(), CommandKind::Pause);
}

#[test]
fn entering_initializing_queues_the_sequence_after_clearing() {
    let mut r = Rig::new(settings());
    r.open().expect("open");
    r.s.send("DW").expect("queued");
    r.at(1000);
    // DW went out first, the heartbeat is still queued
    assert_eq!(r.s.outstanding().line(), "DW");
    r.at(2000);
    r.at(2200);
    assert_eq!(r.s.outstanding().kind(), CommandKind::Poll);
    r.answer();
    assert_eq!(r.s.state(), Initializing);
    assert_eq!(r.s.outstanding().kind(), CommandKind::Model);
    assert_eq!(r.s.queue_len(), 13);
}

#[test]
fn weight_timeout_during_initialization_returns_to_offline() {
    let mut r = Rig::new(settings());
    r.open().expect("open");
    r.at(1000);
    let mut guard = 0;
    while r.s.outstanding().kind() != CommandKind::WeightImmediate {
        r.answer();
        guard += 1;
        assert!(guard < 20, "never reached SI");
    }
    assert_eq!(r.s.state(), Initializing);

    r.at(1300);
    assert_eq!(r.s.state(), Offline);
    assert_eq!(r.s.queue_len(), 0);

    // next heartbeat retries
    r.at(2000);
    assert_eq!(r.written().last().map(String::as_str), Some("@"));
}

#[test]
fn other_timeouts_during_initialization_do_not_transition() {
    let mut r = Rig::new(settings());
    r.open().expect("open");
    r.at(1000);
    r.answer();
    assert_eq!(r.s.outstanding().kind(), CommandKind::Model);
    r.at(1300);
    assert_eq!(r.s.state(), Initializing);
    assert_eq!(r.s.outstanding().kind(), CommandKind::ScaleType);
}

#[test]
fn silence_while_online_goes_offline_and_marks_measurement_stale() {
    let mut r = online(settings());
    r.at(1150);
    assert_eq!(r.s.outstanding().kind(), CommandKind::Tare);
    r.at(1500);
    assert_eq!(r.s.state(), Offline);
    assert_eq!(r.s.measurement().status, MeasurementStatus::Stale);
    // values survive the transition
    assert!((r.s.measurement().weight.value - 1.0).abs() < 1e-9);
}

#[test]
fn raw_command_timeout_never_drives_a_transition() {
    let mut r = online(settings());
    r.s.send("DW").expect("queued");
    r.at(1150);
    assert_eq!(r.s.outstanding().kind(), CommandKind::Raw);
    r.at(2151);
    assert_eq!(r.s.state(), Online);
    assert_eq!(r.s.outstanding().kind(), CommandKind::Tare);
}

#[test]
fn raw_reply_resumes_early() {
    let mut r = online(settings());
    r.s.send("DW").expect("queued");
    r.at(1150);
    r.line("DW A");
    assert_eq!(r.s.outstanding().kind(), CommandKind::Tare);
    assert_eq!(r.s.state(), Online);
}

#[test]
fn beep_pause_inserts_idle_with_overridden_wait() {
    let s = sics_core::SessionSettings {
        beep_pause: Duration::from_millis(120),
        ..settings()
    };
    let mut r = online(s);
    r.s.send("beep").expect("queued");
    r.at(1150);
    assert_eq!(r.s.outstanding().kind(), CommandKind::Beep);
    r.line("M12 A");
    assert_eq!(r.s.outstanding().kind(), CommandKind::Pause);
    assert_eq!(r.s.outstanding().timeout(), Duration::from_millis(120));
    assert_eq!(r.s.watchdog_deadline(), r.now + Duration::from_millis(120));
}

#[test]
fn open_failure_reports_and_returns_to_closed() {
    let mut r = Rig::new(settings());
    r.s.transport_mut().fail_open = true;
    let err = r.open().expect_err("open must fail");
    assert!(matches!(
        err.downcast_ref::<SicsError>(),
        Some(SicsError::OpenFailed(_))
    ));
    let evs = r.events();
    assert_eq!(states(&evs), vec![Opening, Closed]);
    assert!(errors(&evs)[0].starts_with("Port Failed to open"));
}

#[test]
fn open_is_refused_unless_closed() {
    let mut r = Rig::new(settings());
    r.open().expect("open");
    let err = r.open().expect_err("second open");
    assert!(matches!(
        err.downcast_ref::<SicsError>(),
        Some(SicsError::State(_))
    ));
}

#[test]
fn write_failure_closes_the_port() {
    let mut r = Rig::new(settings());
    r.open().expect("open");
    r.s.transport_mut().fail_write = true;
    r.at(1000);
    r.pump();
    let evs = r.events();
    assert_eq!(states(&evs), vec![Opening, Offline, Closing, Closed]);
    assert!(errors(&evs)[0].starts_with("Port Error"));
}

#[test]
fn transport_fault_closes_the_port() {
    let mut r = online(settings());
    r.events();
    let now = r.now;
    r.s.on_transport_event(TransportEvent::Error("device unplugged".into()), now);
    assert_eq!(r.s.state(), Closing);
    r.pump();
    let evs = r.events();
    assert_eq!(errors(&evs), vec!["Port Error: device unplugged".to_string()]);
    assert_eq!(states(&evs), vec![Closing, Closed]);
}

#[test]
fn close_then_reopen() {
    let mut r = online(settings());
    r.s.close();
    assert_eq!(r.s.state(), Closing);
    r.pump();
    assert_eq!(r.s.state(), Closed);
    assert_eq!(r.s.measurement().status, MeasurementStatus::Stale);
    r.events();

    r.open().expect("reopen");
    assert_eq!(states(&r.events()), vec![Opening, Offline]);
}

#[test]
fn close_on_closed_session_is_a_no_op() {
    let mut r = Rig::new(settings());
    r.s.close();
    assert!(r.events().is_empty());
    assert_eq!(r.s.state(), Closed);
}

#[test]
fn commands_queued_while_closed_are_dropped_silently() {
    let mut r = Rig::new(settings());
    r.s.send("DW").expect("queued");
    r.at(100);
    assert!(r.written().is_empty());
    assert_eq!(count(&r.events(), "tx"), 0);
}

#[test]
fn full_event_queue_drops_events_without_stalling() {
    let (tx, rx) = crossbeam_channel::bounded(2);
    let t0 = std::time::Instant::now();
    let mut s = sics_core::Session::new(
        sics_core::mocks::RecordingTransport::new(),
        settings(),
        tx,
        t0,
    )
    .expect("session");
    s.open(Box::new(|_| {})).expect("open");
    for ms in (0..=3000).step_by(50) {
        s.tick(t0 + Duration::from_millis(ms));
    }
    assert_eq!(rx.len(), 2);
    assert_eq!(s.state(), Offline);
    assert!(s.transport().written().iter().any(|l| l == "@"));
}
