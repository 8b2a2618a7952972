#![no_main]
use libfuzzer_sys::fuzz_target;
use sics_core::mocks::RecordingTransport;
use sics_core::{Session, SessionSettings};
use std::time::{Duration, Instant};

fuzz_target!(|data: &str| {
    let (tx, _rx) = crossbeam_channel::unbounded();
    let t0 = Instant::now();
    let Ok(mut s) = Session::new(RecordingTransport::new(), SessionSettings::default(), tx, t0)
    else {
        return;
    };
    if s.open(Box::new(|_| {})).is_err() {
        return;
    }
    let mut now = t0;
    for line in data.split('\n') {
        now += Duration::from_millis(7);
        s.on_line(line, now);
        s.tick(now);
    }
});
