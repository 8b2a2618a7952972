use criterion::{Criterion, black_box, criterion_group, criterion_main};
use crossbeam_channel::unbounded;
use sics_core::mocks::RecordingTransport;
use sics_core::reply::{clean_line, parse_weight};
use sics_core::{Session, SessionSettings};
use std::time::Instant;

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_weight", |b| {
        b.iter(|| parse_weight(black_box("S S      12.345 g")))
    });
    c.bench_function("clean_line", |b| {
        b.iter(|| clean_line(black_box("\x1bS D     -0.002 g\r\n")))
    });
}

fn bench_on_line(c: &mut Criterion) {
    let (tx, rx) = unbounded();
    let now = Instant::now();
    let mut session = Session::new(
        RecordingTransport::new(),
        SessionSettings::default(),
        tx,
        now,
    )
    .expect("session");
    let mut flip = false;
    c.bench_function("session_on_line_tare", |b| {
        b.iter(|| {
            flip = !flip;
            let line = if flip { "TA A 1.000 g" } else { "TA A 1.001 g" };
            session.on_line(black_box(line), now);
            rx.try_iter().for_each(drop);
        })
    });
}

criterion_group!(benches, bench_parse, bench_on_line);
criterion_main!(benches);
