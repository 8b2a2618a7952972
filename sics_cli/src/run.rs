//! `run` and `self-check` subcommands.

use crate::cli::CliError;
use crossbeam_channel as xch;
use eyre::WrapErr;
use sics_config::Config;
use sics_core::{ConnectionState, EngineHandle, Event, EventKind, SessionSettings};
use sics_hardware::SimulatedBalance;
use sics_traits::{MonotonicClock, Transport};
use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

/// How long to keep printing after `close` while waiting for the Closed event.
const CLOSE_DRAIN: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Default)]
pub struct RunOpts {
    pub sim: bool,
    pub duration: Option<Duration>,
    pub sample: Option<String>,
}

pub type BoxTransport = Box<dyn Transport + Send>;

/// Simulated balance for `--sim`, drifting slowly so results keep changing.
fn simulated() -> BoxTransport {
    let sim = SimulatedBalance::new();
    let ctl = sim.control();
    ctl.set_weight(12.5, true);
    ctl.set_weight_step(0.001);
    Box::new(sim)
}

pub fn make_transport(cfg: &Config, sim: bool) -> eyre::Result<BoxTransport> {
    if sim {
        tracing::info!("using simulated balance");
        return Ok(simulated());
    }
    #[cfg(feature = "hardware")]
    {
        tracing::info!(port = %cfg.serial.port, baud = cfg.serial.baud_rate, "using serial transport");
        Ok(Box::new(sics_hardware::SerialTransport::new(
            cfg.serial.port.clone(),
            cfg.serial.baud_rate,
        )))
    }
    #[cfg(not(feature = "hardware"))]
    {
        let _ = cfg;
        Err(CliError::NoSerialSupport.into())
    }
}

fn spawn_engine(cfg: &Config, sim: bool) -> eyre::Result<EngineHandle> {
    let transport = make_transport(cfg, sim)?;
    let settings = SessionSettings::from(cfg);
    EngineHandle::spawn(transport, settings, MonotonicClock::new())
}

fn write_json<W: Write, S: serde::Serialize + ?Sized>(out: &mut W, value: &S) -> eyre::Result<()> {
    let line = serde_json::to_string(value).wrap_err("serialize event")?;
    writeln!(out, "{line}").wrap_err("write stdout")?;
    out.flush().wrap_err("flush stdout")
}

/// Forward stdin lines to a channel; the channel disconnects on EOF.
fn spawn_stdin_reader() -> eyre::Result<xch::Receiver<String>> {
    let (tx, rx) = xch::unbounded();
    std::thread::Builder::new()
        .name("sics-stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .wrap_err("spawn stdin reader")?;
    Ok(rx)
}

enum Control<'a> {
    Sample(&'a str),
    Send(&'a str),
    Open,
    Close,
    Snapshot,
}

fn parse_control(line: &str) -> Option<Control<'_>> {
    let line = line.trim();
    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
    match verb {
        "sample" => Some(Control::Sample(rest.trim())),
        "send" => Some(Control::Send(rest.trim())),
        "open" => Some(Control::Open),
        "close" => Some(Control::Close),
        "snapshot" => Some(Control::Snapshot),
        "" => None,
        other => {
            tracing::warn!(verb = other, "unknown control command");
            None
        }
    }
}

fn handle_control<W: Write>(engine: &EngineHandle, line: &str, out: &mut W) -> eyre::Result<()> {
    let result = match parse_control(line) {
        Some(Control::Sample(id)) => engine.request_sample(id),
        Some(Control::Send(text)) => engine.send(text),
        Some(Control::Open) => engine.open(),
        Some(Control::Close) => engine.close(),
        Some(Control::Snapshot) => {
            let snap = engine.snapshot()?;
            return write_json(out, &snap);
        }
        None => Ok(()),
    };
    if let Err(e) = result {
        tracing::warn!(error = %e, line, "control command rejected");
    }
    Ok(())
}

/// Stream engine events to stdout until Ctrl-C, `--duration-ms` or the
/// engine stops.
pub fn run(cfg: &Config, opts: &RunOpts) -> eyre::Result<()> {
    let engine = spawn_engine(cfg, opts.sim)?;
    let events = engine.events();

    let (stop_tx, stop_rx) = xch::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .wrap_err("install Ctrl-C handler")?;

    let control_rx = spawn_stdin_reader()?;
    let no_control = xch::never::<String>();
    let mut stdin_open = true;

    engine.open()?;
    if let Some(id) = opts.sample.as_deref() {
        engine.request_sample(id)?;
    }

    let deadline = opts.duration.map(|d| Instant::now() + d);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    loop {
        let wait = deadline.map_or(Duration::from_secs(3600), |d| {
            d.saturating_duration_since(Instant::now())
        });
        let ctl = if stdin_open { &control_rx } else { &no_control };
        xch::select! {
            recv(events) -> ev => match ev {
                Ok(ev) => write_json(&mut out, &ev)?,
                Err(_) => {
                    tracing::warn!("engine stopped");
                    return Ok(());
                }
            },
            recv(stop_rx) -> _ => {
                tracing::info!("interrupted");
                break;
            },
            recv(ctl) -> line => match line {
                Ok(line) => handle_control(&engine, &line, &mut out)?,
                Err(_) => {
                    tracing::debug!("stdin closed");
                    stdin_open = false;
                }
            },
            default(wait) => {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    tracing::info!("run duration elapsed");
                    break;
                }
            },
        }
    }

    engine.close()?;
    drain_until_closed(&events, &mut out)
}

fn drain_until_closed<W: Write>(events: &xch::Receiver<Event>, out: &mut W) -> eyre::Result<()> {
    let until = Instant::now() + CLOSE_DRAIN;
    while let Ok(ev) = events.recv_deadline(until) {
        write_json(out, &ev)?;
        if matches!(ev.kind, EventKind::State(ConnectionState::Closed)) {
            break;
        }
    }
    Ok(())
}

/// Open the link, wait for Online and print the meter configuration.
pub fn self_check(cfg: &Config, sim: bool, timeout_ms: u64) -> eyre::Result<()> {
    let engine = spawn_engine(cfg, sim)?;
    let events = engine.events();
    engine.open()?;

    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    let mut last_error: Option<String> = None;
    loop {
        match events.recv_deadline(deadline) {
            Ok(ev) => match ev.kind {
                EventKind::State(ConnectionState::Online) => break,
                EventKind::State(ConnectionState::Closed) => {
                    return Err(CliError::SelfCheckClosed(
                        last_error.unwrap_or_else(|| "no error reported".into()),
                    )
                    .into());
                }
                EventKind::Error(msg) => {
                    tracing::warn!(%msg, "balance reported an error");
                    last_error = Some(msg);
                }
                _ => {}
            },
            Err(_) => return Err(CliError::SelfCheckTimeout(timeout_ms).into()),
        }
    }

    let snap = engine.snapshot()?;
    let text = serde_json::to_string_pretty(&snap.meter_configuration)
        .wrap_err("serialize meter configuration")?;
    println!("{text}");
    engine.close()?;
    Ok(())
}
