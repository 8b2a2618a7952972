mod cli;
mod error_fmt;
mod logging;
mod run;

use clap::Parser;
use cli::{Cli, CliError, Commands, JSON_MODE};
use error_fmt::{exit_code_for_error, format_error_json, humanize};
use sics_config::Config;
use std::path::Path;
use std::time::Duration;

fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let mut cfg = match path {
        Some(p) => sics_config::load_file(p)?,
        None => Config::default(),
    };
    cfg.apply_env(|k| std::env::var(k).ok());
    Ok(cfg)
}

fn apply_overrides(cfg: &mut Config, cmd: &Commands) {
    if let Commands::Run { port, baud, .. } = cmd {
        if let Some(p) = port {
            cfg.serial.port.clone_from(p);
        }
        if let Some(b) = baud {
            cfg.serial.baud_rate = *b;
        }
    }
}

fn try_main(cli: Cli) -> eyre::Result<()> {
    let mut cfg = load_config(cli.config.as_deref())
        .map_err(|e| CliError::Config(format!("{e:#}")))?;
    apply_overrides(&mut cfg, &cli.cmd);
    cfg.validate()
        .map_err(|e| CliError::Config(format!("{e:#}")))?;

    logging::init(&cli.log_level, cli.json, &cfg.logging)?;
    tracing::debug!(?cfg, "configuration loaded");

    match cli.cmd {
        Commands::Run {
            sim,
            duration_ms,
            sample,
            ..
        } => run::run(
            &cfg,
            &run::RunOpts {
                sim,
                duration: duration_ms.map(Duration::from_millis),
                sample,
            },
        ),
        Commands::SelfCheck { sim, timeout_ms } => run::self_check(&cfg, sim, timeout_ms),
    }
}

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = try_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}
