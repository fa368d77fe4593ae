#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `trigger`: run the crank/cam decoder against simulated wheels or
//! recorded edge traces.

mod cli;
mod error_fmt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::{Result, WrapErr, eyre};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use trigger_config::{Config, Logging};

use crate::cli::{Cli, Commands, JSON_MODE};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(err) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", error_fmt::format_error_json(&err));
        } else {
            eprintln!("{}", error_fmt::humanize(&err));
        }
        std::process::exit(error_fmt::exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> Result<()> {
    color_eyre::install()?;
    let cfg = load_config(cli.config.as_deref())?;
    // flushes the file log when dropped
    let _file_guard = init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    if cli.config.is_none() {
        tracing::warn!("no --config given, using the built-in 36-1 crank wheel");
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .wrap_err("install Ctrl-C handler")?;
    }

    match cli.cmd {
        Commands::Simulate {
            rpm,
            revs,
            noise_every,
            angles,
        } => {
            let report = run::simulate(&cfg, rpm, revs, noise_every, &angles, &shutdown)?;
            print_report(cli.json, &report);
        }
        Commands::Replay { trace } => {
            let report = run::replay(&cfg, &trace, &shutdown)?;
            print_report(cli.json, &report);
        }
        Commands::EndTeeth { angles } => {
            let rows = run::end_teeth(&cfg, &angles)?;
            if cli.json {
                println!("{}", run::end_teeth_json(&rows));
            } else {
                for row in &rows {
                    println!("{}", row.render());
                }
            }
        }
        Commands::SelfCheck => {
            let report = run::self_check(&cfg)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({ "self_check": "ok", "report": report.to_json() })
                );
            } else {
                println!(
                    "self-check ok: {} rpm decoded at {} rpm, sync {}",
                    report.rpm,
                    run::SELF_CHECK_RPM,
                    report.sync
                );
            }
        }
        #[cfg(all(feature = "hardware", target_os = "linux"))]
        Commands::Watch {
            primary,
            secondary,
            tertiary,
            report_every,
        } => {
            let pins = run::WatchPins {
                primary,
                secondary,
                tertiary,
            };
            let every = std::time::Duration::from_secs(report_every.max(1));
            let report = run::watch(&cfg, pins, every, &shutdown)?;
            print_report(cli.json, &report);
        }
    }
    Ok(())
}

fn print_report(json: bool, report: &run::RunReport) {
    if json {
        println!("{}", report.to_json());
    } else {
        println!("{}", report.render());
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = trigger_config::load_toml(&text).wrap_err("parse config TOML")?;
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

/// Console logs go to stderr so stdout carries only reports.
fn init_tracing(
    json: bool,
    level: Option<&str>,
    logging: &Logging,
) -> Result<Option<WorkerGuard>> {
    let level = level.or(logging.level.as_deref()).unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let mut guard = None;
    let file = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre!("logging.file has no file name: {file}"))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, worker) = tracing_appender::non_blocking(appender);
            guard = Some(worker);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| eyre!("init tracing: {e}"))?;
    Ok(guard)
}
