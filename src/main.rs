use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::sync::Arc;

mod cli;
mod console;
mod event;
mod lifecycle;
mod native;
mod registry;
mod sink;
mod source;

use cli::Cli;
use lifecycle::{CtrlCHandler, LifecycleCoordinator};
use native::journal::{JournalPowerWatcher, JournalPump};
use native::{ManagementWatcher, SystemEvents};
use sink::Sink;

fn setup_logging() -> Result<()> {
    // RUST_LOG env var takes precedence, otherwise warnings and errors only
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder.filter_level(log::LevelFilter::Warn);
    }

    builder
        .target(env_logger::Target::Stderr)
        .try_init()
        .context("Failed to initialize logger")?;
    Ok(())
}

/// Listen until interrupted
fn monitor() -> Result<()> {
    let events = Arc::new(SystemEvents::new(Box::new(JournalPump::new())));
    let watcher: Arc<dyn ManagementWatcher> = Arc::new(JournalPowerWatcher::new());
    let sources = source::standard_sources(events, watcher);

    let mut coordinator = LifecycleCoordinator::new(sources, Arc::new(Sink::stdout()), Box::new(CtrlCHandler::new()));
    coordinator.run().context("Failed to start event listeners")?;
    log::debug!("Coordinator finished in {:?}", coordinator.state());
    Ok(())
}

fn main() -> Result<()> {
    let _cli = Cli::parse();

    setup_logging()?;
    info!("Starting powerwatch {}", env!("GIT_DESCRIBE"));

    if let Err(e) = monitor() {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }

    if let Err(e) = console::discard_pending_input() {
        log::warn!("{:#}", e);
    }
    if let Err(e) = console::press_any_key() {
        log::warn!("{:#}", e);
    }

    Ok(())
}
