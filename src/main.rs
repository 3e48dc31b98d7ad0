//! OnTop - "Always on top" for every window's system menu
//!
//! Watches focus changes across the desktop, adds an "Always on top" entry to
//! the system menu of the focused window and toggles the window's topmost
//! state when the entry is clicked.

#![cfg_attr(not(windows), allow(dead_code))]

#[cfg(windows)]
mod app;
mod config;
mod error;
mod shutdown;
mod topmost;
mod utils;

use anyhow::Result;
use log::{info, LevelFilter};

use crate::config::Config;

fn main() -> Result<()> {
    // Load configuration before logging so its level applies from the start
    let config = Config::load_or_default()?;

    // Initialize logging; RUST_LOG overrides the configured level
    env_logger::builder()
        .filter_level(config.logging.level_filter().unwrap_or(LevelFilter::Info))
        .format_timestamp_millis()
        .parse_default_env()
        .init();

    info!("Starting OnTop v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {:?}", Config::config_path());

    run(config)
}

#[cfg(windows)]
fn run(config: Config) -> Result<()> {
    let mut app = app::Application::new(config.into_shared())?;
    app.run()?;

    info!("OnTop shutting down gracefully");
    Ok(())
}

#[cfg(not(windows))]
fn run(_config: Config) -> Result<()> {
    log::error!("OnTop hooks native Windows system menus and only runs on Windows");
    Ok(())
}
