use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

extern crate pretty_env_logger;
#[macro_use] extern crate log;

use crate::commands::Command;
use crate::config::EnvConfig;
use crate::console::Console;
use crate::options::ConsoleOptions;

mod backend;
mod commands;
mod config;
mod console;
mod core;
mod options;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    info!("🚀 Starting CCTV monitoring console.");

    let config = EnvConfig::load().context("Error reading env variables.")?;

    let options = match &config.options {
        Some(path) => ConsoleOptions::load(path).context("Error load options file.")?,
        None => ConsoleOptions::default(),
    };

    let config = config
        .with_options(&options)
        .validate()
        .context("Error checking configuration.")?;

    let criteria = options.initial_criteria().context("Error building initial filter.")?;

    let console = Console::start(&config, criteria, Arc::new(core::LogNotifier))
        .context("Error starting console.")?;

    core::spawn_dashboard_logger(console.dashboard(), console.cancel_token());

    info!("✅ Console running. Press Ctrl+C to stop. {}", commands::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    // Wait Ctrl+C or SIGTERM Docker/OS
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            res = &mut shutdown => {
                res.context("Failed to listen for ctrl+c")?;
                info!("Received shutdown signal");
                break;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match line.parse::<Command>().and_then(|cmd| console.run_command(cmd)) {
                    Ok(reply) => info!("> {}", reply),
                    Err(e) => warn!("> {:#}", e),
                },
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!("Operator input unavailable: {}", e);
                    stdin_open = false;
                }
            },
        }
    }

    info!("Graceful Shutdown...");

    console.shutdown().await;

    info!("Console session closed.");
    Ok(())
}
