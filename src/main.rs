// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod bootstrap;
mod cli;
mod model_agent;

use std::io::Write as _;

use anyhow::Context;
use clap::Parser;
use memoria_protocol::{Inbound, Outbound};
use memoria_store::Store;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::Cli;

/// Exit code for an uncaught failure bubbling out of the run loop (§6, §13).
const EXIT_FAILURE: i32 = 1;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli).await {
        Ok(()) => Ok(()),
        Err(error) => {
            tracing::error!(%error, "uncaught failure");
            std::process::exit(EXIT_FAILURE);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = memoria_config::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(path) = &cli.session_db_path {
        config.session_db_path = path.display().to_string();
    }

    let store = if cli.dry_run { Store::open_in_memory().context("opening in-memory store")? } else { Store::open(&config.session_db_path).with_context(|| format!("opening store at {}", config.session_db_path))? };

    let engine = bootstrap::build(&config, store).context("constructing engine")?;

    let (inbound_tx, inbound_rx) = mpsc::channel::<Inbound>(64);
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Outbound>(64);

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(message) = outbound_rx.recv().await {
            if let Ok(line) = message.to_line() {
                let _ = stdout.write_all(line.as_bytes()).await;
                let _ = stdout.write_all(b"\n").await;
                let _ = stdout.flush().await;
            }
        }
    });

    let reader = tokio::spawn(async move {
        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match Inbound::from_line(&line) {
                        Ok(message) => {
                            if inbound_tx.send(message).await.is_err() {
                                break;
                            }
                        }
                        Err(error) => tracing::warn!(%error, line, "dropping malformed inbound line"),
                    }
                }
                Ok(None) => break,
                Err(error) => {
                    tracing::error!(%error, "reading stdin");
                    break;
                }
            }
        }
        // Dropping `inbound_tx` here ends the coordinator's run loop on EOF.
    });

    engine.coordinator.run(inbound_rx, outbound_tx).await?;
    let _ = reader.await;
    let _ = writer.await;
    Ok(())
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    // Logging always goes to stderr: stdout is the line-delimited JSON
    // protocol stream (§6) and must never carry a stray log line.
    let _ = tracing_subscriber::registry().with(fmt::layer().with_target(false).with_writer(std::io::stderr)).with(filter).try_init();
}
