// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::PathBuf;

use clap::Parser;

/// Persistent memory engine for a coding assistant (§6, §13): reads
/// line-delimited JSON on stdin, writes line-delimited JSON on stdout, one
/// object per line.
#[derive(Parser, Debug)]
#[command(name = "memoria", about = "Persistent memory engine for a coding assistant", version, long_about = None)]
pub struct Cli {
    /// Path to a YAML config file, applied on top of the search-path layers
    /// (§12). Takes priority over every discovered layer.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Override `session_db_path` from the resolved config.
    #[arg(long)]
    pub session_db_path: Option<PathBuf>,

    /// Open the store in-memory instead of at `session_db_path`, for
    /// smoke-testing the protocol without touching disk (§13).
    #[arg(long)]
    pub dry_run: bool,

    /// Log level used when `RUST_LOG` is unset (e.g. "info", "debug",
    /// "memoria_turn=debug").
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
