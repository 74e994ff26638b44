// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # GARRISON Gateway CLI
//!
//! The `garrison` binary runs the multi-tenant integration gateway.
//!
//! ## Commands
//!
//! - `garrison serve` - Run the HTTP gateway (default when no command given)
//! - `garrison config show|validate|generate` - Configuration management

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ConfigCommand, ServeArgs};

/// GARRISON Gateway - multi-tenant provider action dispatch and audit
#[derive(Parser)]
#[command(name = "garrison")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "GARRISON_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "GARRISON_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway
    #[command(name = "serve")]
    Serve {
        #[command(flatten)]
        args: ServeArgs,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap reads env-backed arguments.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone())),
        )
        .init();

    match cli.command {
        Some(Commands::Serve { args }) => commands::serve::run(cli.config.as_deref(), args).await,
        Some(Commands::Config { command }) => {
            commands::config::run(cli.config.as_deref(), command)
        }
        None => commands::serve::run(cli.config.as_deref(), ServeArgs::default()).await,
    }
}
