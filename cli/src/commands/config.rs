// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::Path;

use garrison_core::domain::config::GatewayConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the resolved configuration
    Show,

    /// Validate the configuration and exit
    Validate,

    /// Print a sample configuration manifest
    Generate,
}

pub fn run(config_path: Option<&Path>, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let manifest = GatewayConfigManifest::discover(config_path)
                .context("Failed to load configuration")?;
            let rendered =
                serde_yaml::to_string(&manifest).context("Failed to render configuration")?;
            println!("{rendered}");
            Ok(())
        }
        ConfigCommand::Validate => {
            let manifest = GatewayConfigManifest::discover(config_path)
                .context("Failed to load configuration")?;
            match manifest.validate() {
                Ok(()) => {
                    println!("{} configuration is valid", "✓".green());
                    Ok(())
                }
                Err(e) => {
                    eprintln!("{} {e}", "✗".red());
                    std::process::exit(1);
                }
            }
        }
        ConfigCommand::Generate => {
            println!("{SAMPLE_CONFIG}");
            Ok(())
        }
    }
}

const SAMPLE_CONFIG: &str = r#"apiVersion: garrison.dev/v1
kind: GatewayConfig
metadata:
  name: garrison-local
spec:
  server:
    host: 127.0.0.1
    port: 8400
    # metrics_port: 9410
    admin_token: env:GARRISON_ADMIN_TOKEN
  database:
    backend: memory
    # backend: postgres
    # url: env:GARRISON_DATABASE_URL
  dispatch:
    action_timeout: 30s
    max_attempts: 3
    retry_base_delay: 500ms
    retry_max_delay: 10s
    stats_window: 1h
  providers:
    - name: hubspot
      kind: crm
      endpoint: https://crm-bridge.internal.example
      api_key: env:HUBSPOT_API_KEY
    - name: zendesk
      kind: helpdesk
      endpoint: https://desk-bridge.internal.example
      api_key: env:ZENDESK_API_KEY
    - name: gcal
      kind: calendar
      endpoint: https://calendar-bridge.internal.example
      api_key: env:GCAL_API_KEY
    - name: postmark
      kind: email
      endpoint: https://mail-bridge.internal.example
      api_key: env:POSTMARK_SERVER_TOKEN
    - name: confluence
      kind: knowledge
      endpoint: https://kb-bridge.internal.example
      api_key: env:CONFLUENCE_API_KEY
"#;
