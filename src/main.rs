// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the account authentication server
use anyhow::Result;
use clap::Parser;
use log::info;
use rust_account_auth::config::{output_config_schema, Config};
use rust_account_auth::server::{build_rocket, figment_from_config, AppState};
use std::path::PathBuf;

/// Session and federated login server
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file, created with defaults if missing
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Server port, overrides the configuration
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Server address, overrides the configuration
    #[arg(short = 'a', long)]
    address: Option<String>,

    /// Base64 session seed, overrides the configuration
    #[arg(long, env = "SESSION_SEED", hide_env_values = true)]
    seed: Option<String>,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    show_config_schema: bool,
}

#[rocket::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.show_config_schema {
        return output_config_schema();
    }

    let mut config = Config::from_file(&args.config)?;
    config.apply_args(args.port, args.address, args.seed);
    config.validate()?;

    info!(
        "Starting {} on {}:{}",
        config.server.name, config.server.address, config.server.port
    );
    let state = AppState::from_config(&config).await?;
    let rocket = build_rocket(
        figment_from_config(&config),
        state,
        config.server.allowed_origins.clone(),
    );
    let _rocket = rocket.ignite().await?.launch().await?;
    Ok(())
}
