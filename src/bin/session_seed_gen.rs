// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rust_account_auth::config::Config;
use rust_account_auth::token::{generate_seed, SessionKeyPair};

/// Generate a session signing seed for the account server
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Write the base64 seed to this file instead of stdout
    #[clap(long)]
    out_seed: Option<PathBuf>,

    /// Write the derived Ed25519 public key PEM to this file
    #[clap(long)]
    out_pub_key: Option<PathBuf>,

    /// Store the seed in this configuration file (session.seed)
    #[clap(long)]
    config: Option<PathBuf>,
}

fn write_file(path: &PathBuf, contents: &str, what: &str) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create {} file at {:?}", what, path))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("Failed to write {} to {:?}", what, path))?;
    println!("{} written to: {:?}", what, path);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let seed = generate_seed();
    let keys = SessionKeyPair::from_base64_seed(&seed).context("Failed to derive key pair")?;

    match &args.out_seed {
        Some(path) => write_file(path, &seed, "Seed")?,
        None if args.config.is_none() => println!("{}", seed),
        None => {}
    }

    match &args.out_pub_key {
        Some(path) => write_file(path, keys.public_key_pem(), "Public key")?,
        None => print!("{}", keys.public_key_pem()),
    }

    if let Some(path) = &args.config {
        let mut config = Config::from_file(path)?;
        config.session.seed = seed.clone();
        config.save_to_file(path)?;
        println!("Session seed stored in {:?}", path);
        println!("Every session issued with the previous seed is now invalid.");
    }

    Ok(())
}
