// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! spr - Snowpipe relay client

mod client;
mod commands;
#[cfg(test)]
mod test_support;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use commands::{generate, insert, load};

use crate::client::{RelayClient, DEFAULT_URL};

#[derive(Parser)]
#[command(
    name = "spr",
    version,
    about = "spr talks to a running sprd relay daemon"
)]
struct Cli {
    /// Base URL of the daemon
    #[arg(long, global = true, default_value = DEFAULT_URL)]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the daemon is up
    Hello,
    /// Show daemon counters and WAL position
    Status,
    /// Send one JSON array of rows
    Insert(insert::InsertArgs),
    /// Send every line of a fixture file as its own batch
    Load(load::LoadArgs),
    /// Generate a load fixture from a NAME:TYPE schema
    Gen(generate::GenArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = RelayClient::new(&cli.url);

    match cli.command {
        Commands::Hello => {
            let reply = client.hello()?;
            println!("{}", reply.body);
            if !reply.is_success() {
                bail!("hello failed with HTTP {}", reply.status);
            }
        }
        Commands::Status => {
            let reply = client.status()?;
            println!("{}", reply.body);
            if !reply.is_success() {
                bail!("status failed with HTTP {}", reply.status);
            }
        }
        Commands::Insert(args) => insert::insert(&client, args)?,
        Commands::Load(args) => load::load(&client, args)?,
        Commands::Gen(args) => generate::generate(args)?,
    }

    Ok(())
}
