// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `spr insert` - Send one batch of rows

use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use crate::client::RelayClient;

#[derive(Args)]
pub struct InsertArgs {
    /// File holding a JSON array of objects (reads stdin when omitted)
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

pub fn insert(client: &RelayClient, args: InsertArgs) -> Result<()> {
    let body = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .context("failed to read stdin")?;
            body
        }
    };

    let reply = client.insert(&body)?;
    println!("{}", reply.body);
    if !reply.is_success() {
        bail!("insert rejected with HTTP {}", reply.status);
    }
    Ok(())
}
