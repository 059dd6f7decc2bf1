// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod generate;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// ControlNet relay CLI
#[derive(Parser, Debug)]
#[command(name = "relay-cli")]
#[command(version = "0.1.0")]
#[command(about = "Run reference-image generations from the command line", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a reference image and generate from a prompt
    Generate(generate::GenerateArgs),

    /// Check the status of an existing generation job
    Status(generate::StatusArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Generate(args) => generate::generate(args).await,
        Commands::Status(args) => generate::check_status(args).await,
    }
}
