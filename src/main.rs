//! DashPack CLI
//!
//! Encodes every source video into a fixed representation ladder and packages
//! the streams as an MPEG-DASH presentation.
//!
//! # Usage
//!
//! ```bash
//! dashpack                      # every video in test_sequences/
//! dashpack bunny.y4m            # test_sequences/bunny.y4m only
//! dashpack --jobs 2 --report-json
//! ```

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use dashpack_cli::adapters::TracingLogAdapter;
use dashpack_cli::cli::{commands, Cli};

/// Main entry point for the DashPack CLI application
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    TracingLogAdapter::init(cli.log_level, cli.json_logs);

    info!("Starting DashPack");
    let code = commands::execute(cli).await?;
    info!("DashPack finished");
    Ok(code)
}
