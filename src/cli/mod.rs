//! CLI module for DashPack
//!
//! This module handles command-line argument parsing and command execution.

use clap::Parser;

use crate::adapters::LogLevel;

pub mod args;
pub mod commands;

pub use args::PipelineArgs;

/// DashPack - encode a representation ladder and package it as MPEG-DASH
///
/// With no VIDEO every file in the input directory is processed; with one VIDEO
/// only `<input-dir>/<VIDEO>` is.
#[derive(Parser, Debug)]
#[command(name = "dashpack")]
#[command(about = "Encode a representation ladder and package it as MPEG-DASH")]
#[command(version)]
pub struct Cli {
    /// Video file name inside the input directory
    #[arg(value_name = "VIDEO")]
    pub videos: Vec<String>,

    #[command(flatten)]
    pub options: PipelineArgs,

    /// Logging level (RUST_LOG takes precedence)
    #[arg(long, default_value = "info", value_parser = LogLevel::parse)]
    pub log_level: LogLevel,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}
