//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

/// Options shaping one pipeline run; unset options fall back to env, file, defaults
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// Configuration file (default: ./dashpack.toml if present)
    #[arg(long, env = "DASHPACK_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory the source videos are read from
    #[arg(long, value_name = "DIR")]
    pub input_dir: Option<PathBuf>,

    /// Directory presentations are written to, one subdirectory per video
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Videos processed concurrently
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Target segment duration in seconds
    #[arg(long, value_name = "SECONDS")]
    pub segment_duration: Option<f64>,

    /// Fail instead of replacing an existing presentation
    #[arg(long)]
    pub no_overwrite: bool,

    /// Encode the representations of a video concurrently
    #[arg(long)]
    pub parallel_encodes: bool,

    /// Skip probing encoded streams
    #[arg(long)]
    pub no_verify: bool,

    /// Print the batch report as JSON on stdout
    #[arg(long)]
    pub report_json: bool,
}
