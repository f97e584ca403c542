//! Configuration initialization and hierarchy management

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::adapters::TomlConfigAdapter;
use crate::cli::args::PipelineArgs;
use crate::config::AppConfig;
use crate::domain::errors::ConfigError;
use crate::utils::path::absolutize;

/// Environment variables and the setting each one overrides
pub const ENV_INPUT_DIR: &str = "DASHPACK_INPUT_DIR";
pub const ENV_OUTPUT_DIR: &str = "DASHPACK_OUTPUT_DIR";
pub const ENV_FFMPEG: &str = "DASHPACK_FFMPEG";
pub const ENV_FFPROBE: &str = "DASHPACK_FFPROBE";
pub const ENV_CODEC: &str = "DASHPACK_CODEC";
pub const ENV_JOBS: &str = "DASHPACK_JOBS";
pub const ENV_SEGMENT_DURATION: &str = "DASHPACK_SEGMENT_DURATION";

/// Initialize configuration hierarchy following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(args: &PipelineArgs) -> Result<AppConfig> {
    info!("Initializing configuration hierarchy");
    let config = resolve_configuration(args, |key| std::env::var(key).ok())
        .context("Failed to initialize configuration")?;
    info!("Configuration hierarchy initialized successfully");
    Ok(config)
}

/// Same as [`initialize_configuration_hierarchy`] with an injectable environment
pub fn resolve_configuration<F>(args: &PipelineArgs, env: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let (mut config, source) = TomlConfigAdapter::load_or_default(args.config.as_deref())?;
    match source {
        Some(path) => debug!("Configuration file: {}", path.display()),
        None => debug!("No configuration file, using defaults"),
    }

    let env_overrides = apply_environment(&mut config, env)?;
    if env_overrides > 0 {
        info!("Applied {} environment variable overrides", env_overrides);
    }

    let cli_overrides = apply_cli_overrides(&mut config, args);
    if cli_overrides > 0 {
        info!("Applied {} CLI overrides", cli_overrides);
    }

    config.validate()?;
    resolve_paths(&mut config)?;
    Ok(config)
}

/// Pin the input and output directories to absolute paths
///
/// Runs before any job starts; a packaging engine that needs the process working
/// directory may switch it while other jobs are still resolving files.
fn resolve_paths(config: &mut AppConfig) -> Result<(), ConfigError> {
    for dir in [&mut config.paths.input_dir, &mut config.paths.output_dir] {
        let resolved = absolutize(dir).map_err(|e| {
            ConfigError::new(format!("Cannot resolve {}: {}", dir.display(), e))
        })?;
        *dir = resolved;
    }
    Ok(())
}

/// Apply `DASHPACK_*` variables; returns how many were set
fn apply_environment<F>(config: &mut AppConfig, env: F) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut applied = 0;
    let mut found = |key: &str| {
        let value = env(key).filter(|v| !v.trim().is_empty());
        if let Some(value) = &value {
            debug!("Found environment override: {} = {}", key, value);
            applied += 1;
        }
        value
    };

    if let Some(value) = found(ENV_INPUT_DIR) {
        config.paths.input_dir = PathBuf::from(value);
    }
    if let Some(value) = found(ENV_OUTPUT_DIR) {
        config.paths.output_dir = PathBuf::from(value);
    }
    if let Some(value) = found(ENV_FFMPEG) {
        config.encoding.ffmpeg = value;
    }
    if let Some(value) = found(ENV_FFPROBE) {
        config.encoding.ffprobe = value;
    }
    if let Some(value) = found(ENV_CODEC) {
        config.encoding.codec = value;
    }
    if let Some(value) = found(ENV_JOBS) {
        config.batch.jobs = parse_env(ENV_JOBS, &value)?;
    }
    if let Some(value) = found(ENV_SEGMENT_DURATION) {
        config.packaging.segment_duration = parse_env(ENV_SEGMENT_DURATION, &value)?;
    }

    Ok(applied)
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::new(format!("Invalid value for {}: {}", key, value)))
}

/// Apply command-line flags; returns how many were set
fn apply_cli_overrides(config: &mut AppConfig, args: &PipelineArgs) -> usize {
    let mut applied = 0;

    if let Some(dir) = &args.input_dir {
        config.paths.input_dir = dir.clone();
        applied += 1;
    }
    if let Some(dir) = &args.output_dir {
        config.paths.output_dir = dir.clone();
        applied += 1;
    }
    if let Some(jobs) = args.jobs {
        config.batch.jobs = jobs;
        applied += 1;
    }
    if let Some(duration) = args.segment_duration {
        config.packaging.segment_duration = duration;
        applied += 1;
    }
    if args.no_overwrite {
        config.packaging.overwrite = false;
        applied += 1;
    }
    if args.parallel_encodes {
        config.batch.parallel_encodes = true;
        applied += 1;
    }
    if args.no_verify {
        config.encoding.verify_output = false;
        applied += 1;
    }

    applied
}
