//! Command implementations

use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::info;

use crate::adapters::FsLocalAdapter;
use crate::app::{AppContainer, AssetStatus, BatchReport, DefaultAppContainer};
use crate::cli::Cli;
use crate::config_initialization::initialize_configuration_hierarchy;
use crate::error::DashPackError;
use crate::utils::format_duration;

/// Printed when more than one video is named
pub const USAGE: &str = "Too many arguments.\n\
Usage: dashpack [OPTIONS] [VIDEO]\n\
If VIDEO is omitted, every video in the input directory is processed.";

/// Run the pipeline for the videos named on the command line
pub async fn execute(cli: Cli) -> Result<ExitCode> {
    if cli.videos.len() > 1 {
        println!("{}", USAGE);
        return Ok(ExitCode::SUCCESS);
    }

    let config = initialize_configuration_hierarchy(&cli.options)?;
    let container = DefaultAppContainer::new(&config).context("Invalid configuration")?;
    let discovery = FsLocalAdapter::new(&config.paths.input_dir);

    let assets = match cli.videos.first() {
        Some(name) => match discovery.resolve_named(name) {
            Ok(asset) => vec![asset],
            Err(DashPackError::InputNotFound { path }) => {
                eprintln!("File not found: {}", path.display());
                return Ok(ExitCode::FAILURE);
            }
            Err(e) => return Err(e).context("Failed to resolve input video"),
        },
        None => discovery
            .discover_all()
            .context("Failed to discover input videos")?,
    };

    info!(
        "Encoding {} video(s) from {} into {}",
        assets.len(),
        config.paths.input_dir.display(),
        config.paths.output_dir.display()
    );

    let report = container
        .batch_interactor()
        .run_all(&assets)
        .await
        .context("Batch aborted")?;

    if cli.options.report_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(if report.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_report(report: &BatchReport) {
    for outcome in &report.outcomes {
        match &outcome.status {
            AssetStatus::Success { presentation } => println!(
                "{}: {} -> {} ({} representation(s), {} segment(s))",
                outcome.name,
                outcome.final_state,
                presentation.manifest_path.display(),
                presentation.representations.len(),
                presentation.total_segments()
            ),
            AssetStatus::Failure { causes } => {
                println!("{}: {}", outcome.name, outcome.final_state);
                for cause in causes {
                    println!("  - {}", cause);
                }
            }
        }
    }

    let elapsed = (report.finished_at - report.started_at)
        .to_std()
        .unwrap_or_default();
    println!(
        "{} succeeded, {} failed in {}",
        report.succeeded(),
        report.failed(),
        format_duration(elapsed)
    );
}
