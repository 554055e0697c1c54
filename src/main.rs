use anyhow::{Context, Result};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

mod cli;
mod config;
mod engine;
mod io;
mod lookup;
mod stage;
mod units;

use cli::get_args;
use config::RunConfig;
use engine::CommandEngine;
use io::csv::read_parcel_list;
use io::results::StageLookupWriter;
use lookup::StageLookup;

fn main() -> Result<()> {
    let args = get_args();
    setup_logging(args.verbose);

    let started = Instant::now();
    info!("Starting {}", Local::now().format("%I:%M:%S"));

    // Configuration
    let config = RunConfig::load(&args)?;
    log_parameters(&config);

    let parcels = read_parcel_list(&config.parcel_list)?;
    info!("Read {} parcels from {:?}", parcels.len(), config.parcel_list);

    // The lookup file is truncated here; every record after is appended
    let output_path = config.output_path();
    let mut writer = StageLookupWriter::create(&output_path, &config.parcel_list, config.area)?;
    info!("Output file location: {}", output_path.display());

    let mut engine = CommandEngine::new(&config.engine_program, config.engine_args.clone());

    let pb = if args.no_progress {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} stages {msg} ({eta})")?
                .progress_chars("#>-"),
        );
        pb
    };

    let summary = StageLookup::new(&config, pb).run(&parcels, &mut engine, &mut writer)?;

    writer
        .into_inner()
        .with_context(|| format!("Failed to close output file: {:?}", output_path))?;

    for failure in &summary.failed {
        warn!(
            "Parcel {} stopped at {} ft: {}",
            failure.parcel_id, failure.stage_ft, failure.error
        );
    }

    info!("DONE: {}", Local::now().format("%I:%M:%S"));
    info!(
        "{} of {} parcels complete, {} records written",
        summary.completed, summary.parcels, summary.records
    );
    info!("Output file location = {}", output_path.display());
    info!(
        "Elapsed time in minutes: {:.1}",
        started.elapsed().as_secs_f64() / 60.0
    );
    Ok(())
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn log_parameters(config: &RunConfig) {
    info!("USER-SPECIFIED INPUT PARAMETERS:");
    info!("   Input list of DEMs              = {}", config.parcel_list.display());
    info!("   Path to input DEMs              = {}", config.dem_dir.display());
    info!("   Vertical datum                  = {}", config.datum);
    info!("   Output folder                   = {}", config.output_dir.display());
    info!("   Starting elevation, in ft       = {:.6}", config.start_elev_ft);
    info!("   Ending elevation, in ft         = {:.6}", config.end_elev_ft);
    info!("   Increment, in ft                = {:.6}", config.increment_ft);
    info!("   Num. decimals to round elev, ft = {}", config.decimals);
    info!("   Z-Factor                        = {:.6}", config.z_factor);
    info!("   Reference plane                 = {}", config.reference_plane);
    info!("   Area column                     = {}", config.area.column_name());
    info!(
        "   Surface-volume engine           = {} {}",
        config.engine_program.display(),
        config.engine_args.join(" ")
    );
}
