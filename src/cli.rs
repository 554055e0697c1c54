use crate::config::{AreaKind, ReferencePlane, VerticalDatum};
use clap::Parser;
use std::path::PathBuf;

/// Build a stage/volume/area lookup table for the Shoreline Management Tool by
/// running a surface-volume engine over a range of water-surface stages for
/// every parcel DEM in a list.
#[derive(Parser, Debug, Default)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// YAML run file; any flag given here overrides its value
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Comma-delimited list of `<parcel_id>,<dem_name>` with no header
    #[arg(short, long)]
    pub parcel_list: Option<PathBuf>,

    /// Directory holding the parcel DEMs
    #[arg(short, long)]
    pub dem_dir: Option<PathBuf>,

    /// Directory the StageLookup<DATUM>.txt file is written to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Vertical datum of the DEMs
    #[arg(long, value_enum, ignore_case = true)]
    pub datum: Option<VerticalDatum>,

    /// Lowest stage, in feet
    #[arg(long)]
    pub start: Option<f64>,

    /// Highest stage, in feet
    #[arg(long)]
    pub end: Option<f64>,

    /// Stage increment, in feet
    #[arg(long)]
    pub increment: Option<f64>,

    /// Decimal places stages are rounded to
    #[arg(long)]
    pub decimals: Option<u32>,

    /// Z factor passed to the engine
    #[arg(long)]
    pub z_factor: Option<f64>,

    /// Compute area and volume above or below the reference plane
    #[arg(long, value_enum, ignore_case = true)]
    pub reference_plane: Option<ReferencePlane>,

    /// Which engine area goes into the lookup table
    #[arg(long, value_enum, ignore_case = true)]
    pub area: Option<AreaKind>,

    /// Surface-volume engine executable
    #[arg(long)]
    pub engine_program: Option<PathBuf>,

    /// Engine argument; repeat for each. Supports {dem}, {plane}, {elevation}, {z_factor}
    #[arg(long = "engine-arg", allow_hyphen_values = true)]
    pub engine_args: Vec<String>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

pub fn get_args() -> Args {
    Args::parse()
}
