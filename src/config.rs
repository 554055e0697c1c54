use crate::cli::Args;
use crate::stage::step_advances;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

// Vertical datum of the parcel DEMs; names the output file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
pub enum VerticalDatum {
    #[default]
    #[serde(rename = "NAVD88", alias = "navd88")]
    #[value(name = "NAVD88")]
    Navd88,
    #[serde(rename = "NGVD29", alias = "ngvd29")]
    #[value(name = "NGVD29")]
    Ngvd29,
}

impl fmt::Display for VerticalDatum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerticalDatum::Navd88 => write!(f, "NAVD88"),
            VerticalDatum::Ngvd29 => write!(f, "NGVD29"),
        }
    }
}

// Side of the reference plane the engine integrates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
pub enum ReferencePlane {
    #[serde(rename = "ABOVE", alias = "above")]
    #[value(name = "ABOVE")]
    Above,
    #[default]
    #[serde(rename = "BELOW", alias = "below")]
    #[value(name = "BELOW")]
    Below,
}

impl fmt::Display for ReferencePlane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferencePlane::Above => write!(f, "ABOVE"),
            ReferencePlane::Below => write!(f, "BELOW"),
        }
    }
}

// Planimetric (2D) or surface (3D) area in the area column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
pub enum AreaKind {
    #[default]
    #[serde(rename = "2d", alias = "2D")]
    #[value(name = "2d")]
    TwoD,
    #[serde(rename = "3d", alias = "3D")]
    #[value(name = "3d")]
    ThreeD,
}

impl AreaKind {
    pub fn column_name(&self) -> &'static str {
        match self {
            AreaKind::TwoD => "2D_Area_ac",
            AreaKind::ThreeD => "3D_Area_ac",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineFile {
    pub program: Option<PathBuf>,
    #[serde(default)]
    pub args: Vec<String>,
}

// YAML run file; every field optional so the command line can fill gaps
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunFile {
    pub parcel_list: Option<PathBuf>,
    pub dem_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub datum: Option<VerticalDatum>,
    pub start_elev_ft: Option<f64>,
    pub end_elev_ft: Option<f64>,
    pub increment_ft: Option<f64>,
    pub decimals: Option<u32>,
    pub z_factor: Option<f64>,
    pub reference_plane: Option<ReferencePlane>,
    pub area: Option<AreaKind>,
    #[serde(default)]
    pub engine: EngineFile,
}

impl RunFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read run file: {:?}", path))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse run file: {:?}", path))
    }
}

// Fully resolved parameters for one lookup-table run
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub parcel_list: PathBuf,
    pub dem_dir: PathBuf,
    pub output_dir: PathBuf,
    pub datum: VerticalDatum,
    pub start_elev_ft: f64,
    pub end_elev_ft: f64,
    pub increment_ft: f64,
    pub decimals: u32,
    pub z_factor: f64,
    pub reference_plane: ReferencePlane,
    pub area: AreaKind,
    pub engine_program: PathBuf,
    pub engine_args: Vec<String>,
}

impl RunConfig {
    pub const DEFAULT_INCREMENT_FT: f64 = 0.01;
    pub const DEFAULT_DECIMALS: u32 = 2;
    pub const DEFAULT_Z_FACTOR: f64 = 1.0;

    /// Resolve the run from the command line, reading the run file it names.
    pub fn load(args: &Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => RunFile::load(path)?,
            None => RunFile::default(),
        };
        Self::resolve(file, args)
    }

    pub fn resolve(file: RunFile, args: &Args) -> Result<Self> {
        let engine_args = if args.engine_args.is_empty() {
            file.engine.args
        } else {
            args.engine_args.clone()
        };

        let config = RunConfig {
            parcel_list: required(args.parcel_list.clone().or(file.parcel_list), "parcel_list")?,
            dem_dir: required(args.dem_dir.clone().or(file.dem_dir), "dem_dir")?,
            output_dir: args
                .output_dir
                .clone()
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            datum: args.datum.or(file.datum).unwrap_or_default(),
            start_elev_ft: required(args.start.or(file.start_elev_ft), "start_elev_ft")?,
            end_elev_ft: required(args.end.or(file.end_elev_ft), "end_elev_ft")?,
            increment_ft: args
                .increment
                .or(file.increment_ft)
                .unwrap_or(Self::DEFAULT_INCREMENT_FT),
            decimals: args
                .decimals
                .or(file.decimals)
                .unwrap_or(Self::DEFAULT_DECIMALS),
            z_factor: args
                .z_factor
                .or(file.z_factor)
                .unwrap_or(Self::DEFAULT_Z_FACTOR),
            reference_plane: args.reference_plane.or(file.reference_plane).unwrap_or_default(),
            area: args.area.or(file.area).unwrap_or_default(),
            engine_program: required(
                args.engine_program.clone().or(file.engine.program),
                "engine.program",
            )?,
            engine_args,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.start_elev_ft.is_finite() || !self.end_elev_ft.is_finite() {
            bail!("Start and end elevations must be finite numbers");
        }
        if self.start_elev_ft > self.end_elev_ft {
            bail!(
                "Start elevation {} ft is above end elevation {} ft",
                self.start_elev_ft,
                self.end_elev_ft
            );
        }
        if self.decimals > 10 {
            bail!("Cannot round stages to {} decimals (max 10)", self.decimals);
        }
        if !self.increment_ft.is_finite() {
            bail!("Increment must be a finite number, got {}", self.increment_ft);
        }
        if crate::units::round_to(self.increment_ft, self.decimals) <= 0.0 {
            bail!(
                "Increment {} ft rounds to zero at {} decimals",
                self.increment_ft,
                self.decimals
            );
        }
        // Float spacing grows with magnitude, so check both ends of the range
        for elevation in [self.start_elev_ft, self.end_elev_ft] {
            if !step_advances(elevation, self.increment_ft, self.decimals) {
                bail!(
                    "Increment {} ft at {} decimals does not advance past {} ft",
                    self.increment_ft,
                    self.decimals,
                    elevation
                );
            }
        }
        if !(self.z_factor > 0.0) {
            bail!("Z factor must be positive, got {}", self.z_factor);
        }
        Ok(())
    }

    pub fn output_file_name(&self) -> String {
        format!("StageLookup{}.txt", self.datum)
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(self.output_file_name())
    }
}

fn required<T>(value: Option<T>, name: &str) -> Result<T> {
    value.with_context(|| format!("Missing required setting `{}`", name))
}
