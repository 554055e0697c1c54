use crate::config::{AreaKind, RunConfig};
use crate::engine::{EngineError, SurfaceVolume, SurfaceVolumeEngine, SurfaceVolumeRequest};
use crate::io::csv::ParcelEntry;
use crate::io::results::{StageLookupWriter, StageRecord};
use crate::stage::StageSeries;
use crate::units::{cubic_meters_to_acre_feet, feet_to_meters, sq_meters_to_acres};
use anyhow::Result;
use indicatif::ProgressBar;
use std::io::Write;
use tracing::{debug, error, info};

// A parcel whose stage loop stopped early
#[derive(Debug)]
pub struct ParcelFailure {
    pub parcel_id: i64,
    pub stage_ft: f64,
    pub error: EngineError,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub parcels: usize,
    pub completed: usize,
    pub failed: Vec<ParcelFailure>,
    pub records: usize,
}

enum ParcelOutcome {
    Completed,
    Abandoned(ParcelFailure),
}

/// Drives the surface-volume engine over every stage of every parcel and
/// streams the converted results into the lookup table.
pub struct StageLookup<'a> {
    config: &'a RunConfig,
    progress: ProgressBar,
}

impl<'a> StageLookup<'a> {
    pub fn new(config: &'a RunConfig, progress: ProgressBar) -> Self {
        StageLookup { config, progress }
    }

    pub fn stages(&self) -> StageSeries {
        StageSeries::new(
            self.config.start_elev_ft,
            self.config.end_elev_ft,
            self.config.increment_ft,
            self.config.decimals,
        )
    }

    pub fn run<E, W>(
        &self,
        parcels: &[ParcelEntry],
        engine: &mut E,
        writer: &mut StageLookupWriter<W>,
    ) -> Result<RunSummary>
    where
        E: SurfaceVolumeEngine,
        W: Write,
    {
        let stages_per_parcel = self.stages().count_stages();
        self.progress
            .set_length((stages_per_parcel * parcels.len()) as u64);

        let mut summary = RunSummary {
            parcels: parcels.len(),
            ..RunSummary::default()
        };
        let records_before = writer.records_written();

        for parcel in parcels {
            match self.run_parcel(parcel, engine, writer)? {
                ParcelOutcome::Completed => summary.completed += 1,
                ParcelOutcome::Abandoned(failure) => summary.failed.push(failure),
            }
        }

        summary.records = writer.records_written() - records_before;
        self.progress.finish_and_clear();
        Ok(summary)
    }

    fn run_parcel<E, W>(
        &self,
        parcel: &ParcelEntry,
        engine: &mut E,
        writer: &mut StageLookupWriter<W>,
    ) -> Result<ParcelOutcome>
    where
        E: SurfaceVolumeEngine,
        W: Write,
    {
        let dem = parcel.dem_path(&self.config.dem_dir);
        // Log lines share stderr with the bar; clear it while they print
        self.progress.suspend(|| {
            info!(
                "Parcel Number= {}, Input DEM= {}",
                parcel.parcel_id,
                dem.display()
            )
        });
        self.progress.set_message(format!("parcel {}", parcel.parcel_id));

        let mut stages = self.stages();
        while let Some(stage_ft) = stages.next() {
            let request = SurfaceVolumeRequest {
                dem: &dem,
                plane: self.config.reference_plane,
                elevation_m: feet_to_meters(stage_ft),
                z_factor: self.config.z_factor,
            };

            let result = engine
                .surface_volume(&request)
                .and_then(|message| SurfaceVolume::parse(&message));

            let surface = match result {
                Ok(surface) => surface,
                Err(error) => {
                    self.progress.suspend(|| {
                        error!(
                            parcel = parcel.parcel_id,
                            stage_ft,
                            "{}; skipping remaining stages",
                            error
                        )
                    });
                    // Skipped stages still count toward the bar
                    self.progress.inc(1 + stages.by_ref().count() as u64);
                    return Ok(ParcelOutcome::Abandoned(ParcelFailure {
                        parcel_id: parcel.parcel_id,
                        stage_ft,
                        error,
                    }));
                }
            };

            let record = self.to_record(parcel.parcel_id, stage_ft, &surface);
            self.progress.suspend(|| {
                debug!(
                    "{},  {:.6},  not_used,  {:.6},  not_used,  {:.6}",
                    record.parcel_id, record.stage_ft, record.volume_acft, record.area_ac
                )
            });
            writer.write_record(&record)?;
            self.progress.inc(1);
        }

        Ok(ParcelOutcome::Completed)
    }

    fn to_record(&self, parcel_id: i64, stage_ft: f64, surface: &SurfaceVolume) -> StageRecord {
        let area_m2 = match self.config.area {
            AreaKind::TwoD => surface.area_2d_m2,
            AreaKind::ThreeD => surface.area_3d_m2,
        };
        StageRecord {
            parcel_id,
            stage_ft,
            volume_acft: cubic_meters_to_acre_feet(surface.volume_m3),
            area_ac: sq_meters_to_acres(area_m2),
        }
    }
}
