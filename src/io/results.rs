use crate::config::AreaKind;
use anyhow::{Context, Result};
use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const NOT_USED: &str = "not_used";

// One row of the stage lookup table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageRecord {
    pub parcel_id: i64,
    pub stage_ft: f64,
    pub volume_acft: f64,
    pub area_ac: f64,
}

impl StageRecord {
    // Fields are separated by "," and padded with two spaces
    fn fields(&self) -> [String; 6] {
        [
            self.parcel_id.to_string(),
            format!("  {:.6}", self.stage_ft),
            format!("  {}", NOT_USED),
            format!("  {:.6}", self.volume_acft),
            format!("  {}", NOT_USED),
            format!("  {:.6}", self.area_ac),
        ]
    }
}

/// Writes `StageLookup<DATUM>.txt`: one descriptive header line, then one
/// CRLF-terminated record per stage, flushed as it is written.
pub struct StageLookupWriter<W: Write> {
    wtr: Writer<W>,
    records: usize,
}

impl StageLookupWriter<File> {
    /// Create (or truncate) the lookup file and write its header.
    pub fn create(path: &Path, parcel_list: &Path, area: AreaKind) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Unable to open output file: {:?}", path))?;
        Self::new(file, parcel_list, area)
    }
}

impl<W: Write> StageLookupWriter<W> {
    pub fn new(inner: W, parcel_list: &Path, area: AreaKind) -> Result<Self> {
        let wtr = WriterBuilder::new()
            .has_headers(false)
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::CRLF)
            .from_writer(inner);

        let mut writer = StageLookupWriter { wtr, records: 0 };
        writer.write_header(parcel_list, area)?;
        Ok(writer)
    }

    fn write_header(&mut self, parcel_list: &Path, area: AreaKind) -> Result<()> {
        self.wtr
            .write_record([
                format!(
                    "Input DEM list=  {};  Columns=   parc_number",
                    parcel_list.display()
                ),
                "  refElev_feet".to_string(),
                format!("  {}", NOT_USED),
                "  Volume_acft".to_string(),
                format!("  {}", NOT_USED),
                format!("  {}", area.column_name()),
            ])
            .context("Failed to write lookup header")?;
        self.wtr.flush().context("Failed to flush lookup header")?;
        Ok(())
    }

    pub fn write_record(&mut self, record: &StageRecord) -> Result<()> {
        self.wtr.write_record(record.fields()).with_context(|| {
            format!(
                "Failed to write record for parcel {} at {} ft",
                record.parcel_id, record.stage_ft
            )
        })?;
        self.wtr.flush().context("Failed to flush lookup record")?;
        self.records += 1;
        Ok(())
    }

    pub fn records_written(&self) -> usize {
        self.records
    }

    pub fn into_inner(self) -> Result<W> {
        self.wtr
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush lookup file: {}", e.error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn written(writer: StageLookupWriter<Vec<u8>>) -> String {
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn header_and_records_match_shoreline_layout() {
        let list = Path::new("LWRV_5meter_DEM_NAVD88_p27_p31.csv");
        let mut writer = StageLookupWriter::new(Vec::new(), list, AreaKind::TwoD).unwrap();
        writer
            .write_record(&StageRecord {
                parcel_id: 27,
                stage_ft: 4140.26,
                volume_acft: 530.591431,
                area_ac: 996.295716,
            })
            .unwrap();
        writer
            .write_record(&StageRecord {
                parcel_id: 27,
                stage_ft: 4140.27,
                volume_acft: 540.46578,
                area_ac: 1002.201601,
            })
            .unwrap();
        assert_eq!(writer.records_written(), 2);

        assert_eq!(
            written(writer),
            "Input DEM list=  LWRV_5meter_DEM_NAVD88_p27_p31.csv;  Columns=   parc_number,  \
             refElev_feet,  not_used,  Volume_acft,  not_used,  2D_Area_ac\r\n\
             27,  4140.260000,  not_used,  530.591431,  not_used,  996.295716\r\n\
             27,  4140.270000,  not_used,  540.465780,  not_used,  1002.201601\r\n"
        );
    }

    #[test]
    fn header_names_three_d_area() {
        let writer = StageLookupWriter::new(Vec::new(), Path::new("list.csv"), AreaKind::ThreeD)
            .unwrap();
        let text = written(writer);
        assert_eq!(text.lines().count(), 1);
        assert!(text.ends_with("3D_Area_ac\r\n"));
    }

    #[test]
    fn create_truncates_existing_file() {
        let dir = TempDir::new("stage-lookup-results").unwrap();
        let path = dir.path().join("StageLookupNAVD88.txt");
        std::fs::write(&path, "stale contents\r\nmore stale\r\nand more\r\n").unwrap();

        let writer = StageLookupWriter::create(&path, Path::new("list.csv"), AreaKind::TwoD)
            .unwrap();
        drop(writer);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Input DEM list=  list.csv;"));
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn create_fails_in_missing_directory() {
        let dir = TempDir::new("stage-lookup-results").unwrap();
        let path = dir.path().join("missing").join("StageLookupNAVD88.txt");
        let err = StageLookupWriter::create(&path, Path::new("list.csv"), AreaKind::TwoD)
            .err()
            .unwrap();
        assert!(err.to_string().contains("Unable to open output file"));
    }
}
