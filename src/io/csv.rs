use anyhow::{Context, Result, bail};
use csv::{ByteRecord, ReaderBuilder};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::warn;

// One line of the parcel list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParcelEntry {
    pub parcel_id: i64,
    pub dem_name: String,
}

impl ParcelEntry {
    fn from_record(record: &ByteRecord, line: u64) -> Result<Self> {
        if record.len() != 2 {
            bail!(
                "Line {}: expected `<parcel_id>,<dem_name>`, found {} fields",
                line,
                record.len()
            );
        }

        let id_field = String::from_utf8_lossy(&record[0]);
        let parcel_id = id_field
            .parse::<i64>()
            .with_context(|| format!("Line {}: parcel id {:?} is not an integer", line, id_field))?;
        // Lists exported from older GIS tools are not always UTF-8
        let dem_name = match String::from_utf8_lossy(&record[1]) {
            Cow::Borrowed(name) => name.to_string(),
            Cow::Owned(name) => {
                warn!("Line {}: DEM name is not valid UTF-8, read as {:?}", line, name);
                name
            }
        };
        if dem_name.is_empty() {
            bail!("Line {}: parcel {} has no DEM name", line, parcel_id);
        }

        Ok(ParcelEntry {
            parcel_id,
            dem_name,
        })
    }

    pub fn dem_path(&self, dem_dir: &Path) -> PathBuf {
        dem_dir.join(&self.dem_name)
    }
}

pub fn read_parcel_list(path: &Path) -> Result<Vec<ParcelEntry>> {
    let content =
        std::fs::read(path).with_context(|| format!("Failed to read parcel list: {:?}", path))?;
    parse_parcel_list(content)
}

// A blank line ends the list, as does a record with an empty parcel id
pub fn parse_parcel_list(content: impl AsRef<[u8]>) -> Result<Vec<ParcelEntry>> {
    let listed: Vec<&[u8]> = content
        .as_ref()
        .split(|b| *b == b'\n')
        .take_while(|line| !line.iter().all(u8::is_ascii_whitespace))
        .collect();
    let listed = listed.join(&b'\n');

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b',')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(listed.as_slice());

    let mut parcels = Vec::new();
    for (idx, result) in rdr.byte_records().enumerate() {
        let record = result?;
        if record.get(0).is_none_or(<[u8]>::is_empty) {
            break;
        }
        parcels.push(ParcelEntry::from_record(&record, idx as u64 + 1)?);
    }

    Ok(parcels)
}
