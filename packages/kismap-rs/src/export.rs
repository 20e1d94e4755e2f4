use crate::error::{KismapError, Result};
use crate::types::{AccessPointSummary, Observation};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// One row of the access-point CSV. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub mac: String,
    pub ssid: Option<String>,
    pub device_type: Option<String>,
    pub best_signal: i32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub observation_count: u64,
}

impl From<&AccessPointSummary> for SummaryRow {
    fn from(s: &AccessPointSummary) -> Self {
        Self {
            mac: s.mac.clone(),
            ssid: s.ssid.clone(),
            device_type: s.device_type.clone(),
            best_signal: s.best_signal,
            latitude: s.location.map(|p| p.lat),
            longitude: s.location.map(|p| p.lon),
            observation_count: s.observation_count,
        }
    }
}

#[derive(Debug, Serialize)]
struct PacketRow<'a> {
    timestamp: i64,
    latitude: Option<f64>,
    longitude: Option<f64>,
    signal: i32,
    frequency: f64,
    band: &'static str,
    mac: &'a str,
    ssid: Option<&'a str>,
    device_type: Option<&'a str>,
}

/// A file that only appears at its destination once it is complete.
///
/// Content goes to a temporary file next to the destination and is renamed
/// over it by [`AtomicFile::commit`]. Dropping without committing removes the
/// temporary file and leaves any existing destination untouched.
pub struct AtomicFile {
    dest: PathBuf,
    tmp: NamedTempFile,
}

impl AtomicFile {
    pub fn create<P: AsRef<Path>>(dest: P) -> Result<Self> {
        let dest = dest.as_ref().to_path_buf();
        let dir = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let tmp = tempfile::Builder::new()
            .prefix(".kismap-")
            .suffix(".tmp")
            .tempfile_in(&dir)
            .map_err(|e| KismapError::write(dest.display().to_string(), e))?;
        Ok(Self { dest, tmp })
    }

    pub fn path(&self) -> &Path {
        &self.dest
    }

    pub fn as_file_mut(&mut self) -> &mut File {
        self.tmp.as_file_mut()
    }

    pub fn commit(self) -> Result<PathBuf> {
        let dest = self.dest;
        self.tmp
            .as_file()
            .sync_all()
            .map_err(|e| KismapError::write(dest.display().to_string(), e))?;
        self.tmp
            .persist(&dest)
            .map_err(|e| KismapError::write(dest.display().to_string(), e.error))?;
        Ok(dest)
    }

    pub fn write_all(&mut self, contents: &[u8]) -> Result<()> {
        let dest = self.dest.display().to_string();
        self.tmp
            .as_file_mut()
            .write_all(contents)
            .map_err(|e| KismapError::write(dest, e))
    }
}

/// Commit staged files in order.
///
/// Every file must already be fully written, so the only failure left is the
/// rename itself.
pub fn commit_all(files: Vec<AtomicFile>) -> Result<Vec<PathBuf>> {
    files.into_iter().map(AtomicFile::commit).collect()
}

/// Write `contents` to `path` atomically.
pub fn write_atomic<P: AsRef<Path>>(path: P, contents: &[u8]) -> Result<PathBuf> {
    let mut file = AtomicFile::create(path)?;
    file.write_all(contents)?;
    file.commit()
}

/// Write the access-point table as CSV (header included, UTF-8) into a
/// staged file without committing it.
pub fn write_summaries(file: &mut AtomicFile, summaries: &[AccessPointSummary]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(BufWriter::new(file.as_file_mut()));
    for summary in summaries {
        writer.serialize(SummaryRow::from(summary))?;
    }
    if summaries.is_empty() {
        // serialize() emits the header lazily; keep it for empty exports
        writer.write_record(SUMMARY_HEADER)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the access-point table as CSV and commit it.
pub fn export_summaries<P: AsRef<Path>>(path: P, summaries: &[AccessPointSummary]) -> Result<PathBuf> {
    let mut file = AtomicFile::create(path)?;
    write_summaries(&mut file, summaries)?;
    let dest = file.commit()?;
    log::info!("Exported {} access points to {}", summaries.len(), dest.display());
    Ok(dest)
}

/// Fail if two destinations name the same file.
///
/// Paths are compared after resolving their parent directory, so `./a.csv`
/// and `a.csv` collide.
pub fn ensure_distinct<P: AsRef<Path>>(paths: &[P]) -> Result<()> {
    let resolved: Vec<PathBuf> = paths.iter().map(|p| resolve_destination(p.as_ref())).collect();
    for (i, a) in resolved.iter().enumerate() {
        for (j, b) in resolved.iter().enumerate().skip(i + 1) {
            if a == b {
                return Err(KismapError::OutputConflict {
                    first: paths[i].as_ref().display().to_string(),
                    second: paths[j].as_ref().display().to_string(),
                });
            }
        }
    }
    Ok(())
}

fn resolve_destination(path: &Path) -> PathBuf {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    match (std::fs::canonicalize(dir), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}

pub const SUMMARY_HEADER: [&str; 7] = [
    "mac",
    "ssid",
    "device_type",
    "best_signal",
    "latitude",
    "longitude",
    "observation_count",
];

pub const PACKET_HEADER: [&str; 9] = [
    "timestamp",
    "latitude",
    "longitude",
    "signal",
    "frequency",
    "band",
    "mac",
    "ssid",
    "device_type",
];

/// Parse a CSV produced by [`export_summaries`].
pub fn read_summaries<P: AsRef<Path>>(path: P) -> Result<Vec<SummaryRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader
        .deserialize::<SummaryRow>()
        .collect::<std::result::Result<Vec<_>, csv::Error>>()?;
    Ok(rows)
}

/// Streams every filtered packet to CSV while the capture is scanned.
pub struct PacketExporter {
    writer: csv::Writer<BufWriter<File>>,
    file: AtomicFile,
    rows: u64,
}

impl PacketExporter {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = AtomicFile::create(path)?;
        let handle = file
            .tmp
            .reopen()
            .map_err(|e| KismapError::write(file.path().display().to_string(), e))?;
        let writer = csv::Writer::from_writer(BufWriter::new(handle));
        Ok(Self {
            writer,
            file,
            rows: 0,
        })
    }

    pub fn write(&mut self, obs: &Observation) -> Result<()> {
        let row = PacketRow {
            timestamp: obs.timestamp,
            latitude: obs.location.map(|p| p.lat),
            longitude: obs.location.map(|p| p.lon),
            signal: obs.signal,
            frequency: obs.frequency,
            band: obs.band.label(),
            mac: &obs.mac,
            ssid: obs.ssid.as_deref(),
            device_type: obs.device_type.as_deref(),
        };
        self.writer.serialize(row)?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush every row and hand back the staged file, uncommitted.
    pub fn into_staged(mut self) -> Result<AtomicFile> {
        if self.rows == 0 {
            self.writer.write_record(PACKET_HEADER)?;
        }
        self.writer.flush()?;
        drop(self.writer);
        Ok(self.file)
    }

    pub fn finish(self) -> Result<PathBuf> {
        let rows = self.rows;
        let dest = self.into_staged()?.commit()?;
        log::info!("Exported {} packets to {}", rows, dest.display());
        Ok(dest)
    }
}

/// `capture.html` → `capture.csv`
pub fn csv_path_for(output: &Path) -> PathBuf {
    output.with_extension("csv")
}

/// `capture.html` → `capture_packets.csv`
pub fn packets_csv_path_for(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "kismet_heatmap".to_string());
    output.with_file_name(format!("{}_packets.csv", stem))
}
