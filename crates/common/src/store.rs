//! Append-only raw record store
//!
//! Records live under `raw/{service}/{region}/{operation}.json.gz`, one
//! compressed JSON document per (service, region, operation). Writes are
//! idempotent by key (last-write-wins) and atomic: a record is staged in a
//! temp file and renamed into place, so readers never observe a partial
//! write.

use crate::records::RawRecord;
use crate::{Result, SweepError};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const RECORD_EXT: &str = "json.gz";

/// The raw store rooted at a run directory
#[derive(Debug, Clone)]
pub struct RawStore {
    raw_dir: PathBuf,
}

impl RawStore {
    /// Open (creating if needed) the store under `run_dir/raw`
    pub fn create<P: AsRef<Path>>(run_dir: P) -> Result<Self> {
        let raw_dir = run_dir.as_ref().join("raw");
        fs::create_dir_all(&raw_dir)
            .map_err(|e| SweepError::Store(format!("cannot create {}: {e}", raw_dir.display())))?;
        Ok(Self { raw_dir })
    }

    /// Open an existing store under `run_dir/raw` without creating it
    pub fn open<P: AsRef<Path>>(run_dir: P) -> Result<Self> {
        let raw_dir = run_dir.as_ref().join("raw");
        if !raw_dir.is_dir() {
            return Err(SweepError::Store(format!(
                "raw directory not found: {}",
                raw_dir.display()
            )));
        }
        Ok(Self { raw_dir })
    }

    /// Root of the record layout
    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    fn record_path(&self, service: &str, region: &str, operation: &str) -> PathBuf {
        self.raw_dir
            .join(service)
            .join(region)
            .join(format!("{operation}.{RECORD_EXT}"))
    }

    /// Persist one record, replacing any prior record for the same key.
    ///
    /// The gzip document is fully written to a temp file in the target
    /// directory before being renamed over the final path.
    pub fn put(&self, record: &RawRecord) -> Result<PathBuf> {
        let parent = self
            .raw_dir
            .join(&record.metadata.service)
            .join(&record.metadata.region);
        fs::create_dir_all(&parent)
            .map_err(|e| SweepError::Store(format!("cannot create {}: {e}", parent.display())))?;
        let path = parent.join(format!("{}.{RECORD_EXT}", record.metadata.operation));

        let staged = tempfile::NamedTempFile::new_in(&parent)
            .map_err(|e| SweepError::Store(format!("cannot stage record: {e}")))?;
        {
            let mut encoder = GzEncoder::new(staged.as_file(), Compression::default());
            serde_json::to_writer(&mut encoder, record)?;
            encoder
                .finish()
                .map_err(|e| SweepError::Store(format!("cannot compress record: {e}")))?;
        }
        staged
            .persist(&path)
            .map_err(|e| SweepError::Store(format!("cannot persist {}: {e}", path.display())))?;
        Ok(path)
    }

    /// Read the record for one key, if present
    pub fn get(&self, service: &str, region: &str, operation: &str) -> Result<Option<RawRecord>> {
        let path = self.record_path(service, region, operation);
        if !path.is_file() {
            return Ok(None);
        }
        Self::read_record(&path).map(Some)
    }

    /// Lazily iterate every record in the store, optionally filtered by
    /// service name. Unreadable files surface as errors, not panics.
    pub fn iter(
        &self,
        service_filter: Option<&str>,
    ) -> impl Iterator<Item = Result<RawRecord>> + '_ {
        let root = match service_filter {
            Some(service) => self.raw_dir.join(service),
            None => self.raw_dir.clone(),
        };
        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| name.ends_with(RECORD_EXT))
            })
            .map(|entry| Self::read_record(entry.path()))
    }

    fn read_record(path: &Path) -> Result<RawRecord> {
        let file = fs::File::open(path)
            .map_err(|e| SweepError::Store(format!("cannot open {}: {e}", path.display())))?;
        let mut decoder = GzDecoder::new(file);
        let mut buf = Vec::new();
        decoder
            .read_to_end(&mut buf)
            .map_err(|e| SweepError::Store(format!("cannot decompress {}: {e}", path.display())))?;
        Ok(serde_json::from_slice(&buf)?)
    }
}
