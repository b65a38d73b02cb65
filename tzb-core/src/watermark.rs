//! Persistence of the "processed up to" timestamp.
//!
//! The watermark is the `date` of the newest event a cycle has handled. It
//! is stored as the raw timestamp string in a small state file that is
//! replaced atomically, so a crash never leaves a truncated value behind.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::utils::timestamp::{EPOCH_START, now_event_date};

/// Where the first cycle starts when nothing has been processed yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StartMode {
    /// Resume from the stored watermark, or from now if there is none.
    #[default]
    Incremental,
    /// Ignore the stored watermark and request everything available.
    Backfill,
}

/// Errors that can occur while reading or writing the watermark.
#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("failed to read watermark from {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write watermark to {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Loads and persists the watermark.
pub trait WatermarkStore: Send + Sync {
    /// Starting watermark for `mode`.
    fn load(&self, mode: StartMode) -> Result<String, WatermarkError>;

    /// Persist `watermark`. Once this returns `Ok`, a later `load` returns
    /// this value (or a newer one).
    fn save(&self, watermark: &str) -> Result<(), WatermarkError>;
}

/// Watermark kept in a single text file.
#[derive(Debug, Clone)]
pub struct FileWatermarkStore {
    path: PathBuf,
    dry_run: bool,
}

impl FileWatermarkStore {
    pub const DEFAULT_PATH: &'static str = ".trello-to-zulip-date";

    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            dry_run: false,
        }
    }

    /// In dry-run mode `save` never touches the file.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    fn read_stored(&self) -> Result<Option<String>, WatermarkError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let value = content.trim();
                if value.is_empty() {
                    warn!(path = %self.path.display(), "Watermark file is empty, ignoring it");
                    return Ok(None);
                }
                Ok(Some(value.to_owned()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(WatermarkError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn write_atomically(&self, watermark: &str) -> io::Result<()> {
        // Write to a sibling temp file, then rename over the real one.
        let temp_path = self.temp_path();
        let result = write_synced(&temp_path, watermark)
            .and_then(|()| fs::rename(&temp_path, &self.path));
        if result.is_err() {
            // No stale temp file on failure.
            let _ = fs::remove_file(&temp_path);
        }
        result
    }
}

fn write_synced(path: &Path, contents: &str) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}

impl WatermarkStore for FileWatermarkStore {
    fn load(&self, mode: StartMode) -> Result<String, WatermarkError> {
        match mode {
            StartMode::Backfill => Ok(EPOCH_START.to_owned()),
            StartMode::Incremental => match self.read_stored()? {
                Some(stored) => Ok(stored),
                None => {
                    debug!(path = %self.path.display(), "No stored watermark, starting from now");
                    Ok(now_event_date())
                }
            },
        }
    }

    fn save(&self, watermark: &str) -> Result<(), WatermarkError> {
        if self.dry_run {
            debug!(watermark, "Dry run, not persisting watermark");
            return Ok(());
        }
        self.write_atomically(watermark)
            .map_err(|source| WatermarkError::Write {
                path: self.path.clone(),
                source,
            })
    }
}
