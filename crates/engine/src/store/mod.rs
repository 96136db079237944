use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

mod atomic_io;
mod rows;
mod worksheet;

pub use rows::{now_timestamp, ClickCell, FeedbackRecord, RoundRecord, SliderChoiceRecord};
pub use worksheet::Worksheet;

pub const COLLECTION_DETECTIVE: &str = "detective";
pub const COLLECTION_DESIGNER: &str = "designer";

const FEEDBACK_WORKSHEET: &str = "feedback";
const CHOICES_WORKSHEET: &str = "choices";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("worksheet not found: {path}")]
    WorksheetNotFound { path: PathBuf },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode {path}: {message}")]
    Encode { path: PathBuf, message: String },
    #[error("failed to parse {path}{at}: {message}")]
    Parse {
        path: PathBuf,
        at: String,
        message: String,
    },
    #[error("invalid worksheet {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

/// File-backed stand-in for the spreadsheet boundary: one JSON worksheet
/// per results table, written atomically, appended one record at a time.
/// No retries; failures surface to the caller, which keeps the round's
/// in-memory state.
pub struct ResultsStore {
    results_dir: PathBuf,
}

impl ResultsStore {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
        }
    }

    pub fn append_round(&self, record: &RoundRecord) -> Result<PathBuf, StoreError> {
        let path = self.worksheet_path(COLLECTION_DETECTIVE, &record.scene);
        let mut sheet = self.read_or_empty(&path)?;
        let headers = record.merged_headers(&sheet);
        let row = record.row_for_headers(&headers);
        sheet.append_aligned(&headers, &row);
        self.write(&path, &sheet)?;
        info!(
            scene = record.scene.as_str(),
            player = record.player.as_str(),
            found = record.found_seconds.len(),
            clicks = record.click_log.len(),
            "round_recorded"
        );
        Ok(path)
    }

    pub fn append_slider_choice(&self, record: &SliderChoiceRecord) -> Result<PathBuf, StoreError> {
        let path = self.worksheet_path(COLLECTION_DESIGNER, CHOICES_WORKSHEET);
        let mut sheet = self.read_or_empty(&path)?;
        sheet.append_aligned(&SliderChoiceRecord::headers(), &record.row());
        self.write(&path, &sheet)?;
        Ok(path)
    }

    pub fn append_feedback(
        &self,
        collection: &str,
        record: &FeedbackRecord,
    ) -> Result<PathBuf, StoreError> {
        let path = self.worksheet_path(collection, FEEDBACK_WORKSHEET);
        let mut sheet = self.read_or_empty(&path)?;
        sheet.append_aligned(&FeedbackRecord::headers(), &record.row());
        self.write(&path, &sheet)?;
        Ok(path)
    }

    pub fn read_worksheet(&self, collection: &str, name: &str) -> Result<Worksheet, StoreError> {
        let path = self.worksheet_path(collection, name);
        if !path.is_file() {
            return Err(StoreError::WorksheetNotFound { path });
        }
        read_worksheet_file(&path)
    }

    /// Worksheet names stored under a collection, sorted. A collection with
    /// no writes yet simply has no directory.
    pub fn worksheet_names(&self, collection: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.results_dir.join(collection);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
            {
                if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn worksheet_path(&self, collection: &str, name: &str) -> PathBuf {
        self.results_dir.join(collection).join(format!("{name}.json"))
    }

    fn read_or_empty(&self, path: &Path) -> Result<Worksheet, StoreError> {
        if !path.is_file() {
            return Ok(Worksheet::default());
        }
        read_worksheet_file(path)
    }

    fn write(&self, path: &Path, sheet: &Worksheet) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(sheet).map_err(|error| StoreError::Encode {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;
        atomic_io::write_text_atomic(path, &text).map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn read_worksheet_file(path: &Path) -> Result<Worksheet, StoreError> {
    let raw = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    let sheet: Worksheet = match serde_path_to_error::deserialize(&mut deserializer) {
        Ok(sheet) => sheet,
        Err(error) => {
            let at = error.path().to_string();
            let at = if at.is_empty() || at == "." {
                String::new()
            } else {
                format!(" at {at}")
            };
            return Err(StoreError::Parse {
                path: path.to_path_buf(),
                at,
                message: error.into_inner().to_string(),
            });
        }
    };
    sheet.validate(path)?;
    Ok(sheet)
}
