//! # Persistence Store
//!
//! History records and per-mode drafts on top of a [`StorageBackend`].
//!
//! Nothing here returns an error to the caller. A failed read or a corrupt
//! value is logged and treated as "nothing stored"; a failed write is logged
//! and the in-memory result is still returned.
//!
//! Layout:
//! - `terraforge_history_v1`: JSON array of [`HistoryRecord`], newest first,
//!   at most [`MAX_HISTORY`] entries
//! - `terraforge_draft_{MODE}`: one JSON [`DraftRecord`] per [`DraftMode`]

use crate::error::{self, Result};
use crate::mode::{DraftMode, OperationMode};
use crate::storage::{FileStorage, MemoryStorage, StorageBackend};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, error, warn};

pub const HISTORY_KEY: &str = "terraforge_history_v1";

/// Oldest records beyond this are dropped on append.
pub const MAX_HISTORY: usize = 50;

/// One completed operation, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub mode: OperationMode,
    pub input: String,
    /// Present exactly when `mode` is Edit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    pub output: String,
    /// Epoch milliseconds
    pub timestamp: u64,
    pub model: String,
}

/// A history record before the store assigns `id` and `timestamp`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryRecord {
    pub mode: OperationMode,
    pub input: String,
    pub instruction: Option<String>,
    pub output: String,
    pub model: String,
}

impl NewHistoryRecord {
    pub fn new(
        mode: OperationMode,
        input: impl Into<String>,
        instruction: Option<String>,
        output: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            mode,
            input: input.into(),
            instruction,
            output: output.into(),
            model: model.into(),
        }
    }
}

/// Persisted draft for one mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRecord {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub timestamp: u64,
}

/// What callers get back from [`PersistenceStore::load_draft`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub content: String,
    pub instruction: String,
}

/// Current time in epoch milliseconds
pub fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

pub struct PersistenceStore {
    backend: Box<dyn StorageBackend>,
}

impl PersistenceStore {
    /// Store backed by memory only
    pub fn memory() -> Self {
        Self::with_backend(MemoryStorage::new())
    }

    /// Store backed by `<dir>/<key>.json` files
    pub fn file(dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::with_backend(FileStorage::new(dir)?))
    }

    pub fn with_backend(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Stored records, newest first. Empty when absent or unreadable.
    pub fn list_history(&self) -> Vec<HistoryRecord> {
        self.read_history().unwrap_or_else(|err| {
            error!(key = HISTORY_KEY, error = %err, "failed to load history");
            Vec::new()
        })
    }

    pub fn find_history(&self, id: &str) -> Option<HistoryRecord> {
        self.list_history().into_iter().find(|r| r.id == id)
    }

    /// Stamp, prepend and persist a record, keeping at most [`MAX_HISTORY`].
    pub fn append_history(&mut self, new: NewHistoryRecord) -> HistoryRecord {
        let mut history = self.list_history();

        let mut id = uuid::Uuid::new_v4().to_string();
        while history.iter().any(|r| r.id == id) {
            id = uuid::Uuid::new_v4().to_string();
        }

        let instruction = if new.mode.takes_instruction() {
            Some(new.instruction.unwrap_or_default())
        } else {
            None
        };

        let record = HistoryRecord {
            id,
            mode: new.mode,
            input: new.input,
            instruction,
            output: new.output,
            timestamp: current_timestamp_ms(),
            model: new.model,
        };

        history.insert(0, record.clone());
        history.truncate(MAX_HISTORY);

        if let Err(err) = self.write_history(&history) {
            error!(key = HISTORY_KEY, error = %err, "failed to save history");
        } else {
            debug!(id = %record.id, mode = %record.mode, entries = history.len(), "history appended");
        }
        record
    }

    /// Remove one record and return what is stored afterwards.
    ///
    /// An unknown id leaves the store untouched.
    pub fn delete_history(&mut self, id: &str) -> Vec<HistoryRecord> {
        let history = self.list_history();
        if !history.iter().any(|r| r.id == id) {
            debug!(id, "delete requested for unknown history record");
            return history;
        }

        let updated: Vec<HistoryRecord> = history.into_iter().filter(|r| r.id != id).collect();
        match self.write_history(&updated) {
            Ok(()) => updated,
            Err(err) => {
                error!(key = HISTORY_KEY, id, error = %err, "failed to delete history record");
                self.list_history()
            }
        }
    }

    pub fn clear_history(&mut self) {
        if let Err(err) = self.backend.delete(HISTORY_KEY) {
            error!(key = HISTORY_KEY, error = %err, "failed to clear history");
        }
    }

    fn read_history(&self) -> Result<Vec<HistoryRecord>> {
        match self.backend.get(HISTORY_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| error::serialization_error("history list", e).with_operation("store::read_history")),
            None => Ok(Vec::new()),
        }
    }

    fn write_history(&mut self, history: &[HistoryRecord]) -> Result<()> {
        let raw = serde_json::to_string(history)
            .map_err(|e| error::serialization_error("history list", e))?;
        self.backend
            .set(HISTORY_KEY, &raw)
            .map_err(|e| e.with_operation("store::write_history"))
    }

    // ========================================================================
    // Drafts
    // ========================================================================

    /// Overwrite the draft for `mode`. History has no draft; the call is ignored.
    pub fn save_draft(&mut self, mode: OperationMode, content: &str, instruction: &str) {
        let Ok(draft_mode) = DraftMode::try_from(mode) else {
            return;
        };

        let record = DraftRecord {
            content: content.to_string(),
            instruction: instruction.to_string(),
            timestamp: current_timestamp_ms(),
        };
        let key = draft_mode.storage_key();

        let result = serde_json::to_string(&record)
            .map_err(|e| error::serialization_error("draft", e))
            .and_then(|raw| self.backend.set(key, &raw));
        if let Err(err) = result {
            error!(key, error = %err, "failed to save draft");
        }
    }

    /// Saved draft for `mode`, or empty strings when there is none.
    pub fn load_draft(&self, mode: OperationMode) -> Draft {
        let Ok(draft_mode) = DraftMode::try_from(mode) else {
            return Draft::default();
        };
        let key = draft_mode.storage_key();

        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Draft::default(),
            Err(err) => {
                error!(key, error = %err, "failed to read draft");
                return Draft::default();
            }
        };

        match serde_json::from_str::<DraftRecord>(&raw) {
            Ok(record) => Draft {
                content: record.content,
                instruction: record.instruction,
            },
            Err(e) => {
                warn!(key, error = %e, "discarding unreadable draft");
                Draft::default()
            }
        }
    }
}
