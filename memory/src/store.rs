use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use sfmemo_core::SalesforceRecord;
use tracing::{debug, error, info, warn};

use crate::errors::MemoStoreResult;
use crate::memo::{memo_file_name, MemoDocument, SyncStatus};

const BYTE_ORDER_MARK: char = '\u{feff}';

/// A memo that parsed successfully
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedMemo {
    /// `# {title}\n\n{content}`, ready to display
    pub content: String,
    pub metadata: Map<String, Value>,
    /// The whole document as parsed, unknown fields included
    pub original: Value,
}

/// Result of reading a memo file. Failures are values, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoReadOutcome {
    Loaded(LoadedMemo),
    /// The path does not end in `.json`
    UnsupportedFormat,
    ParseError,
    Unreadable,
}

impl MemoReadOutcome {
    /// Text to show the user for this outcome
    pub fn display_text(&self) -> &str {
        match self {
            MemoReadOutcome::Loaded(memo) => &memo.content,
            MemoReadOutcome::UnsupportedFormat => "Unsupported file format",
            MemoReadOutcome::ParseError => "JSON parse error",
            MemoReadOutcome::Unreadable => "",
        }
    }

    /// The memo's metadata object, empty for every sentinel outcome
    pub fn metadata(&self) -> Map<String, Value> {
        match self {
            MemoReadOutcome::Loaded(memo) => memo.metadata.clone(),
            _ => Map::new(),
        }
    }

    pub fn original(&self) -> Option<&Value> {
        match self {
            MemoReadOutcome::Loaded(memo) => Some(&memo.original),
            _ => None,
        }
    }
}

/// Directory of memo JSON files. The directory is the index; a memo's
/// identity is its path.
///
/// `update_sync_status` is an unguarded read-modify-write: concurrent
/// updates of the same file race and the last writer wins.
#[derive(Debug, Clone)]
pub struct MemoStore {
    dir: PathBuf,
}

impl MemoStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes a new memo and returns its path. Write failures propagate.
    pub async fn save_memo(
        &self,
        title: &str,
        content: &str,
        related: Option<&SalesforceRecord>,
    ) -> MemoStoreResult<PathBuf> {
        let document = MemoDocument::new(title, content, related);
        let path = self.dir.join(memo_file_name(&document.metadata.created_at));

        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(&document)?;
        tokio::fs::write(&path, json).await?;

        let path = std::path::absolute(&path)?;
        info!(path = %path.display(), linked = related.is_some(), "Saved memo");
        Ok(path)
    }

    /// Reads a memo for display. Never fails; see [`MemoReadOutcome`].
    pub async fn read_memo(&self, path: &Path) -> MemoReadOutcome {
        if !has_json_extension(path) {
            warn!(path = %path.display(), "Unsupported memo file format");
            return MemoReadOutcome::UnsupportedFormat;
        }

        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to read memo");
                return MemoReadOutcome::Unreadable;
            }
        };

        let original: Value = match serde_json::from_str(strip_bom(&text)) {
            Ok(value) => value,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to parse memo");
                return MemoReadOutcome::ParseError;
            }
        };

        let title = original.get("title").map(display_value).unwrap_or_default();
        let body = original.get("content").map(display_value).unwrap_or_default();
        let metadata = original
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        MemoReadOutcome::Loaded(LoadedMemo {
            content: format!("# {}\n\n{}", title, body),
            metadata,
            original,
        })
    }

    /// Every `*.json` file directly inside the memo directory, in
    /// enumeration order. A missing directory yields nothing.
    pub async fn list_memos(&self) -> Vec<PathBuf> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %self.dir.display(), error = %e, "Memo directory not readable");
                return Vec::new();
            }
        };

        let mut memos = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    if entry.file_name().to_string_lossy().ends_with(".json") {
                        memos.push(entry.path());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!(dir = %self.dir.display(), error = %e, "Failed to list memos");
                    return Vec::new();
                }
            }
        }
        memos
    }

    /// Records a successful push. Returns `false` instead of failing when
    /// the file is not JSON, cannot be read or parsed, or cannot be written.
    pub async fn update_sync_status(&self, path: &Path, sf_note_id: &str) -> bool {
        if !has_json_extension(path) {
            return false;
        }

        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to read memo for sync update");
                return false;
            }
        };

        let mut document: Value = match serde_json::from_str(strip_bom(&text)) {
            Ok(value) => value,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to parse memo for sync update");
                return false;
            }
        };

        let Some(fields) = document.as_object_mut() else {
            error!(path = %path.display(), "Memo is not a JSON object");
            return false;
        };

        let status = match serde_json::to_value(SyncStatus::synced(sf_note_id)) {
            Ok(status) => status,
            Err(e) => {
                error!(error = %e, "Failed to encode sync status");
                return false;
            }
        };
        fields.insert("syncStatus".to_string(), status);

        let written = match serde_json::to_string_pretty(&document) {
            Ok(json) => tokio::fs::write(path, json).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match written {
            Ok(()) => {
                info!(path = %path.display(), sf_note_id, "Marked memo as synced");
                true
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to write sync status");
                false
            }
        }
    }
}

fn has_json_extension(path: &Path) -> bool {
    path.to_string_lossy().to_lowercase().ends_with(".json")
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(text)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
