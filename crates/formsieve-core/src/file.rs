//! Uploaded file descriptors.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Uploaded files keyed by field name.
pub type FilesSource = IndexMap<String, FileInput>;

/// One uploaded file.
///
/// `mime`, `ext` and `key` are filled in by file validation; `path` is set
/// once the file has been moved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub tmp_path: PathBuf,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type", default)]
    pub mime: String,
    #[serde(default)]
    pub ext: String,
    #[serde(default)]
    pub key: String,
}

impl FileEntry {
    pub fn new(name: impl Into<String>, tmp_path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            name: name.into(),
            tmp_path: tmp_path.into(),
            size,
            ..Self::default()
        }
    }

    /// Extension taken from the client supplied name, lowercased.
    pub fn name_ext(&self) -> Option<String> {
        let (_, ext) = self.name.rsplit_once('.')?;
        (!ext.is_empty()).then(|| ext.to_lowercase())
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Multiple uploads for one field, stored as parallel attribute lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntryCollection {
    pub name: Vec<String>,
    pub tmp_path: Vec<PathBuf>,
    #[serde(default)]
    pub path: Vec<Option<PathBuf>>,
    #[serde(default)]
    pub size: Vec<u64>,
    #[serde(rename = "type", default)]
    pub mime: Vec<String>,
    #[serde(default)]
    pub ext: Vec<String>,
    #[serde(default)]
    pub key: Vec<String>,
}

impl FileEntryCollection {
    pub fn from_entries(entries: impl IntoIterator<Item = FileEntry>) -> Self {
        let mut collection = Self::default();
        for entry in entries {
            collection.push(entry);
        }
        collection
    }

    pub fn push(&mut self, entry: FileEntry) {
        self.name.push(entry.name);
        self.tmp_path.push(entry.tmp_path);
        self.path.push(entry.path);
        self.size.push(entry.size);
        self.mime.push(entry.mime);
        self.ext.push(entry.ext);
        self.key.push(entry.key);
    }

    pub fn len(&self) -> usize {
        self.name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// Assemble the entry at `index`. Missing optional attributes default.
    pub fn entry(&self, index: usize) -> Option<FileEntry> {
        let name = self.name.get(index)?.clone();
        Some(FileEntry {
            name,
            tmp_path: self.tmp_path.get(index).cloned().unwrap_or_default(),
            path: self.path.get(index).cloned().flatten(),
            size: self.size.get(index).copied().unwrap_or_default(),
            mime: self.mime.get(index).cloned().unwrap_or_default(),
            ext: self.ext.get(index).cloned().unwrap_or_default(),
            key: self.key.get(index).cloned().unwrap_or_default(),
        })
    }

    pub fn entries(&self) -> Vec<FileEntry> {
        (0..self.len()).filter_map(|i| self.entry(i)).collect()
    }
}

/// The files source value of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileInput {
    Single(FileEntry),
    Multiple(FileEntryCollection),
}

impl FileInput {
    pub fn entries(&self) -> Vec<FileEntry> {
        match self {
            FileInput::Single(entry) => vec![entry.clone()],
            FileInput::Multiple(collection) => collection.entries(),
        }
    }

    /// True when at least one entry carries a client file name.
    pub fn has_name(&self) -> bool {
        match self {
            FileInput::Single(entry) => !entry.name.is_empty(),
            FileInput::Multiple(collection) => collection.name.iter().any(|n| !n.is_empty()),
        }
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self, FileInput::Multiple(c) if c.len() > 1)
    }
}

impl From<FileEntry> for FileInput {
    fn from(entry: FileEntry) -> Self {
        FileInput::Single(entry)
    }
}

impl From<Vec<FileEntry>> for FileInput {
    fn from(entries: Vec<FileEntry>) -> Self {
        FileInput::Multiple(FileEntryCollection::from_entries(entries))
    }
}

/// Content type reported by a file type detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedType {
    pub mime: String,
    pub ext: String,
}

impl DetectedType {
    pub fn new(mime: impl Into<String>, ext: impl Into<String>) -> Self {
        Self {
            mime: mime.into(),
            ext: ext.into(),
        }
    }

    /// Sentinel for content that could not be identified.
    pub fn unknown() -> Self {
        Self::new("application/octet-stream", "")
    }

    pub fn is_unknown(&self) -> bool {
        self.ext.is_empty()
    }
}
