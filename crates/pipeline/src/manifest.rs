//! `manifest.json`: what a run published and how to verify it.

use std::collections::BTreeMap;
use std::path::Path;

use fplsnap_core::Error;
use serde::{Deserialize, Serialize};

use crate::model::ViewKind;
use crate::normalize::NormalizeStats;
use crate::reconcile::IntegrityReport;

pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub season: String,
    /// RFC 3339, UTC.
    pub generated_at: String,
    pub source: String,
    pub tool_version: String,
    /// Row counts per upstream table after reconciliation.
    pub tables: BTreeMap<String, usize>,
    pub normalize: NormalizeStats,
    pub integrity: IntegrityReport,
    pub views: Vec<ViewEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewEntry {
    pub kind: ViewKind,
    /// Relative to the season folder, `/`-separated; empty for master.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gameweek: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tournament: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished: Option<bool>,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub rows: usize,
    /// `blake3:<hex>` of the file bytes.
    pub hash: String,
}

impl ViewEntry {
    /// Insert or replace the entry for `file.name`.
    pub fn upsert_file(&mut self, file: FileEntry) {
        match self.files.iter_mut().find(|f| f.name == file.name) {
            Some(existing) => *existing = file,
            None => self.files.push(file),
        }
    }
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io_at(path, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Pretty JSON with a trailing newline.
    pub fn to_json(&self) -> Result<String, Error> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        std::fs::write(path, self.to_json()?).map_err(|e| Error::io_at(path, e))
    }

    pub fn view_mut(&mut self, path: &str) -> Option<&mut ViewEntry> {
        self.views.iter_mut().find(|v| v.path == path)
    }
}

/// Content hash with algorithm prefix.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("blake3:{}", blake3::hash(bytes).to_hex())
}

/// `/`-joined form of a relative view directory.
pub fn view_path(rel_dir: &Path) -> String {
    rel_dir
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
