//! Local dump source: `<dir>/<table>.json` (array of objects) or
//! `<dir>/<table>.csv`. JSON wins when both exist; a table with neither
//! file is returned empty and left to the essential-table check.

use std::path::{Path, PathBuf};

use fplsnap_core::csv_io;
use fplsnap_core::{Table, TableKind};
use tracing::{info, warn};

use crate::error::SourceError;
use crate::TableSource;

pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read_json(&self, name: &str, path: &Path) -> Result<Table, SourceError> {
        let text = std::fs::read_to_string(path).map_err(|e| SourceError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let value: serde_json::Value =
            serde_json::from_str(text.trim_start_matches('\u{feff}')).map_err(|e| {
                SourceError::Parse {
                    context: path.display().to_string(),
                    message: e.to_string(),
                }
            })?;

        let items = value.as_array().ok_or_else(|| SourceError::Parse {
            context: path.display().to_string(),
            message: "expected a JSON array of objects".into(),
        })?;

        let mut rows = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let obj = item.as_object().ok_or_else(|| SourceError::Parse {
                context: path.display().to_string(),
                message: format!("element {i} is not an object"),
            })?;
            rows.push(obj.clone());
        }
        Ok(Table::from_records(name, rows))
    }

    fn read_csv(&self, name: &str, path: &Path) -> Result<Table, SourceError> {
        let mut table = csv_io::read_csv_file(path).map_err(|e| SourceError::Parse {
            context: path.display().to_string(),
            message: e.to_string(),
        })?;
        table.name = name.to_string();
        Ok(table)
    }
}

impl TableSource for DirectorySource {
    fn name(&self) -> &str {
        "directory"
    }

    fn fetch_table(&self, kind: TableKind) -> Result<Table, SourceError> {
        let name = kind.upstream_name();
        let json_path = self.root.join(format!("{name}.json"));
        let csv_path = self.root.join(format!("{name}.csv"));

        let table = if json_path.is_file() {
            self.read_json(name, &json_path)?
        } else if csv_path.is_file() {
            self.read_csv(name, &csv_path)?
        } else {
            warn!(table = name, dir = %self.root.display(), "no dump found");
            Table::new(name)
        };

        info!(table = name, rows = table.len(), "loaded");
        Ok(table)
    }
}
