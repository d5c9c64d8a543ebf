//! Reading a published season tree back from disk.

use std::fs;
use std::path::{Path, PathBuf};

use fplsnap_core::csv_io::{read_csv_file, read_csv_text_file};
use fplsnap_core::schema::{parse_gameweek_dir, BY_TOURNAMENT_DIR};
use fplsnap_core::{Error, Table};

/// `dir/file` as a table, or `None` when the file does not exist.
pub fn read_optional(dir: &Path, file: &str) -> Result<Option<Table>, Error> {
    let path = dir.join(file);
    if !path.is_file() {
        return Ok(None);
    }
    read_csv_file(&path).map(Some)
}

/// [`read_optional`] with every cell kept as its text on disk, so decimal
/// places survive the read.
pub fn read_optional_text(dir: &Path, file: &str) -> Result<Option<Table>, Error> {
    let path = dir.join(file);
    if !path.is_file() {
        return Ok(None);
    }
    read_csv_text_file(&path).map(Some)
}

/// `GW<n>` folders directly under `dir`, ascending by `n`. Other entries are
/// ignored; a missing `dir` yields nothing.
pub fn gameweek_dirs(dir: &Path) -> Result<Vec<(i64, PathBuf)>, Error> {
    let mut out: Vec<(i64, PathBuf)> = subdirs(dir)?
        .into_iter()
        .filter_map(|(name, path)| parse_gameweek_dir(&name).map(|gw| (gw, path)))
        .collect();
    out.sort_by_key(|(gw, _)| *gw);
    Ok(out)
}

/// Tournament folders under `By Tournament/`, sorted by name.
pub fn tournament_dirs(season_dir: &Path) -> Result<Vec<(String, PathBuf)>, Error> {
    let mut out = subdirs(&season_dir.join(BY_TOURNAMENT_DIR))?;
    out.sort();
    Ok(out)
}

fn subdirs(dir: &Path) -> Result<Vec<(String, PathBuf)>, Error> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::io_at(dir, e))? {
        let entry = entry.map_err(|e| Error::io_at(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            out.push((entry.file_name().to_string_lossy().into_owned(), path));
        }
    }
    Ok(out)
}
