//! Staged publishing of the season tree.
//!
//! Everything is written under `<out>/.<season>.staging`, then swapped with
//! the live folder by two renames. Until the second rename readers see the
//! previous snapshot; a failed write removes the staging folder and leaves
//! the live folder untouched.

use std::fs;
use std::path::{Path, PathBuf};

use fplsnap_core::csv_io::write_csv;
use fplsnap_core::schema::MANIFEST_JSON;
use fplsnap_core::{Error, Table};
use tracing::{debug, info, warn};

use crate::manifest::{content_hash, view_path, FileEntry, Manifest, ViewEntry};
use crate::model::View;

#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub season_dir: PathBuf,
    pub files_written: usize,
    pub manifest: Manifest,
}

/// Render `table` as CSV bytes.
pub fn render_csv(table: &Table) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf)?;
    Ok(buf)
}

/// Write `bytes` to `path` and describe it for the manifest.
pub fn write_file(path: &Path, bytes: &[u8], rows: usize) -> Result<FileEntry, Error> {
    fs::write(path, bytes).map_err(|e| Error::io_at(path, e))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(FileEntry {
        name,
        rows,
        hash: content_hash(bytes),
    })
}

/// Publish `views` at `season_dir`, filling `manifest.views`.
pub fn publish(season_dir: &Path, views: &[View], mut manifest: Manifest) -> Result<PublishOutcome, Error> {
    let (parent, folder) = split_season_dir(season_dir)?;
    fs::create_dir_all(&parent).map_err(|e| Error::io_at(&parent, e))?;

    let staging = parent.join(format!(".{folder}.staging"));
    remove_dir_if_exists(&staging)?;

    let written = match write_tree(&staging, views, &mut manifest) {
        Ok(n) => n,
        Err(e) => {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                warn!(path = %staging.display(), error = %cleanup, "could not remove staging folder");
            }
            return Err(e);
        }
    };

    swap_into_place(&staging, season_dir, &parent, &folder)?;
    info!(
        path = %season_dir.display(),
        views = views.len(),
        files = written,
        "snapshot published"
    );

    Ok(PublishOutcome {
        season_dir: season_dir.to_path_buf(),
        files_written: written,
        manifest,
    })
}

fn write_tree(root: &Path, views: &[View], manifest: &mut Manifest) -> Result<usize, Error> {
    let mut written = 0;
    manifest.views.clear();
    for view in views {
        let dir = root.join(&view.rel_dir);
        fs::create_dir_all(&dir).map_err(|e| Error::io_at(&dir, e))?;

        let mut entry = ViewEntry {
            kind: view.kind,
            path: view_path(&view.rel_dir),
            gameweek: view.gameweek,
            tournament: view.tournament.clone(),
            finished: view.finished,
            files: Vec::with_capacity(view.files.len()),
        };
        for file in &view.files {
            let bytes = render_csv(&file.table)?;
            entry
                .files
                .push(write_file(&dir.join(file.file_name), &bytes, file.table.len())?);
            written += 1;
        }
        debug!(view = %entry.path, files = entry.files.len(), "view written");
        manifest.views.push(entry);
    }

    manifest.save(&root.join(MANIFEST_JSON))?;
    Ok(written)
}

fn swap_into_place(staging: &Path, target: &Path, parent: &Path, folder: &str) -> Result<(), Error> {
    if !target.exists() {
        return fs::rename(staging, target).map_err(|e| Error::io_at(target, e));
    }

    let previous = parent.join(format!(".{folder}.previous"));
    remove_dir_if_exists(&previous)?;
    fs::rename(target, &previous).map_err(|e| Error::io_at(target, e))?;

    if let Err(e) = fs::rename(staging, target) {
        // Put the old snapshot back before reporting
        if let Err(restore) = fs::rename(&previous, target) {
            warn!(path = %previous.display(), error = %restore, "could not restore previous snapshot");
        }
        let _ = fs::remove_dir_all(staging);
        return Err(Error::io_at(target, e));
    }

    if let Err(e) = fs::remove_dir_all(&previous) {
        warn!(path = %previous.display(), error = %e, "could not remove previous snapshot");
    }
    Ok(())
}

fn split_season_dir(season_dir: &Path) -> Result<(PathBuf, String), Error> {
    let folder = season_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::config(format!("'{}' has no season folder name", season_dir.display())))?;
    let parent = match season_dir.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((parent, folder))
}

fn remove_dir_if_exists(path: &Path) -> Result<(), Error> {
    if path.exists() {
        fs::remove_dir_all(path).map_err(|e| Error::io_at(path, e))?;
    }
    Ok(())
}
