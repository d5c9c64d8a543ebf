//! Recompute `player_gameweek_stats.csv` for an already published tree.

use std::collections::HashMap;
use std::path::Path;

use fplsnap_core::config::KeyColumns;
use fplsnap_core::schema::{BY_GAMEWEEK_DIR, MANIFEST_JSON, PLAYERSTATS_CSV, PLAYER_GAMEWEEK_STATS_CSV};
use fplsnap_core::{Error, Table};
use serde::Serialize;
use tracing::{info, warn};

use crate::discrete::discrete_stats;
use crate::manifest::{view_path, FileEntry, Manifest};
use crate::publish::{render_csv, write_file};
use crate::tree::{gameweek_dirs, read_optional_text, tournament_dirs};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeltaSummary {
    pub written: usize,
    pub skipped: usize,
}

/// Rewrite the discrete stats of every By Gameweek and By Tournament folder
/// from the `playerstats.csv` files on disk. Manifest entries are updated
/// when a manifest exists.
pub fn recompute_deltas(season_dir: &Path, keys: &KeyColumns) -> Result<DeltaSummary, Error> {
    let by_gameweek = season_dir.join(BY_GAMEWEEK_DIR);
    if !by_gameweek.is_dir() {
        return Err(Error::data(format!(
            "'{}' not found; publish a snapshot first",
            by_gameweek.display()
        )));
    }

    let manifest_path = season_dir.join(MANIFEST_JSON);
    let mut manifest = if manifest_path.is_file() {
        Some(Manifest::load(&manifest_path)?)
    } else {
        None
    };

    let mut summary = DeltaSummary::default();
    let id_column = keys.stats_player.as_str();

    // ── By Gameweek ──
    let gw_dirs = gameweek_dirs(&by_gameweek)?;
    let mut stats: Vec<Option<Table>> = Vec::with_capacity(gw_dirs.len());
    for (_, dir) in &gw_dirs {
        stats.push(read_optional_text(dir, PLAYERSTATS_CSV)?);
    }

    for (i, (gw, dir)) in gw_dirs.iter().enumerate() {
        let Some(current) = &stats[i] else {
            warn!(gameweek = gw, "playerstats.csv not found; skipping");
            summary.skipped += 1;
            continue;
        };
        let previous = if i == 0 {
            None
        } else {
            match &stats[i - 1] {
                Some(prev) => Some(prev),
                None => {
                    warn!(gameweek = gw, "previous gameweek stats not found; skipping");
                    summary.skipped += 1;
                    continue;
                }
            }
        };
        let entry = write_discrete(dir, &discrete_stats(current, previous, id_column))?;
        record(&mut manifest, season_dir, dir, entry);
        summary.written += 1;
    }

    // ── By Tournament ──
    let by_number: HashMap<i64, Option<&Table>> = gw_dirs
        .iter()
        .zip(&stats)
        .map(|((gw, _), t)| (*gw, t.as_ref()))
        .collect();

    for (name, tournament_dir) in tournament_dirs(season_dir)? {
        for (gw, dir) in gameweek_dirs(&tournament_dir)? {
            let Some(current) = read_optional_text(&dir, PLAYERSTATS_CSV)? else {
                warn!(tournament = %name, gameweek = gw, "playerstats.csv not found; skipping");
                summary.skipped += 1;
                continue;
            };
            let previous = if gw == 1 {
                None
            } else {
                match by_number.get(&(gw - 1)).copied().flatten() {
                    Some(prev) => Some(prev),
                    None => {
                        warn!(
                            tournament = %name,
                            gameweek = gw,
                            "no By Gameweek stats for the previous gameweek; skipping"
                        );
                        summary.skipped += 1;
                        continue;
                    }
                }
            };
            let entry = write_discrete(&dir, &discrete_stats(&current, previous, id_column))?;
            record(&mut manifest, season_dir, &dir, entry);
            summary.written += 1;
        }
    }

    if let Some(manifest) = &manifest {
        manifest.save(&manifest_path)?;
    }
    info!(written = summary.written, skipped = summary.skipped, "discrete stats recomputed");
    Ok(summary)
}

fn write_discrete(dir: &Path, table: &Table) -> Result<FileEntry, Error> {
    let bytes = render_csv(table)?;
    write_file(&dir.join(PLAYER_GAMEWEEK_STATS_CSV), &bytes, table.len())
}

fn record(manifest: &mut Option<Manifest>, season_dir: &Path, dir: &Path, entry: FileEntry) {
    let Some(manifest) = manifest else { return };
    let Ok(rel) = dir.strip_prefix(season_dir) else { return };
    match manifest.view_mut(&view_path(rel)) {
        Some(view) => view.upsert_file(entry),
        None => warn!(view = %view_path(rel), "folder is not listed in the manifest"),
    }
}
