//! Consistency checks over a published season tree.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use fplsnap_core::config::{IntegrityConfig, KeyColumns, ViolationPolicy};
use fplsnap_core::schema::{
    gameweek_dir_name, BY_GAMEWEEK_DIR, FIXTURES_CSV, MANIFEST_JSON, MATCHES_CSV,
    PLAYERMATCHSTATS_CSV, PLAYERSTATS_CSV, TOURNAMENT_COLUMN,
};
use fplsnap_core::table::{as_i64, key_string};
use fplsnap_core::{Error, Record, Table, TableKind, TournamentCatalog};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::manifest::{content_hash, Manifest};
use crate::model::Snapshot;
use crate::reconcile::reconcile;
use crate::tree::{gameweek_dirs, read_optional, tournament_dirs};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Relative to the season folder.
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub views_checked: usize,
    pub files_hashed: usize,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.findings.is_empty()
    }

    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.findings.push(Finding {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Check a published tree.
///
/// Errors are reserved for unreadable input; everything wrong with the data
/// itself is reported as a [`Finding`].
pub fn validate_tree(
    season_dir: &Path,
    keys: &KeyColumns,
    catalog: &TournamentCatalog,
) -> Result<ValidationReport, Error> {
    if !season_dir.is_dir() {
        return Err(Error::data(format!("'{}' is not a directory", season_dir.display())));
    }
    let mut report = ValidationReport::default();

    // ── Master ──
    let mut master = Snapshot::default();
    for kind in TableKind::ALL {
        match read_optional(season_dir, kind.master_file())? {
            Some(table) => master.insert(kind, table),
            None => report.push(kind.master_file(), "missing master file"),
        }
    }
    check_master(&mut report, &master, keys);
    check_fixtures(&mut report, season_dir, "")?;

    let master_keys = MasterKeys::new(&master, keys);

    // ── By Gameweek ──
    for (gw, dir) in gameweek_dirs(&season_dir.join(BY_GAMEWEEK_DIR))? {
        let rel = format!("{BY_GAMEWEEK_DIR}/{}", gameweek_dir_name(gw));
        if !master_keys.gameweeks.contains(&gw.to_string()) {
            report.push(&rel, format!("gameweek {gw} is not in gameweek_summaries.csv"));
        }
        check_view(&mut report, &dir, &rel, gw, None, &master_keys, keys, catalog)?;
    }

    // ── By Tournament ──
    for (name, tournament_dir) in tournament_dirs(season_dir)? {
        for (gw, dir) in gameweek_dirs(&tournament_dir)? {
            let rel = format!("By Tournament/{name}/{}", gameweek_dir_name(gw));
            check_view(&mut report, &dir, &rel, gw, Some(&name), &master_keys, keys, catalog)?;
        }
    }

    // ── Manifest ──
    let manifest_path = season_dir.join(MANIFEST_JSON);
    if manifest_path.is_file() {
        check_manifest(&mut report, season_dir, &Manifest::load(&manifest_path)?)?;
    }

    debug!(
        views = report.views_checked,
        hashed = report.files_hashed,
        findings = report.findings.len(),
        "validation finished"
    );
    Ok(report)
}

/// Referential checks on the master files, reusing the run's reconciler.
fn check_master(report: &mut ValidationReport, master: &Snapshot, keys: &KeyColumns) {
    let mut scratch = master.clone();
    let config = IntegrityConfig {
        on_violation: ViolationPolicy::Warn,
        sample_limit: 5,
    };
    // Warn never errors
    let Ok(integrity) = reconcile(&mut scratch, keys, &config) else {
        return;
    };
    for check in integrity.checks.iter().filter(|c| c.violations > 0) {
        report.push(
            "",
            format!(
                "{}: {} row(s) reference missing keys [{}]",
                check.check,
                check.violations,
                check.samples.join(", ")
            ),
        );
    }
}

struct MasterKeys {
    gameweeks: HashSet<String>,
    matches: HashSet<String>,
    playermatchstats: HashSet<(String, String)>,
    playerstats: HashSet<(String, String)>,
}

impl MasterKeys {
    fn new(master: &Snapshot, keys: &KeyColumns) -> Self {
        Self {
            gameweeks: master.gameweeks.key_set(&keys.gameweek_id),
            matches: master.matches.key_set(&keys.match_id),
            playermatchstats: pair_set(&master.playermatchstats, &keys.pms_player, &keys.pms_match),
            playerstats: pair_set(&master.playerstats, &keys.stats_player, &keys.stats_gameweek),
        }
    }
}

fn pair_key(row: &Record, a: &str, b: &str) -> (String, String) {
    (
        row.get(a).and_then(key_string).unwrap_or_default(),
        row.get(b).and_then(key_string).unwrap_or_default(),
    )
}

fn pair_set(table: &Table, a: &str, b: &str) -> HashSet<(String, String)> {
    table.rows.iter().map(|r| pair_key(r, a, b)).collect()
}

#[allow(clippy::too_many_arguments)]
fn check_view(
    report: &mut ValidationReport,
    dir: &Path,
    rel: &str,
    gameweek: i64,
    tournament: Option<&str>,
    master: &MasterKeys,
    keys: &KeyColumns,
    catalog: &TournamentCatalog,
) -> Result<(), Error> {
    report.views_checked += 1;

    let matches = match read_optional(dir, MATCHES_CSV)? {
        Some(t) => t,
        None => {
            report.push(rel, "missing matches.csv");
            Table::new("matches")
        }
    };

    let mut view_match_ids = HashSet::new();
    for row in &matches.rows {
        let id = row.get(&keys.match_id).and_then(key_string).unwrap_or_default();
        if !master.matches.contains(&id) {
            report.push(rel, format!("match '{id}' is not in master matches.csv"));
        }
        if row.get(&keys.match_gameweek).and_then(as_i64) != Some(gameweek) {
            report.push(rel, format!("match '{id}' does not belong to gameweek {gameweek}"));
        }
        if let Some(folder) = tournament {
            let slug = row.get(TOURNAMENT_COLUMN).and_then(Value::as_str);
            if slug.map(|s| catalog.folder_name(s)).as_deref() != Some(folder) {
                report.push(rel, format!("match '{id}' does not belong to tournament '{folder}'"));
            }
        }
        view_match_ids.insert(id);
    }

    check_fixtures(report, dir, rel)?;

    if let Some(pms) = read_optional(dir, PLAYERMATCHSTATS_CSV)? {
        for row in &pms.rows {
            let pair = pair_key(row, &keys.pms_player, &keys.pms_match);
            if !master.playermatchstats.contains(&pair) {
                report.push(
                    rel,
                    format!("player match row ({}, {}) is not in master playermatchstats.csv", pair.0, pair.1),
                );
            } else if !view_match_ids.contains(&pair.1) {
                report.push(rel, format!("player match row for match '{}' outside this view", pair.1));
            }
        }
    } else {
        report.push(rel, "missing playermatchstats.csv");
    }

    if let Some(stats) = read_optional(dir, PLAYERSTATS_CSV)? {
        for row in &stats.rows {
            let pair = pair_key(row, &keys.stats_player, &keys.stats_gameweek);
            if !master.playerstats.contains(&pair) {
                report.push(
                    rel,
                    format!("player stats row ({}, gw {}) is not in master playerstats.csv", pair.0, pair.1),
                );
            } else if pair.1 != gameweek.to_string() {
                report.push(rel, format!("player stats row for gw {} in gameweek {gameweek}", pair.1));
            }
        }
    } else {
        report.push(rel, "missing playerstats.csv");
    }
    Ok(())
}

/// `fixtures.csv` is a byte copy of `matches.csv`.
fn check_fixtures(report: &mut ValidationReport, dir: &Path, rel: &str) -> Result<(), Error> {
    let fixtures = dir.join(FIXTURES_CSV);
    let matches = dir.join(MATCHES_CSV);
    if !fixtures.is_file() {
        report.push(rel, "missing fixtures.csv");
        return Ok(());
    }
    if !matches.is_file() {
        return Ok(());
    }
    let a = fs::read(&fixtures).map_err(|e| Error::io_at(&fixtures, e))?;
    let b = fs::read(&matches).map_err(|e| Error::io_at(&matches, e))?;
    if a != b {
        report.push(rel, "fixtures.csv does not match matches.csv");
    }
    Ok(())
}

fn check_manifest(report: &mut ValidationReport, season_dir: &Path, manifest: &Manifest) -> Result<(), Error> {
    for view in &manifest.views {
        let dir = if view.path.is_empty() {
            season_dir.to_path_buf()
        } else {
            season_dir.join(&view.path)
        };
        for file in &view.files {
            let path = dir.join(&file.name);
            let rel = if view.path.is_empty() {
                file.name.clone()
            } else {
                format!("{}/{}", view.path, file.name)
            };
            if !path.is_file() {
                report.push(rel, "listed in manifest.json but missing");
                continue;
            }
            let bytes = fs::read(&path).map_err(|e| Error::io_at(&path, e))?;
            report.files_hashed += 1;
            if content_hash(&bytes) != file.hash {
                report.push(rel, "content hash differs from manifest.json");
            }
        }
    }
    Ok(())
}
