//! Referential integrity between the season tables.
//!
//! Checks run children-last: matches are reconciled against teams and
//! gameweeks first, so a match dropped there also takes its player match
//! rows with it under the `drop` policy.

use std::collections::{HashMap, HashSet};

use fplsnap_core::config::{IntegrityConfig, KeyColumns, ViolationPolicy};
use fplsnap_core::table::key_string;
use fplsnap_core::{Error, Table};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::Snapshot;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityCheck {
    MatchTeams,
    MatchGameweek,
    PlayerMatchStatsMatch,
    PlayerMatchStatsPlayer,
    PlayerStatsPlayer,
    PlayerStatsGameweek,
}

impl std::fmt::Display for IntegrityCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MatchTeams => write!(f, "matches.home_team/away_team -> teams"),
            Self::MatchGameweek => write!(f, "matches.gameweek -> gameweeks"),
            Self::PlayerMatchStatsMatch => write!(f, "playermatchstats.match_id -> matches"),
            Self::PlayerMatchStatsPlayer => write!(f, "playermatchstats.player_id -> players"),
            Self::PlayerStatsPlayer => write!(f, "playerstats.id -> players"),
            Self::PlayerStatsGameweek => write!(f, "playerstats.gw -> gameweeks"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check: IntegrityCheck,
    /// Offending rows.
    pub violations: usize,
    /// Distinct offending key values, capped at the sample limit.
    pub samples: Vec<String>,
    /// Rows removed (`drop` policy only).
    pub dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateKeys {
    pub table: String,
    pub column: String,
    /// Rows beyond the first occurrence of their key.
    pub extra_rows: usize,
    pub samples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub policy: ViolationPolicy,
    pub checks: Vec<CheckResult>,
    pub duplicate_keys: Vec<DuplicateKeys>,
}

impl IntegrityReport {
    pub fn total_violations(&self) -> usize {
        self.checks.iter().map(|c| c.violations).sum()
    }

    pub fn total_dropped(&self) -> usize {
        self.checks.iter().map(|c| c.dropped).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.total_violations() == 0
    }

    /// One line per failing check, for logs and error messages.
    pub fn describe_violations(&self) -> String {
        self.checks
            .iter()
            .filter(|c| c.violations > 0)
            .map(|c| format!("{}: {} row(s) [{}]", c.check, c.violations, c.samples.join(", ")))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// Run every check and apply the configured policy to `snapshot`.
///
/// Under `fail` nothing is modified; any violation aborts with
/// [`Error::Integrity`] once every check has been counted.
pub fn reconcile(
    snapshot: &mut Snapshot,
    keys: &KeyColumns,
    config: &IntegrityConfig,
) -> Result<IntegrityReport, Error> {
    let policy = config.on_violation;
    let limit = config.sample_limit;
    let remove = policy == ViolationPolicy::Drop;

    let duplicate_keys = [
        (&snapshot.gameweeks, keys.gameweek_id.as_str()),
        (&snapshot.players, keys.player_id.as_str()),
        (&snapshot.teams, keys.team_id.as_str()),
        (&snapshot.matches, keys.match_id.as_str()),
    ]
    .into_iter()
    .filter_map(|(table, column)| find_duplicate_keys(table, column, limit))
    .collect::<Vec<_>>();

    for dup in &duplicate_keys {
        warn!(
            table = %dup.table,
            column = %dup.column,
            extra_rows = dup.extra_rows,
            samples = ?dup.samples,
            "duplicate keys; first occurrence wins"
        );
    }

    let team_ids = snapshot.teams.key_set(&keys.team_id);
    let gameweek_ids = snapshot.gameweeks.key_set(&keys.gameweek_id);
    let player_ids = snapshot.players.key_set(&keys.player_id);

    let mut checks = Vec::with_capacity(6);
    checks.push(check_references(
        &mut snapshot.matches,
        &[&keys.home_team, &keys.away_team],
        &team_ids,
        IntegrityCheck::MatchTeams,
        remove,
        limit,
    ));
    checks.push(check_references(
        &mut snapshot.matches,
        &[&keys.match_gameweek],
        &gameweek_ids,
        IntegrityCheck::MatchGameweek,
        remove,
        limit,
    ));

    // Taken after match drops so orphaned player rows follow their match
    let match_ids = snapshot.matches.key_set(&keys.match_id);
    checks.push(check_references(
        &mut snapshot.playermatchstats,
        &[&keys.pms_match],
        &match_ids,
        IntegrityCheck::PlayerMatchStatsMatch,
        remove,
        limit,
    ));
    checks.push(check_references(
        &mut snapshot.playermatchstats,
        &[&keys.pms_player],
        &player_ids,
        IntegrityCheck::PlayerMatchStatsPlayer,
        remove,
        limit,
    ));
    checks.push(check_references(
        &mut snapshot.playerstats,
        &[&keys.stats_player],
        &player_ids,
        IntegrityCheck::PlayerStatsPlayer,
        remove,
        limit,
    ));
    checks.push(check_references(
        &mut snapshot.playerstats,
        &[&keys.stats_gameweek],
        &gameweek_ids,
        IntegrityCheck::PlayerStatsGameweek,
        remove,
        limit,
    ));

    let report = IntegrityReport {
        policy,
        checks,
        duplicate_keys,
    };

    if report.is_clean() {
        info!("referential integrity checks passed");
        return Ok(report);
    }

    for check in report.checks.iter().filter(|c| c.violations > 0) {
        warn!(
            check = %check.check,
            violations = check.violations,
            dropped = check.dropped,
            samples = ?check.samples,
            policy = %policy,
            "referential integrity violation"
        );
    }

    if policy == ViolationPolicy::Fail {
        return Err(Error::integrity(report.describe_violations()));
    }
    Ok(report)
}

/// Count rows of `child` whose non-null `columns` miss `parent`; remove them
/// when `remove` is set.
fn check_references(
    child: &mut Table,
    columns: &[&String],
    parent: &HashSet<String>,
    check: IntegrityCheck,
    remove: bool,
    sample_limit: usize,
) -> CheckResult {
    let orphan_key = |row: &fplsnap_core::Record| -> Option<String> {
        columns
            .iter()
            .filter_map(|c| row.get(c.as_str()).and_then(key_string))
            .find(|k| !parent.contains(k))
    };

    let mut violations = 0;
    let mut samples: Vec<String> = Vec::new();
    for row in &child.rows {
        if let Some(key) = orphan_key(row) {
            violations += 1;
            if samples.len() < sample_limit && !samples.contains(&key) {
                samples.push(key);
            }
        }
    }

    let dropped = if remove && violations > 0 {
        child.retain(|row| orphan_key(row).is_none())
    } else {
        0
    };

    CheckResult {
        check,
        violations,
        samples,
        dropped,
    }
}

fn find_duplicate_keys(table: &Table, column: &str, sample_limit: usize) -> Option<DuplicateKeys> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for key in table.rows.iter().filter_map(|r| r.get(column).and_then(key_string)) {
        let n = counts.entry(key.clone()).or_insert(0);
        *n += 1;
        if *n == 2 {
            order.push(key);
        }
    }
    if order.is_empty() {
        return None;
    }
    let extra_rows = counts.values().map(|n| n - 1).sum();
    Some(DuplicateKeys {
        table: table.name.clone(),
        column: column.to_string(),
        extra_rows,
        samples: order.into_iter().take(sample_limit).collect(),
    })
}
