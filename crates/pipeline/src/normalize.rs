//! Normalization: tournament tagging, match filtering, essential-table check.

use std::collections::HashSet;

use fplsnap_core::config::{FilterConfig, KeyColumns};
use fplsnap_core::schema::TOURNAMENT_COLUMN;
use fplsnap_core::table::{as_i64, key_string};
use fplsnap_core::{Error, TableKind, TournamentCatalog};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::model::Snapshot;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeStats {
    /// Matches dropped as friendlies / gameweek 0.
    pub matches_removed: usize,
    /// Matches kept without a recognised tournament.
    pub untagged_matches: usize,
    /// Player match rows belonging to dropped matches.
    pub playermatchstats_excluded: usize,
}

/// Abort when an essential table came back empty.
pub fn check_essential(snapshot: &Snapshot) -> Result<(), Error> {
    for kind in TableKind::ALL {
        let table = snapshot.table(kind);
        if table.is_empty() {
            if kind.is_essential() {
                return Err(Error::EmptyTable(kind.upstream_name().to_string()));
            }
            warn!(table = %kind, "optional table is empty");
        }
    }
    Ok(())
}

/// Tag every match with its tournament slug (`null` when unrecognised).
pub fn tag_tournaments(snapshot: &mut Snapshot, catalog: &TournamentCatalog, keys: &KeyColumns) -> usize {
    let mut untagged = 0;
    for row in &mut snapshot.matches.rows {
        let slug = match row.get(&keys.match_id) {
            Some(Value::String(id)) => catalog.classify(id).map(|t| t.slug.clone()),
            _ => None,
        };
        if slug.is_none() {
            untagged += 1;
        }
        row.insert(
            TOURNAMENT_COLUMN.to_string(),
            slug.map(Value::String).unwrap_or(Value::Null),
        );
    }
    snapshot.matches.push_column(TOURNAMENT_COLUMN);
    untagged
}

/// Tag tournaments, drop filtered matches, and exclude their player rows.
pub fn normalize(
    snapshot: &mut Snapshot,
    catalog: &TournamentCatalog,
    keys: &KeyColumns,
    filter: &FilterConfig,
) -> NormalizeStats {
    let untagged_matches = tag_tournaments(snapshot, catalog, keys);

    info!("filtering out friendlies and pre-season (GW0) matches");
    let is_dropped = |row: &fplsnap_core::Record| {
        let gw_zero = filter.drop_gameweek_zero
            && row.get(&keys.match_gameweek).and_then(as_i64) == Some(0);
        let dropped_tournament = row
            .get(TOURNAMENT_COLUMN)
            .and_then(Value::as_str)
            .is_some_and(|slug| filter.drop_tournaments.iter().any(|d| d == slug));
        gw_zero || dropped_tournament
    };

    let removed_ids: HashSet<String> = snapshot
        .matches
        .rows
        .iter()
        .filter(|r| is_dropped(r))
        .filter_map(|r| r.get(&keys.match_id).and_then(key_string))
        .collect();

    let matches_removed = snapshot.matches.retain(|r| !is_dropped(r));
    info!(
        removed = matches_removed,
        remaining = snapshot.matches.len(),
        "match filter applied"
    );

    // An id kept by another row is still a retained match
    let kept_ids = snapshot.matches.key_set(&keys.match_id);
    let playermatchstats_excluded = snapshot.playermatchstats.retain(|r| {
        match r.get(&keys.pms_match).and_then(key_string) {
            Some(id) => !removed_ids.contains(&id) || kept_ids.contains(&id),
            None => true,
        }
    });
    if playermatchstats_excluded > 0 {
        info!(
            rows = playermatchstats_excluded,
            "excluded player match rows of filtered matches"
        );
    }

    NormalizeStats {
        matches_removed,
        untagged_matches,
        playermatchstats_excluded,
    }
}
