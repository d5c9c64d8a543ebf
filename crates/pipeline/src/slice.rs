//! Slicing the reconciled snapshot into the published views.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use fplsnap_core::config::KeyColumns;
use fplsnap_core::schema::{
    gameweek_dir_name, BY_GAMEWEEK_DIR, BY_TOURNAMENT_DIR, FIXTURES_CSV, MATCHES_CSV,
    PLAYERMATCHSTATS_CSV, PLAYERSTATS_CSV, PLAYERS_CSV, PLAYER_GAMEWEEK_STATS_CSV,
    TEAMS_CSV, TOURNAMENT_COLUMN,
};
use fplsnap_core::table::{as_bool, as_i64, key_string};
use fplsnap_core::{Table, TableKind, TournamentCatalog};
use serde_json::Value;
use tracing::{debug, warn};

use crate::discrete::discrete_stats;
use crate::model::{Snapshot, View, ViewFile, ViewKind};

/// Master view, one view per gameweek, then one per tournament gameweek.
pub fn build_views(snapshot: &Snapshot, keys: &KeyColumns, catalog: &TournamentCatalog) -> Vec<View> {
    let slicer = Slicer::new(snapshot, keys);
    let mut views = vec![slicer.master()];
    views.extend(slicer.by_gameweek());
    views.extend(slicer.by_tournament(catalog));
    views
}

struct Slicer<'a> {
    snapshot: &'a Snapshot,
    keys: &'a KeyColumns,
    /// Gameweek ids, ascending.
    gameweeks: Vec<i64>,
    finished: HashMap<i64, bool>,
    /// Cumulative stats rows per gameweek.
    stats: BTreeMap<i64, Table>,
}

impl<'a> Slicer<'a> {
    fn new(snapshot: &'a Snapshot, keys: &'a KeyColumns) -> Self {
        let gameweeks = snapshot.gameweeks.sorted_ints(&keys.gameweek_id);

        let mut finished = HashMap::new();
        for row in &snapshot.gameweeks.rows {
            let id = row.get(&keys.gameweek_id).and_then(as_i64);
            let flag = row.get(&keys.gameweek_finished).and_then(as_bool);
            if let (Some(id), Some(flag)) = (id, flag) {
                finished.entry(id).or_insert(flag);
            }
        }

        let stats = gameweeks
            .iter()
            .map(|&gw| {
                let rows = snapshot
                    .playerstats
                    .filter(|r| r.get(&keys.stats_gameweek).and_then(as_i64) == Some(gw));
                (gw, rows)
            })
            .collect();

        Self {
            snapshot,
            keys,
            gameweeks,
            finished,
            stats,
        }
    }

    fn master(&self) -> View {
        let s = self.snapshot;
        let mut files: Vec<ViewFile> = [
            TableKind::Gameweeks,
            TableKind::Players,
            TableKind::PlayerStats,
            TableKind::Teams,
            TableKind::Matches,
        ]
        .into_iter()
        .map(|kind| ViewFile {
            file_name: kind.master_file(),
            table: s.table(kind).clone(),
        })
        .collect();
        files.push(ViewFile {
            file_name: FIXTURES_CSV,
            table: s.matches.clone(),
        });
        files.push(ViewFile {
            file_name: PLAYERMATCHSTATS_CSV,
            table: s.playermatchstats.clone(),
        });

        View {
            kind: ViewKind::Master,
            rel_dir: PathBuf::new(),
            gameweek: None,
            tournament: None,
            finished: None,
            files,
        }
    }

    fn by_gameweek(&self) -> Vec<View> {
        let mut views = Vec::with_capacity(self.gameweeks.len());
        let mut previous: Option<&Table> = None;
        for &gw in &self.gameweeks {
            let matches = self.matches_where(|r| self.gameweek_of(r) == Some(gw));
            let current = &self.stats[&gw];
            let discrete = discrete_stats(current, previous, &self.keys.stats_player);
            previous = Some(current);

            debug!(gameweek = gw, matches = matches.len(), "gameweek view");
            views.push(View {
                kind: ViewKind::Gameweek,
                rel_dir: PathBuf::from(BY_GAMEWEEK_DIR).join(gameweek_dir_name(gw)),
                gameweek: Some(gw),
                tournament: None,
                finished: self.finished.get(&gw).copied(),
                files: self.view_files(matches, current.clone(), Some(discrete)),
            });
        }
        views
    }

    fn by_tournament(&self, catalog: &TournamentCatalog) -> Vec<View> {
        // Folder name -> slugs, in first-appearance order of the matches
        let mut folders: Vec<(String, Vec<String>)> = Vec::new();
        for row in &self.snapshot.matches.rows {
            let Some(slug) = row.get(TOURNAMENT_COLUMN).and_then(Value::as_str) else {
                continue;
            };
            let folder = catalog.folder_name(slug);
            match folders.iter_mut().find(|(name, _)| *name == folder) {
                Some((_, slugs)) => {
                    if !slugs.iter().any(|s| s == slug) {
                        slugs.push(slug.to_string());
                    }
                }
                None => folders.push((folder, vec![slug.to_string()])),
            }
        }

        let known: HashSet<i64> = self.gameweeks.iter().copied().collect();
        let mut views = Vec::new();
        for (folder, slugs) in folders {
            let in_tournament = |r: &fplsnap_core::Record| {
                r.get(TOURNAMENT_COLUMN)
                    .and_then(Value::as_str)
                    .is_some_and(|s| slugs.iter().any(|slug| slug == s))
            };
            let tournament_matches = self.matches_where(in_tournament);
            let gameweeks = tournament_matches.sorted_ints(&self.keys.match_gameweek);

            for gw in gameweeks.into_iter().filter(|gw| known.contains(gw)) {
                let matches = tournament_matches.filter(|r| self.gameweek_of(r) == Some(gw));
                let current = &self.stats[&gw];
                let discrete = if gw == 1 {
                    Some(discrete_stats(current, None, &self.keys.stats_player))
                } else if let Some(previous) = self.stats.get(&(gw - 1)) {
                    Some(discrete_stats(current, Some(previous), &self.keys.stats_player))
                } else {
                    warn!(
                        tournament = %folder,
                        gameweek = gw,
                        "no stats for the previous gameweek; skipping discrete stats"
                    );
                    None
                };

                debug!(tournament = %folder, gameweek = gw, matches = matches.len(), "tournament view");
                views.push(View {
                    kind: ViewKind::Tournament,
                    rel_dir: PathBuf::from(BY_TOURNAMENT_DIR)
                        .join(&folder)
                        .join(gameweek_dir_name(gw)),
                    gameweek: Some(gw),
                    tournament: Some(folder.clone()),
                    finished: self.finished.get(&gw).copied(),
                    files: self.view_files(matches, current.clone(), discrete),
                });
            }
        }
        views
    }

    fn gameweek_of(&self, row: &fplsnap_core::Record) -> Option<i64> {
        row.get(&self.keys.match_gameweek).and_then(as_i64)
    }

    fn matches_where(&self, pred: impl Fn(&fplsnap_core::Record) -> bool) -> Table {
        self.snapshot.matches.filter(pred)
    }

    /// The file set shared by gameweek and tournament views.
    fn view_files(&self, matches: Table, playerstats: Table, discrete: Option<Table>) -> Vec<ViewFile> {
        let s = self.snapshot;
        let match_ids = matches.key_set(&self.keys.match_id);
        let pms_match = &self.keys.pms_match;
        let playermatchstats = s.playermatchstats.filter(|r| {
            r.get(pms_match)
                .and_then(key_string)
                .is_some_and(|id| match_ids.contains(&id))
        });

        let mut files = vec![
            ViewFile {
                file_name: MATCHES_CSV,
                table: matches.clone(),
            },
            ViewFile {
                file_name: FIXTURES_CSV,
                table: matches,
            },
            ViewFile {
                file_name: PLAYERMATCHSTATS_CSV,
                table: playermatchstats,
            },
            ViewFile {
                file_name: PLAYERS_CSV,
                table: s.players.clone(),
            },
            ViewFile {
                file_name: TEAMS_CSV,
                table: s.teams.clone(),
            },
            ViewFile {
                file_name: PLAYERSTATS_CSV,
                table: playerstats,
            },
        ];
        if let Some(table) = discrete {
            files.push(ViewFile {
                file_name: PLAYER_GAMEWEEK_STATS_CSV,
                table,
            });
        }
        files
    }
}
