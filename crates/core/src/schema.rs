//! Table catalogue and the published file layout.
//!
//! ```text
//! <out>/<season>/
//!     gameweek_summaries.csv  players.csv  playerstats.csv  teams.csv
//!     matches.csv  fixtures.csv  playermatchstats.csv  manifest.json
//!     By Gameweek/GW<n>/...
//!     By Tournament/<Tournament Name>/GW<n>/...
//! ```

use std::fmt;

// ── Upstream tables ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableKind {
    Gameweeks,
    Players,
    PlayerStats,
    Teams,
    Matches,
    PlayerMatchStats,
}

impl TableKind {
    /// Fetch order used by a pipeline run.
    pub const ALL: [TableKind; 6] = [
        TableKind::Gameweeks,
        TableKind::Players,
        TableKind::PlayerStats,
        TableKind::Teams,
        TableKind::Matches,
        TableKind::PlayerMatchStats,
    ];

    /// Table name in the upstream store.
    pub fn upstream_name(&self) -> &'static str {
        match self {
            Self::Gameweeks => "gameweeks",
            Self::Players => "players",
            Self::PlayerStats => "playerstats",
            Self::Teams => "teams",
            Self::Matches => "matches",
            Self::PlayerMatchStats => "playermatchstats",
        }
    }

    /// An empty essential table aborts the run.
    pub fn is_essential(&self) -> bool {
        !matches!(self, Self::PlayerMatchStats)
    }

    /// File name of this table in the master folder.
    pub fn master_file(&self) -> &'static str {
        match self {
            Self::Gameweeks => GAMEWEEK_SUMMARIES_CSV,
            Self::Players => PLAYERS_CSV,
            Self::PlayerStats => PLAYERSTATS_CSV,
            Self::Teams => TEAMS_CSV,
            Self::Matches => MATCHES_CSV,
            Self::PlayerMatchStats => PLAYERMATCHSTATS_CSV,
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.upstream_name())
    }
}

// ── Layout ──────────────────────────────────────────────────────────

pub const GAMEWEEK_SUMMARIES_CSV: &str = "gameweek_summaries.csv";
pub const PLAYERS_CSV: &str = "players.csv";
pub const PLAYERSTATS_CSV: &str = "playerstats.csv";
pub const TEAMS_CSV: &str = "teams.csv";
pub const MATCHES_CSV: &str = "matches.csv";
pub const FIXTURES_CSV: &str = "fixtures.csv";
pub const PLAYERMATCHSTATS_CSV: &str = "playermatchstats.csv";
pub const PLAYER_GAMEWEEK_STATS_CSV: &str = "player_gameweek_stats.csv";
pub const MANIFEST_JSON: &str = "manifest.json";

pub const BY_GAMEWEEK_DIR: &str = "By Gameweek";
pub const BY_TOURNAMENT_DIR: &str = "By Tournament";

/// Derived column appended to matches.
pub const TOURNAMENT_COLUMN: &str = "tournament";

pub fn gameweek_dir_name(gameweek: i64) -> String {
    format!("GW{gameweek}")
}

/// `"GW12"` → `Some(12)`. Anything else → `None`.
pub fn parse_gameweek_dir(name: &str) -> Option<i64> {
    name.strip_prefix("GW")
        .filter(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|rest| rest.parse().ok())
}

// ── Discrete gameweek stats columns ─────────────────────────────────

/// Identity columns carried into `player_gameweek_stats.csv`.
pub const ID_COLS: &[&str] = &["id", "first_name", "second_name", "web_name"];

/// Point-in-time columns passed through unchanged.
pub const SNAPSHOT_COLS: &[&str] = &[
    "status",
    "news",
    "now_cost",
    "selected_by_percent",
    "form",
    "event_points",
    "cost_change_event",
    "transfers_in_event",
    "transfers_out_event",
    "value_form",
    "value_season",
    "ep_next",
    "ep_this",
];

/// Season-to-date totals that are differenced between gameweeks.
pub const CUMULATIVE_COLS: &[&str] = &[
    "total_points",
    "minutes",
    "goals_scored",
    "assists",
    "clean_sheets",
    "goals_conceded",
    "own_goals",
    "penalties_saved",
    "penalties_missed",
    "yellow_cards",
    "red_cards",
    "saves",
    "starts",
    "bonus",
    "bps",
    "transfers_in",
    "transfers_out",
    "dreamteam_count",
    "expected_goals",
    "expected_assists",
    "expected_goal_involvements",
    "expected_goals_conceded",
    "influence",
    "creativity",
    "threat",
    "ict_index",
];

/// Output column order of `player_gameweek_stats.csv`.
pub fn discrete_output_columns() -> Vec<&'static str> {
    ID_COLS
        .iter()
        .chain(SNAPSHOT_COLS)
        .chain(CUMULATIVE_COLS)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gameweek_dir_round_trip() {
        assert_eq!(gameweek_dir_name(7), "GW7");
        assert_eq!(parse_gameweek_dir("GW7"), Some(7));
        assert_eq!(parse_gameweek_dir("GW38"), Some(38));
    }

    #[test]
    fn parse_gameweek_dir_rejects_noise() {
        assert_eq!(parse_gameweek_dir("GW"), None);
        assert_eq!(parse_gameweek_dir("GW-1"), None);
        assert_eq!(parse_gameweek_dir("gw3"), None);
        assert_eq!(parse_gameweek_dir("GW3a"), None);
        assert_eq!(parse_gameweek_dir(".DS_Store"), None);
    }

    #[test]
    fn only_playermatchstats_is_optional() {
        let optional: Vec<_> = TableKind::ALL.iter().filter(|k| !k.is_essential()).collect();
        assert_eq!(optional, vec![&TableKind::PlayerMatchStats]);
    }

    #[test]
    fn discrete_columns_start_with_id() {
        let cols = discrete_output_columns();
        assert_eq!(&cols[..4], ID_COLS);
        assert_eq!(cols.len(), ID_COLS.len() + SNAPSHOT_COLS.len() + CUMULATIVE_COLS.len());
    }
}
