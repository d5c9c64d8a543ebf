use std::path::PathBuf;

use fplsnap_core::{Table, TableKind};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// The six season tables of one run.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub gameweeks: Table,
    pub players: Table,
    pub playerstats: Table,
    pub teams: Table,
    pub matches: Table,
    pub playermatchstats: Table,
}

impl Snapshot {
    pub fn table(&self, kind: TableKind) -> &Table {
        match kind {
            TableKind::Gameweeks => &self.gameweeks,
            TableKind::Players => &self.players,
            TableKind::PlayerStats => &self.playerstats,
            TableKind::Teams => &self.teams,
            TableKind::Matches => &self.matches,
            TableKind::PlayerMatchStats => &self.playermatchstats,
        }
    }

    pub fn table_mut(&mut self, kind: TableKind) -> &mut Table {
        match kind {
            TableKind::Gameweeks => &mut self.gameweeks,
            TableKind::Players => &mut self.players,
            TableKind::PlayerStats => &mut self.playerstats,
            TableKind::Teams => &mut self.teams,
            TableKind::Matches => &mut self.matches,
            TableKind::PlayerMatchStats => &mut self.playermatchstats,
        }
    }

    /// Set a table, keeping its upstream name.
    pub fn insert(&mut self, kind: TableKind, mut table: Table) {
        table.name = kind.upstream_name().to_string();
        *self.table_mut(kind) = table;
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Master,
    Gameweek,
    Tournament,
}

impl std::fmt::Display for ViewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Master => write!(f, "master"),
            Self::Gameweek => write!(f, "gameweek"),
            Self::Tournament => write!(f, "tournament"),
        }
    }
}

/// One folder of the published tree and the files that go in it.
#[derive(Debug, Clone)]
pub struct View {
    pub kind: ViewKind,
    /// Relative to the season folder; empty for master.
    pub rel_dir: PathBuf,
    pub gameweek: Option<i64>,
    /// Tournament folder name.
    pub tournament: Option<String>,
    pub finished: Option<bool>,
    pub files: Vec<ViewFile>,
}

#[derive(Debug, Clone)]
pub struct ViewFile {
    pub file_name: &'static str,
    pub table: Table,
}

impl View {
    pub fn file(&self, file_name: &str) -> Option<&Table> {
        self.files
            .iter()
            .find(|f| f.file_name == file_name)
            .map(|f| &f.table)
    }
}
