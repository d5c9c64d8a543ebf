use std::collections::HashSet;
use std::path::PathBuf;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::tournament::{builtin_tournaments, Tournament, TournamentCatalog, FRIENDLY_SLUG};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default = "default_season")]
    pub season: String,
    /// Root of the published tree; the season folder lives under it.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub keys: KeyColumns,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub integrity: IntegrityConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default = "builtin_tournaments")]
    pub tournaments: Vec<Tournament>,
}

fn default_season() -> String {
    "2025-2026".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            season: default_season(),
            output_dir: default_output_dir(),
            source: SourceConfig::default(),
            keys: KeyColumns::default(),
            filter: FilterConfig::default(),
            integrity: IntegrityConfig::default(),
            schedule: ScheduleConfig::default(),
            tournaments: builtin_tournaments(),
        }
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Supabase / PostgREST over HTTP.
    #[default]
    Supabase,
    /// Local directory of `<table>.json` / `<table>.csv` dumps.
    Directory,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Supabase => write!(f, "supabase"),
            Self::Directory => write!(f, "directory"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    /// Project URL. `SUPABASE_URL` takes precedence.
    #[serde(default)]
    pub url: Option<String>,
    /// API key. `SUPABASE_KEY` takes precedence; prefer the env var.
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub input_dir: Option<PathBuf>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_page_size() -> usize {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Supabase,
            url: None,
            key: None,
            input_dir: None,
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Key columns
// ---------------------------------------------------------------------------

/// Column names of keys and references. Everything else is passed through.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeyColumns {
    pub gameweek_id: String,
    pub gameweek_finished: String,
    pub player_id: String,
    pub team_id: String,
    pub match_id: String,
    pub match_gameweek: String,
    pub home_team: String,
    pub away_team: String,
    pub pms_player: String,
    pub pms_match: String,
    pub stats_player: String,
    pub stats_gameweek: String,
}

impl Default for KeyColumns {
    fn default() -> Self {
        Self {
            gameweek_id: "id".into(),
            gameweek_finished: "finished".into(),
            player_id: "player_id".into(),
            team_id: "code".into(),
            match_id: "match_id".into(),
            match_gameweek: "gameweek".into(),
            home_team: "home_team".into(),
            away_team: "away_team".into(),
            pms_player: "player_id".into(),
            pms_match: "match_id".into(),
            stats_player: "id".into(),
            stats_gameweek: "gw".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Filter + Integrity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Drop pre-season matches tagged gameweek 0.
    pub drop_gameweek_zero: bool,
    /// Tournament slugs whose matches never reach a view.
    pub drop_tournaments: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            drop_gameweek_zero: true,
            drop_tournaments: vec![FRIENDLY_SLUG.to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationPolicy {
    /// Log and keep the offending rows.
    Warn,
    /// Remove orphaned child rows before publishing.
    #[default]
    Drop,
    /// Abort the run.
    Fail,
}

impl std::str::FromStr for ViolationPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(Self::Warn),
            "drop" => Ok(Self::Drop),
            "fail" => Ok(Self::Fail),
            other => Err(Error::config(format!(
                "unknown violation policy '{other}' (expected warn, drop or fail)"
            ))),
        }
    }
}

impl std::fmt::Display for ViolationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warn => write!(f, "warn"),
            Self::Drop => write!(f, "drop"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntegrityConfig {
    pub on_violation: ViolationPolicy,
    /// Offending keys kept per check for logs and the manifest.
    pub sample_limit: usize,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            on_violation: ViolationPolicy::Drop,
            sample_limit: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// UTC times of day, `HH:MM`.
    pub times: Vec<String>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            times: vec!["05:00".into(), "17:00".into()],
        }
    }
}

impl ScheduleConfig {
    /// Parsed, sorted and deduplicated run times.
    pub fn parsed_times(&self) -> Result<Vec<NaiveTime>, Error> {
        let mut out = Vec::with_capacity(self.times.len());
        for raw in &self.times {
            let t = NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| {
                Error::config(format!("schedule time {raw:?} is not HH:MM: {e}"))
            })?;
            out.push(t);
        }
        out.sort();
        out.dedup();
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl SnapshotConfig {
    pub fn from_toml(input: &str) -> Result<Self, Error> {
        let config: SnapshotConfig =
            toml::from_str(input).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let season = self.season.trim();
        if season.is_empty() {
            return Err(Error::config("season must not be empty"));
        }
        check_folder_name("season", season)?;

        if self.source.page_size == 0 {
            return Err(Error::config("source.page_size must be at least 1"));
        }

        let mut slugs = HashSet::new();
        for t in &self.tournaments {
            if t.slug.trim().is_empty() {
                return Err(Error::config("tournament slug must not be empty"));
            }
            if !slugs.insert(t.slug.as_str()) {
                return Err(Error::config(format!("duplicate tournament slug '{}'", t.slug)));
            }
            check_folder_name(&format!("tournament '{}' folder", t.slug), &t.folder_name())?;
        }

        let times = self.schedule.parsed_times()?;
        if times.is_empty() {
            return Err(Error::config("schedule.times must list at least one HH:MM"));
        }

        Ok(())
    }

    /// `<output_dir>/<season>`.
    pub fn season_dir(&self) -> PathBuf {
        self.output_dir.join(self.season.trim())
    }

    pub fn catalog(&self) -> TournamentCatalog {
        TournamentCatalog::new(self.tournaments.clone())
    }
}

/// Season and tournament names become folders of the published tree.
fn check_folder_name(what: &str, name: &str) -> Result<(), Error> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(Error::config(format!("{what} '{name}' must be a single folder name")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
season = "2025-2026"
output_dir = "public/data"

[source]
kind = "directory"
input_dir = "dumps"
page_size = 500

[keys]
team_id = "id"

[integrity]
on_violation = "fail"
sample_limit = 3

[schedule]
times = ["17:30", "06:00"]

[[tournaments]]
slug = "premier-league"
name = "Premier League"

[[tournaments]]
slug = "fa-cup"
"#;

    #[test]
    fn empty_input_uses_defaults() {
        let config = SnapshotConfig::from_toml("").unwrap();
        assert_eq!(config.season, "2025-2026");
        assert_eq!(config.output_dir, PathBuf::from("data"));
        assert_eq!(config.source.kind, SourceKind::Supabase);
        assert_eq!(config.source.page_size, 1000);
        assert_eq!(config.keys.team_id, "code");
        assert_eq!(config.integrity.on_violation, ViolationPolicy::Drop);
        assert_eq!(config.tournaments.len(), 7);
        assert!(config.filter.drop_gameweek_zero);
        assert_eq!(config.filter.drop_tournaments, vec!["friendly"]);
        assert_eq!(config.season_dir(), PathBuf::from("data/2025-2026"));
    }

    #[test]
    fn parse_full() {
        let config = SnapshotConfig::from_toml(FULL).unwrap();
        assert_eq!(config.source.kind, SourceKind::Directory);
        assert_eq!(config.source.input_dir, Some(PathBuf::from("dumps")));
        assert_eq!(config.source.page_size, 500);
        assert_eq!(config.keys.team_id, "id");
        // Unspecified keys keep their defaults
        assert_eq!(config.keys.stats_gameweek, "gw");
        assert_eq!(config.integrity.on_violation, ViolationPolicy::Fail);
        assert_eq!(config.integrity.sample_limit, 3);
        let times = config.schedule.parsed_times().unwrap();
        assert_eq!(times[0].to_string(), "06:00:00");
        assert_eq!(times[1].to_string(), "17:30:00");
        let cat = config.catalog();
        assert_eq!(cat.folder_name("fa-cup"), "Fa Cup");
    }

    #[test]
    fn reject_bad_schedule_time() {
        let err = SnapshotConfig::from_toml("[schedule]\ntimes = [\"25:00\"]").unwrap_err();
        assert!(err.to_string().contains("25:00"), "{err}");
    }

    #[test]
    fn reject_empty_schedule() {
        let err = SnapshotConfig::from_toml("[schedule]\ntimes = []").unwrap_err();
        assert!(err.to_string().contains("at least one"), "{err}");
    }

    #[test]
    fn reject_nested_season() {
        let err = SnapshotConfig::from_toml("season = \"../etc\"").unwrap_err();
        assert!(err.to_string().contains("single folder"), "{err}");
    }

    #[test]
    fn reject_tournament_folder_outside_tree() {
        let named = "[[tournaments]]\nslug = \"cup\"\nname = \"../outside\"\n";
        let err = SnapshotConfig::from_toml(named).unwrap_err();
        assert!(err.to_string().contains("'../outside' must be a single folder"), "{err}");

        let from_slug = "[[tournaments]]\nslug = \"a/b\"\n";
        let err = SnapshotConfig::from_toml(from_slug).unwrap_err();
        assert!(err.to_string().contains("single folder"), "{err}");

        let dots = "[[tournaments]]\nslug = \"cup\"\nname = \"..\"\n";
        assert!(SnapshotConfig::from_toml(dots).is_err());
    }

    #[test]
    fn reject_duplicate_slug() {
        let input = r#"
[[tournaments]]
slug = "prem"
[[tournaments]]
slug = "prem"
"#;
        let err = SnapshotConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("duplicate tournament slug"), "{err}");
    }

    #[test]
    fn reject_unknown_policy() {
        let err = SnapshotConfig::from_toml("[integrity]\non_violation = \"ignore\"");
        assert!(err.is_err());
        assert!("ignore".parse::<ViolationPolicy>().is_err());
        assert_eq!("DROP".parse::<ViolationPolicy>().unwrap(), ViolationPolicy::Drop);
    }

    #[test]
    fn reject_zero_page_size() {
        let err = SnapshotConfig::from_toml("[source]\npage_size = 0").unwrap_err();
        assert!(err.to_string().contains("page_size"), "{err}");
    }
}
