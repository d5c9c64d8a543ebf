//! Tournament catalogue.
//!
//! Match ids embed a competition slug (`...-premier-league-...`). The first
//! catalogue slug contained in the id wins, so more specific slugs must come
//! before their prefixes (`premier-league` before `prem`).

use serde::{Deserialize, Serialize};

/// Matches tagged with this slug are excluded from every view.
pub const FRIENDLY_SLUG: &str = "friendly";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub slug: String,
    /// Folder name under `By Tournament/`. Derived from the slug when absent.
    #[serde(default)]
    pub name: Option<String>,
}

impl Tournament {
    pub fn new(slug: &str, name: &str) -> Self {
        Self {
            slug: slug.to_string(),
            name: Some(name.to_string()),
        }
    }

    pub fn folder_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => title_case_slug(&self.slug),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TournamentCatalog {
    entries: Vec<Tournament>,
}

impl TournamentCatalog {
    pub fn new(entries: Vec<Tournament>) -> Self {
        Self { entries }
    }

    /// Competitions the season dataset knows about, in match order.
    pub fn builtin() -> Self {
        Self::new(builtin_tournaments())
    }

    /// First entry whose slug occurs in `match_id`.
    pub fn classify(&self, match_id: &str) -> Option<&Tournament> {
        self.entries.iter().find(|t| match_id.contains(t.slug.as_str()))
    }

    pub fn get(&self, slug: &str) -> Option<&Tournament> {
        self.entries.iter().find(|t| t.slug == slug)
    }

    /// Display folder for a slug; unknown slugs are title-cased.
    pub fn folder_name(&self, slug: &str) -> String {
        self.get(slug)
            .map(Tournament::folder_name)
            .unwrap_or_else(|| title_case_slug(slug))
    }
}

impl Default for TournamentCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

pub fn builtin_tournaments() -> Vec<Tournament> {
    vec![
        Tournament::new("friendly", "Friendlies"),
        Tournament::new("premier-league", "Premier League"),
        Tournament::new("champions-league", "Champions League"),
        Tournament::new("prem", "Premier League"),
        Tournament::new("community-shield", "Community Shield"),
        Tournament::new("uefa-super-cup", "Uefa Super Cup"),
        Tournament::new("efl-cup", "EFL Cup"),
    ]
}

/// `"fa-cup"` → `"Fa Cup"`.
pub fn title_case_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_prefers_earlier_entries() {
        let cat = TournamentCatalog::builtin();
        let t = cat.classify("2025-2026-premier-league-gw1-liv-bou").unwrap();
        assert_eq!(t.slug, "premier-league");
        let t = cat.classify("prem-gw3-ars-che").unwrap();
        assert_eq!(t.slug, "prem");
        assert_eq!(t.folder_name(), "Premier League");
    }

    #[test]
    fn classify_unknown_is_none() {
        let cat = TournamentCatalog::builtin();
        assert!(cat.classify("2025-fa-cup-r3-ars-liv").is_none());
    }

    #[test]
    fn friendly_is_detected() {
        let cat = TournamentCatalog::builtin();
        assert_eq!(cat.classify("friendly-2025-07-19-ars-mil").unwrap().slug, FRIENDLY_SLUG);
    }

    #[test]
    fn folder_name_falls_back_to_title_case() {
        let cat = TournamentCatalog::builtin();
        assert_eq!(cat.folder_name("efl-cup"), "EFL Cup");
        assert_eq!(cat.folder_name("fa-cup"), "Fa Cup");
        let unnamed = Tournament { slug: "europa-LEAGUE".into(), name: None };
        assert_eq!(unnamed.folder_name(), "Europa League");
    }
}
