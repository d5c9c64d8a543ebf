//! Upstream table sources, shared between `run` and `watch`.
//!
//! Blocking reqwest client (no Tokio runtime required). A source hands back
//! one whole [`Table`] per call; pagination and retries stay behind the
//! trait.

mod credentials;
mod directory;
mod error;
mod http;
mod supabase;

use std::path::PathBuf;
use std::time::Duration;

use fplsnap_core::config::{SourceConfig, SourceKind};
use fplsnap_core::{Table, TableKind};

pub use credentials::{resolve_credential, KEY_ENV, URL_ENV};
pub use directory::DirectorySource;
pub use error::SourceError;
pub use supabase::SupabaseSource;

/// Something that can produce the season tables.
pub trait TableSource {
    /// Short name recorded in logs and the manifest.
    fn name(&self) -> &str;

    fn fetch_table(&self, kind: TableKind) -> Result<Table, SourceError>;
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct SourceOverrides {
    pub kind: Option<SourceKind>,
    pub input_dir: Option<PathBuf>,
    pub url: Option<String>,
    pub key: Option<String>,
}

/// Build the configured source, resolving credentials for Supabase.
pub fn open_source(
    config: &SourceConfig,
    overrides: &SourceOverrides,
) -> Result<Box<dyn TableSource>, SourceError> {
    match overrides.kind.unwrap_or(config.kind) {
        SourceKind::Directory => {
            let dir = overrides
                .input_dir
                .clone()
                .or_else(|| config.input_dir.clone())
                .ok_or_else(|| SourceError::NotAuthenticated {
                    what: "input directory".into(),
                    flag: "--input".into(),
                    env_var: "source.input_dir in the config".into(),
                })?;
            Ok(Box::new(DirectorySource::new(dir)))
        }
        SourceKind::Supabase => {
            let url = resolve_credential(
                overrides.url.as_deref(),
                URL_ENV,
                config.url.as_deref(),
                "Supabase URL",
                "--supabase-url",
            )?;
            let key = resolve_credential(
                overrides.key.as_deref(),
                KEY_ENV,
                config.key.as_deref(),
                "Supabase key",
                "--supabase-key",
            )?;
            Ok(Box::new(SupabaseSource::new(
                &url,
                &key,
                config.page_size,
                Duration::from_secs(config.timeout_secs),
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_override_wins() {
        let config = SourceConfig::default();
        let overrides = SourceOverrides {
            kind: Some(SourceKind::Directory),
            input_dir: Some(PathBuf::from("dumps")),
            ..Default::default()
        };
        let source = open_source(&config, &overrides).unwrap();
        assert_eq!(source.name(), "directory");
    }

    #[test]
    fn directory_without_input_is_error() {
        let config = SourceConfig {
            kind: SourceKind::Directory,
            ..Default::default()
        };
        let err = open_source(&config, &SourceOverrides::default()).err().unwrap();
        assert!(err.to_string().contains("--input"), "{err}");
    }

    #[test]
    fn supabase_from_flags() {
        let overrides = SourceOverrides {
            url: Some("http://127.0.0.1:1".into()),
            key: Some("k".into()),
            ..Default::default()
        };
        let source = open_source(&SourceConfig::default(), &overrides).unwrap();
        assert_eq!(source.name(), "supabase");
    }
}
