//! Config file lookup and command-line overrides.

use std::path::{Path, PathBuf};

use fplsnap_core::config::ViolationPolicy;
use fplsnap_core::{Error, SnapshotConfig};
use tracing::debug;

pub const LOCAL_CONFIG: &str = "fplsnap.toml";

/// Values from flags that replace config file values.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub season: Option<String>,
    pub out: Option<PathBuf>,
    pub on_violation: Option<ViolationPolicy>,
    pub times: Vec<String>,
}

/// `--config`, then `./fplsnap.toml`, then `<config dir>/fplsnap/config.toml`.
pub fn config_candidates(explicit: Option<&Path>) -> Vec<PathBuf> {
    if let Some(path) = explicit {
        return vec![path.to_path_buf()];
    }
    let mut out = vec![PathBuf::from(LOCAL_CONFIG)];
    if let Some(dir) = dirs::config_dir() {
        out.push(dir.join("fplsnap").join("config.toml"));
    }
    out
}

/// Load the first config found, or the defaults when there is none. An
/// explicit `--config` that does not exist is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<(SnapshotConfig, Option<PathBuf>), Error> {
    for path in config_candidates(explicit) {
        if !path.is_file() {
            if explicit.is_some() {
                return Err(Error::io_at(
                    &path,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
                ));
            }
            continue;
        }
        let text = std::fs::read_to_string(&path).map_err(|e| Error::io_at(&path, e))?;
        let config = SnapshotConfig::from_toml(&text)
            .map_err(|e| Error::ConfigParse(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "config loaded");
        return Ok((config, Some(path)));
    }
    debug!("no config file found; using defaults");
    Ok((SnapshotConfig::default(), None))
}

/// Apply flag values and re-validate.
pub fn apply_overrides(mut config: SnapshotConfig, overrides: &ConfigOverrides) -> Result<SnapshotConfig, Error> {
    if let Some(season) = &overrides.season {
        config.season = season.clone();
    }
    if let Some(out) = &overrides.out {
        config.output_dir = out.clone();
    }
    if let Some(policy) = overrides.on_violation {
        config.integrity.on_violation = policy;
    }
    if !overrides.times.is_empty() {
        config.schedule.times = overrides.times.clone();
    }
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.toml");
        std::fs::write(&path, "season = \"2024-2025\"\n").unwrap();
        let (config, used) = load_config(Some(&path)).unwrap();
        assert_eq!(config.season, "2024-2025");
        assert_eq!(used, Some(path));
    }

    #[test]
    fn missing_explicit_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("nope.toml"), "{err}");
    }

    #[test]
    fn invalid_config_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "season = \"\"\n").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("bad.toml"), "{err}");
    }

    #[test]
    fn overrides_replace_and_revalidate() {
        let overrides = ConfigOverrides {
            season: Some("2026-2027".into()),
            out: Some(PathBuf::from("public")),
            on_violation: Some(ViolationPolicy::Fail),
            times: vec!["06:15".into()],
        };
        let config = apply_overrides(SnapshotConfig::default(), &overrides).unwrap();
        assert_eq!(config.season_dir(), PathBuf::from("public/2026-2027"));
        assert_eq!(config.integrity.on_violation, ViolationPolicy::Fail);
        assert_eq!(config.schedule.times, vec!["06:15"]);

        let bad = ConfigOverrides {
            times: vec!["6pm".into()],
            ..Default::default()
        };
        assert!(apply_overrides(SnapshotConfig::default(), &bad).is_err());
    }
}
