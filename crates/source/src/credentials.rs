use crate::error::SourceError;

pub const URL_ENV: &str = "SUPABASE_URL";
pub const KEY_ENV: &str = "SUPABASE_KEY";

/// Resolve a credential: flag value > environment variable > config file > error.
///
/// Blank values at any level count as absent, except an explicitly blank
/// flag, which is an error rather than a silent fallback.
pub fn resolve_credential(
    flag: Option<&str>,
    env_var: &str,
    config_value: Option<&str>,
    what: &str,
    flag_name: &str,
) -> Result<String, SourceError> {
    let missing = || SourceError::NotAuthenticated {
        what: what.to_string(),
        flag: flag_name.to_string(),
        env_var: env_var.to_string(),
    };

    if let Some(value) = flag {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(missing());
        }
        return Ok(trimmed.to_string());
    }

    if let Ok(value) = std::env::var(env_var) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    match config_value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(missing()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins() {
        let v = resolve_credential(Some("  k1  "), "__FPLSNAP_TEST_FLAG", Some("k3"), "key", "--key")
            .unwrap();
        assert_eq!(v, "k1");
    }

    #[test]
    fn empty_flag_is_error() {
        let err = resolve_credential(Some(" "), "__FPLSNAP_TEST_EMPTY", Some("k3"), "Supabase key", "--supabase-key")
            .unwrap_err();
        assert!(err.to_string().contains("missing Supabase key"), "{err}");
        assert!(err.to_string().contains("__FPLSNAP_TEST_EMPTY"), "{err}");
    }

    #[test]
    fn env_beats_config() {
        std::env::set_var("__FPLSNAP_TEST_ENV", "from-env");
        let v = resolve_credential(None, "__FPLSNAP_TEST_ENV", Some("from-config"), "key", "--key").unwrap();
        assert_eq!(v, "from-env");
        std::env::remove_var("__FPLSNAP_TEST_ENV");
    }

    #[test]
    fn config_is_last_resort() {
        std::env::remove_var("__FPLSNAP_TEST_CFG");
        let v = resolve_credential(None, "__FPLSNAP_TEST_CFG", Some("from-config"), "key", "--key").unwrap();
        assert_eq!(v, "from-config");
    }

    #[test]
    fn nothing_is_error() {
        std::env::remove_var("__FPLSNAP_TEST_NONE");
        let err = resolve_credential(None, "__FPLSNAP_TEST_NONE", None, "key", "--key").unwrap_err();
        assert!(matches!(err, SourceError::NotAuthenticated { .. }));
    }
}
