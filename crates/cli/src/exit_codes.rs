//! CLI Exit Code Registry
//!
//! Single source of truth for `fplsnap` exit codes. Schedulers and cron
//! wrappers branch on them, so they are part of the shell contract.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain     | Description                                   |
//! |---------|------------|-----------------------------------------------|
//! | 0       | Universal  | Success                                       |
//! | 1       | Universal  | General error (unspecified)                   |
//! | 2       | Universal  | Usage error (bad args, bad config)            |
//! | 3       | Universal  | I/O error reading or writing the tree         |
//! | 50-59   | fetch      | Upstream source failures                      |
//! | 60-69   | snapshot   | Data-level failures of a run or a tree        |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Map it in `main.rs`

use fplsnap_core::Error as CoreError;
use fplsnap_pipeline::PipelineError;
use fplsnap_source::SourceError;

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success.
pub const EXIT_SUCCESS: u8 = 0;

/// General error. Prefer a specific code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error: bad arguments, unreadable or invalid config.
pub const EXIT_USAGE: u8 = 2;

/// Filesystem error while reading dumps or writing the tree.
pub const EXIT_IO: u8 = 3;

// =============================================================================
// Fetch (50-59)
// =============================================================================

/// No credential supplied (flag, env var or config).
pub const EXIT_FETCH_NOT_AUTH: u8 = 50;

/// Credentials rejected by upstream (401/403).
pub const EXIT_FETCH_AUTH: u8 = 51;

/// Request rejected by upstream (400).
pub const EXIT_FETCH_VALIDATION: u8 = 52;

/// Still rate limited after retries (429).
pub const EXIT_FETCH_RATE_LIMIT: u8 = 53;

/// 5xx, network failure or malformed response after retries.
pub const EXIT_FETCH_UPSTREAM: u8 = 54;

// =============================================================================
// Snapshot (60-69)
// =============================================================================

/// Referential integrity violated with `on_violation = "fail"`.
pub const EXIT_INTEGRITY: u8 = 60;

/// `validate` found inconsistencies in a published tree.
pub const EXIT_VALIDATION_FINDINGS: u8 = 61;

/// An essential table came back empty.
pub const EXIT_EMPTY_TABLE: u8 = 62;

// =============================================================================
// Error mapping
// =============================================================================

pub fn source_exit_code(err: &SourceError) -> u8 {
    match err {
        SourceError::NotAuthenticated { .. } => EXIT_FETCH_NOT_AUTH,
        SourceError::Auth { .. } => EXIT_FETCH_AUTH,
        SourceError::Validation { .. } => EXIT_FETCH_VALIDATION,
        SourceError::RateLimited { .. } => EXIT_FETCH_RATE_LIMIT,
        SourceError::Upstream { .. } => EXIT_FETCH_UPSTREAM,
        SourceError::Io { .. } => EXIT_IO,
        SourceError::Parse { .. } => EXIT_ERROR,
    }
}

pub fn core_exit_code(err: &CoreError) -> u8 {
    match err {
        CoreError::ConfigParse(_) | CoreError::ConfigValidation(_) => EXIT_USAGE,
        CoreError::EmptyTable(_) => EXIT_EMPTY_TABLE,
        CoreError::Integrity(_) => EXIT_INTEGRITY,
        CoreError::IoAt { .. } | CoreError::Io(_) => EXIT_IO,
        CoreError::Data(_) | CoreError::Csv(_) | CoreError::Json(_) => EXIT_ERROR,
    }
}

pub fn pipeline_exit_code(err: &PipelineError) -> u8 {
    match err {
        PipelineError::Fetch { source, .. } => source_exit_code(source),
        PipelineError::Core(e) => core_exit_code(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_errors_map_into_fetch_range() {
        let err = SourceError::Auth {
            source_name: "supabase".into(),
            status: 401,
            message: "bad key".into(),
        };
        assert_eq!(source_exit_code(&err), EXIT_FETCH_AUTH);

        let wrapped = PipelineError::Fetch {
            table: "players".into(),
            source: SourceError::RateLimited {
                source_name: "supabase".into(),
                attempts: 4,
            },
        };
        assert_eq!(pipeline_exit_code(&wrapped), EXIT_FETCH_RATE_LIMIT);
    }

    #[test]
    fn snapshot_errors_have_dedicated_codes() {
        assert_eq!(core_exit_code(&CoreError::integrity("x")), EXIT_INTEGRITY);
        assert_eq!(core_exit_code(&CoreError::EmptyTable("teams".into())), EXIT_EMPTY_TABLE);
        assert_eq!(core_exit_code(&CoreError::config("x")), EXIT_USAGE);
        assert_eq!(
            pipeline_exit_code(&PipelineError::Core(CoreError::io_at(
                "data",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            ))),
            EXIT_IO
        );
    }
}
