//! One pipeline run: fetch, normalize, reconcile, slice, publish.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use fplsnap_core::{SnapshotConfig, Table, TableKind};
use fplsnap_source::TableSource;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::manifest::{Manifest, TOOL_VERSION};
use crate::model::Snapshot;
use crate::normalize::{check_essential, normalize, NormalizeStats};
use crate::publish::publish;
use crate::reconcile::{reconcile, IntegrityReport};
use crate::slice::build_views;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub season_dir: PathBuf,
    pub source: String,
    pub tables: BTreeMap<String, usize>,
    pub normalize: NormalizeStats,
    pub integrity: IntegrityReport,
    pub views: usize,
    pub files: usize,
}

/// Fetch every table. Essential tables propagate fetch errors; a failed
/// `playermatchstats` fetch degrades to an empty table.
pub fn load_snapshot(source: &dyn TableSource) -> Result<Snapshot, PipelineError> {
    let mut snapshot = Snapshot::default();
    for kind in TableKind::ALL {
        info!(table = %kind, source = source.name(), "fetching");
        let table = match source.fetch_table(kind) {
            Ok(t) => t,
            Err(e) if !kind.is_essential() => {
                warn!(table = %kind, error = %e, "optional table unavailable; continuing without it");
                Table::new(kind.upstream_name())
            }
            Err(e) => {
                return Err(PipelineError::Fetch {
                    table: kind.upstream_name().to_string(),
                    source: e,
                })
            }
        };
        snapshot.insert(kind, table);
    }
    Ok(snapshot)
}

/// Run the pipeline once and publish under `config.season_dir()`.
///
/// Nothing is written unless every stage before publishing succeeds.
pub fn run(config: &SnapshotConfig, source: &dyn TableSource) -> Result<RunSummary, PipelineError> {
    let started = Utc::now();
    info!(season = %config.season, source = source.name(), "starting snapshot run");

    let mut snapshot = load_snapshot(source)?;
    check_essential(&snapshot)?;

    let catalog = config.catalog();
    let normalize_stats = normalize(&mut snapshot, &catalog, &config.keys, &config.filter);
    let integrity = reconcile(&mut snapshot, &config.keys, &config.integrity)?;
    let views = build_views(&snapshot, &config.keys, &catalog);

    let tables: BTreeMap<String, usize> = TableKind::ALL
        .iter()
        .map(|k| (k.upstream_name().to_string(), snapshot.table(*k).len()))
        .collect();

    let manifest = Manifest {
        season: config.season.trim().to_string(),
        generated_at: started.to_rfc3339_opts(SecondsFormat::Secs, true),
        source: source.name().to_string(),
        tool_version: TOOL_VERSION.to_string(),
        tables: tables.clone(),
        normalize: normalize_stats.clone(),
        integrity: integrity.clone(),
        views: Vec::new(),
    };

    let season_dir = config.season_dir();
    let outcome = publish(&season_dir, &views, manifest)?;

    let elapsed = Utc::now().signed_duration_since(started);
    info!(
        path = %season_dir.display(),
        views = views.len(),
        files = outcome.files_written,
        elapsed_ms = elapsed.num_milliseconds(),
        "snapshot run complete"
    );

    Ok(RunSummary {
        season_dir,
        source: source.name().to_string(),
        tables,
        normalize: normalize_stats,
        integrity,
        views: views.len(),
        files: outcome.files_written,
    })
}
