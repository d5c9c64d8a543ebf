//! `fplsnap-pipeline`: normalize, reconcile, slice and publish.
//!
//! Receives tables from a [`fplsnap_source::TableSource`] and writes the
//! season tree. Also reads published trees back for `validate` and
//! `deltas`.

pub mod deltas;
pub mod discrete;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod model;
pub mod normalize;
pub mod publish;
pub mod reconcile;
pub mod slice;
pub mod tree;
pub mod validate;

pub use deltas::{recompute_deltas, DeltaSummary};
pub use engine::{load_snapshot, run, RunSummary};
pub use error::PipelineError;
pub use manifest::Manifest;
pub use model::{Snapshot, View, ViewKind};
pub use reconcile::IntegrityReport;
pub use validate::{validate_tree, Finding, ValidationReport};
