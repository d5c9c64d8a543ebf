//! `fplsnap-core`: shared model for the season snapshot pipeline.
//!
//! Tables and records, schema constants, the tournament catalogue, the
//! TOML config, and the CSV codec. No network concerns.

pub mod config;
pub mod csv_io;
pub mod error;
pub mod schema;
pub mod table;
pub mod tournament;

pub use config::SnapshotConfig;
pub use error::{Error, Result};
pub use schema::TableKind;
pub use table::{Record, Table};
pub use tournament::{Tournament, TournamentCatalog};
