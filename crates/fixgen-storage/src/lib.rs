//! SQLite measurement store used to materialize fixture databases.
//!
//! Provides the [`MeasurementStore`] trait, the narrow "register parameter /
//! add result / commit run" contract fixture generators write through, and
//! [`SqliteStore`], a backend that lays out the storage format at a chosen
//! schema level.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`types`]: ids, parameter specs and run descriptions
//! - [`traits`]: MeasurementStore trait definition
//! - [`schema`]: base schema, per-level migrations and connection setup
//! - [`sqlite`]: SqliteStore, Measurement and DataSaver

pub mod error;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod types;

// Re-export key types for ergonomic use.
pub use error::StorageError;
pub use schema::{LATEST_LEVEL, SNAPSHOT_COLUMN_LEVEL};
pub use sqlite::{DataSaver, Measurement, SqliteStore};
pub use traits::MeasurementStore;
pub use types::{ExperimentId, InterDependencies, ParamSpec, RunDescription, RunId};
