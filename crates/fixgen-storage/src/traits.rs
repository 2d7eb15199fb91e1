//! The [`MeasurementStore`] trait: the contract fixture generators write
//! through.
//!
//! Generators only ever need to create an experiment, submit scoped runs,
//! patch metadata with raw statements, and introspect the schema. Anything
//! beyond that belongs to the storage engine proper.

use rusqlite::Params;

use crate::error::StorageError;
use crate::sqlite::{DataSaver, Measurement};
use crate::types::{ExperimentId, RunId};

/// The write-side contract for measurement databases.
///
/// The trait is synchronous; fixture generation is single-threaded.
pub trait MeasurementStore {
    /// Creates an experiment that subsequent runs attach to.
    fn new_experiment(&mut self, name: &str, sample_name: &str)
        -> Result<ExperimentId, StorageError>;

    /// Runs `body` inside one scoped run of `measurement`.
    ///
    /// The run row, its parameter layout and every result added through the
    /// [`DataSaver`] commit together when `body` succeeds; nothing is kept
    /// when it fails.
    fn run<E, F>(
        &mut self,
        exp: ExperimentId,
        measurement: &Measurement,
        snapshot: Option<&serde_json::Value>,
        body: F,
    ) -> Result<RunId, E>
    where
        E: From<StorageError>,
        F: FnOnce(&mut DataSaver<'_>) -> Result<(), E>;

    /// Executes one raw statement, returning the number of changed rows.
    fn execute<P: Params>(&mut self, sql: &str, params: P) -> Result<usize, StorageError>;

    /// Commits an open transaction, if any.
    fn commit(&mut self) -> Result<(), StorageError>;

    /// Whether `table` currently has a column named `column`.
    fn is_column_in_table(&self, table: &str, column: &str) -> Result<bool, StorageError>;

    /// All run ids in ascending order.
    fn run_ids(&self) -> Result<Vec<RunId>, StorageError>;
}
