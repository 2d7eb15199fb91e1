//! SQLite implementation of [`MeasurementStore`].
//!
//! [`SqliteStore`] writes experiments, runs and per-run result tables at a
//! fixed schema level. Columns that only exist from some level on (`guid`,
//! `run_description`) are written only when the level has them; below
//! [`SNAPSHOT_COLUMN_LEVEL`] the `snapshot` column is added the first time a
//! run carries one.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Params};
use uuid::Uuid;

use fixgen_core::{NumericArray, ValueKind};

use crate::error::StorageError;
use crate::schema::{
    column_in_table, user_version, GUID_LEVEL, RUN_DESCRIPTION_LEVEL, SNAPSHOT_COLUMN_LEVEL,
};
use crate::traits::MeasurementStore;
use crate::types::{ExperimentId, ParamSpec, RunDescription, RunId};

/// SQLite-backed measurement store at one schema level.
pub struct SqliteStore {
    conn: Connection,
    level: u32,
}

impl SqliteStore {
    /// Opens (or creates) a database at `path`, upgrading it to `level`.
    pub fn connect(path: &Path, level: u32) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path, level)?;
        tracing::debug!(path = %path.display(), level, "opened measurement store");
        Ok(SqliteStore { conn, level })
    }

    /// Opens an in-memory database at `level` (for testing).
    pub fn in_memory(level: u32) -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory(level)?;
        Ok(SqliteStore { conn, level })
    }

    /// Schema level this store writes.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// The on-disk `user_version`.
    pub fn user_version(&self) -> Result<u32, StorageError> {
        Ok(user_version(&self.conn)?)
    }

    /// Read access for assertions on written data.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs() as i64)
    }
}

/// Adds `runs.snapshot` below the level where it is always present.
fn ensure_snapshot_column(conn: &Connection) -> Result<(), StorageError> {
    if !column_in_table(conn, "runs", "snapshot")? {
        conn.execute_batch("ALTER TABLE runs ADD COLUMN snapshot TEXT")?;
        tracing::debug!("added snapshot column to runs");
    }
    Ok(())
}

/// Quotes an SQL identifier.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl MeasurementStore for SqliteStore {
    fn new_experiment(
        &mut self,
        name: &str,
        sample_name: &str,
    ) -> Result<ExperimentId, StorageError> {
        self.conn.execute(
            "INSERT INTO experiments (name, sample_name, start_time, run_counter, format_string)
             VALUES (?1, ?2, ?3, 0, '{}-{}-{}')",
            params![name, sample_name, Self::now()],
        )?;
        Ok(ExperimentId(self.conn.last_insert_rowid()))
    }

    fn run<E, F>(
        &mut self,
        exp: ExperimentId,
        measurement: &Measurement,
        snapshot: Option<&serde_json::Value>,
        body: F,
    ) -> Result<RunId, E>
    where
        E: From<StorageError>,
        F: FnOnce(&mut DataSaver<'_>) -> Result<(), E>,
    {
        let level = self.level;
        let tx = self.conn.transaction().map_err(StorageError::from)?;
        if snapshot.is_some() && level < SNAPSHOT_COLUMN_LEVEL {
            ensure_snapshot_column(&tx)?;
        }

        let (exp_name, counter): (String, i64) = tx
            .query_row(
                "SELECT name, run_counter FROM experiments WHERE exp_id = ?1",
                params![exp.0],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StorageError::ExperimentNotFound(exp.0),
                other => StorageError::from(other),
            })?;
        let counter = counter + 1;
        let table = format!("results-{}-{}", exp.0, counter);
        let parameters = measurement.names().collect::<Vec<_>>().join(",");

        let mut columns = vec![
            "exp_id",
            "name",
            "result_table_name",
            "result_counter",
            "run_timestamp",
            "is_completed",
            "parameters",
        ];
        let mut values: Vec<Value> = vec![
            Value::Integer(exp.0),
            Value::Text(exp_name),
            Value::Text(table.clone()),
            Value::Integer(0),
            Value::Integer(Self::now()),
            Value::Integer(0),
            Value::Text(parameters),
        ];
        if level >= GUID_LEVEL {
            columns.push("guid");
            values.push(Value::Text(Uuid::new_v4().to_string()));
        }
        if level >= RUN_DESCRIPTION_LEVEL {
            columns.push("run_description");
            let description = measurement.description().to_json().map_err(StorageError::from)?;
            values.push(Value::Text(description));
        }
        if let Some(snapshot) = snapshot {
            columns.push("snapshot");
            values.push(Value::Text(serde_json::to_string(snapshot).map_err(StorageError::from)?));
        }

        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        tx.execute(
            &format!(
                "INSERT INTO runs ({}) VALUES ({placeholders})",
                columns.join(", ")
            ),
            params_from_iter(values),
        )
        .map_err(StorageError::from)?;
        let run_id = RunId(tx.last_insert_rowid());

        measurement.write_layout(&tx, run_id)?;
        measurement.create_result_table(&tx, &table)?;

        let mut saver = DataSaver {
            conn: &tx,
            table,
            measurement,
            rows: 0,
        };
        body(&mut saver)?;
        let rows = saver.rows;

        tx.execute(
            "UPDATE runs SET is_completed = 1, completed_timestamp = ?1, result_counter = ?2
             WHERE run_id = ?3",
            params![Self::now(), rows as i64, run_id.0],
        )
        .map_err(StorageError::from)?;
        tx.execute(
            "UPDATE experiments SET run_counter = ?1 WHERE exp_id = ?2",
            params![counter, exp.0],
        )
        .map_err(StorageError::from)?;
        tx.commit().map_err(StorageError::from)?;

        tracing::debug!(run = %run_id, rows, "completed run");
        Ok(run_id)
    }

    fn execute<P: Params>(&mut self, sql: &str, params: P) -> Result<usize, StorageError> {
        Ok(self.conn.execute(sql, params)?)
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn is_column_in_table(&self, table: &str, column: &str) -> Result<bool, StorageError> {
        Ok(column_in_table(&self.conn, table, column)?)
    }

    fn run_ids(&self) -> Result<Vec<RunId>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT run_id FROM runs ORDER BY run_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0).map(RunId))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

/// The set of parameters a run records.
///
/// Setpoints and basis parameters must be registered before the parameters
/// that reference them.
#[derive(Debug, Clone, Default)]
pub struct Measurement {
    specs: IndexMap<String, ParamSpec>,
}

impl Measurement {
    pub fn new() -> Self {
        Measurement::default()
    }

    /// Registers one parameter.
    pub fn register_parameter(&mut self, spec: ParamSpec) -> Result<&mut Self, StorageError> {
        if self.specs.contains_key(&spec.name) {
            return Err(StorageError::DuplicateParameter(spec.name));
        }
        if let Some(missing) = spec
            .depends_on
            .iter()
            .chain(spec.inferred_from.iter())
            .find(|name| !self.specs.contains_key(name.as_str()))
        {
            return Err(StorageError::UnknownParameter(missing.clone()));
        }
        self.specs.insert(spec.name.clone(), spec);
        Ok(self)
    }

    /// Registers `name` sampled over `setpoints`.
    pub fn register_custom_parameter(
        &mut self,
        name: &str,
        kind: ValueKind,
        setpoints: &[&str],
    ) -> Result<&mut Self, StorageError> {
        self.register_parameter(ParamSpec::new(name, kind).depending_on(setpoints.iter().copied()))
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.specs.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.specs.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn description(&self) -> RunDescription {
        RunDescription::new(self.specs.values().cloned().collect())
    }

    fn write_layout(&self, conn: &Connection, run: RunId) -> Result<(), StorageError> {
        let mut layout_ids = IndexMap::with_capacity(self.specs.len());
        {
            let mut stmt = conn.prepare_cached(
                "INSERT INTO layouts (run_id, parameter, label, unit, inferred_from)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for spec in self.specs.values() {
                stmt.execute(params![
                    run.0,
                    spec.name,
                    spec.label,
                    spec.unit,
                    spec.inferred_from.join(", ")
                ])?;
                layout_ids.insert(spec.name.as_str(), conn.last_insert_rowid());
            }
        }

        let mut stmt = conn.prepare_cached(
            "INSERT INTO dependencies (dependent, independent, axis_num) VALUES (?1, ?2, ?3)",
        )?;
        for spec in self.specs.values() {
            let dependent = layout_ids[spec.name.as_str()];
            for (axis, setpoint) in spec.depends_on.iter().enumerate() {
                stmt.execute(params![dependent, layout_ids[setpoint.as_str()], axis as i64])?;
            }
        }
        Ok(())
    }

    fn create_result_table(&self, conn: &Connection, table: &str) -> Result<(), StorageError> {
        let mut columns = vec!["id INTEGER PRIMARY KEY".to_string()];
        for spec in self.specs.values() {
            let sql_type = match spec.kind {
                ValueKind::Numeric => "REAL",
                ValueKind::Array => "BLOB",
            };
            columns.push(format!("{} {sql_type}", quote_ident(&spec.name)));
        }
        conn.execute_batch(&format!(
            "CREATE TABLE {} ({});",
            quote_ident(table),
            columns.join(", ")
        ))?;
        Ok(())
    }
}

/// Result sink handed to the body of a scoped run.
pub struct DataSaver<'a> {
    conn: &'a Connection,
    table: String,
    measurement: &'a Measurement,
    rows: usize,
}

impl DataSaver<'_> {
    /// Adds one result: a value for each named parameter.
    ///
    /// Numeric parameters are unrolled one row per element, with rank-0
    /// values repeated across rows; every numeric array in the call must
    /// have the same length. Array parameters are stored whole in each row.
    pub fn add_result(&mut self, values: &[(&str, &NumericArray)]) -> Result<(), StorageError> {
        if values.is_empty() {
            return Ok(());
        }

        let mut n_rows = 1usize;
        for (name, array) in values {
            let spec = self
                .measurement
                .get(name)
                .ok_or_else(|| StorageError::UnknownParameter(name.to_string()))?;
            if spec.kind == ValueKind::Numeric && array.len() != 1 {
                if n_rows != 1 && array.len() != n_rows {
                    return Err(StorageError::ResultLengthMismatch {
                        parameter: name.to_string(),
                        expected: n_rows,
                        actual: array.len(),
                    });
                }
                n_rows = array.len();
            }
        }

        let columns = values
            .iter()
            .map(|(name, _)| quote_ident(name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=values.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = self.conn.prepare_cached(&format!(
            "INSERT INTO {} ({columns}) VALUES ({placeholders})",
            quote_ident(&self.table)
        ))?;

        let blobs: Vec<Option<Vec<u8>>> = values
            .iter()
            .map(|(name, array)| match self.measurement.get(name).map(|s| s.kind) {
                Some(ValueKind::Array) => Some(array.to_le_bytes()),
                _ => None,
            })
            .collect();

        for row in 0..n_rows {
            let row_values = values.iter().zip(&blobs).map(|((_, array), blob)| match blob {
                Some(bytes) => Value::Blob(bytes.clone()),
                None => {
                    let data = array.as_slice();
                    let index = if data.len() == 1 { 0 } else { row };
                    Value::Real(data[index])
                }
            });
            stmt.execute(params_from_iter(row_values))?;
        }

        self.rows += n_rows;
        Ok(())
    }

    /// Rows written so far in this run.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }
}
