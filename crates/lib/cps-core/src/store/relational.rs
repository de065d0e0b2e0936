use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use cps_store::SqlRow;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, InterruptHandle, OpenFlags};
use serde_json::{Number, Value};
use tracing::debug;

use super::{StoreError, StoreResult};

/// Read-only handle to the `schooltoneighborhood` SQLite file.
///
/// The connection is opened once with `SQLITE_OPEN_READ_ONLY` and lives for
/// the process lifetime. Statements run on the blocking pool under a
/// configured timeout; on timeout the SQLite VM is interrupted so the
/// statement unwinds and releases its cursor before the error is returned.
pub struct SchoolDb {
    conn: Arc<Mutex<Connection>>,
    interrupt: InterruptHandle,
    path: PathBuf,
    max_rows: usize,
    timeout: Duration,
}

impl SchoolDb {
    /// Opens the relational store read-only.
    ///
    /// # Errors
    /// Returns `StoreError::Unavailable` if the file is missing or cannot
    /// be opened.
    pub fn open(path: &Path, max_rows: usize, timeout: Duration) -> StoreResult<Self> {
        if !path.is_file() {
            return Err(StoreError::Unavailable {
                path: path.to_path_buf(),
                reason: "file does not exist".to_string(),
            });
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(|err| {
            StoreError::Unavailable {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }
        })?;
        let interrupt = conn.get_interrupt_handle();
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt,
            path: path.to_path_buf(),
            max_rows,
            timeout,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs one already-guarded `SELECT` and collects its rows in
    /// backend-native order, capped at the configured row ceiling.
    ///
    /// # Errors
    /// Returns `StoreError::QuerySyntax` if the backend rejects the
    /// statement, `StoreError::Timeout` if execution exceeds the bound, and
    /// `StoreError::QueryFailed` for mid-flight failures.
    pub async fn execute_select(&self, sql: &str) -> StoreResult<Vec<SqlRow>> {
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_owned();
        let max_rows = self.max_rows;
        let mut task = tokio::task::spawn_blocking(move || run_select(&conn, &sql, max_rows));

        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(StoreError::QueryFailed(join_err.to_string())),
            Err(_) => {
                self.interrupt.interrupt();
                // Wait for the interrupted statement to unwind so the
                // cursor is released before we report the timeout.
                let _ = task.await;
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }
}

fn run_select(conn: &Mutex<Connection>, sql: &str, max_rows: usize) -> StoreResult<Vec<SqlRow>> {
    let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
    let mut stmt = conn
        .prepare(sql)
        .map_err(|err| StoreError::QuerySyntax(err.to_string()))?;
    if !stmt.readonly() {
        return Err(StoreError::QueryFailed(
            "statement compiled to a non-read-only program".to_string(),
        ));
    }
    let columns: Vec<String> = stmt.column_names().iter().map(ToString::to_string).collect();

    let mut rows = stmt
        .query([])
        .map_err(|err| StoreError::QueryFailed(err.to_string()))?;
    let mut out: Vec<SqlRow> = Vec::new();
    while let Some(row) = rows
        .next()
        .map_err(|err| StoreError::QueryFailed(err.to_string()))?
    {
        if out.len() >= max_rows {
            debug!(max_rows, "row cap reached, truncating result set");
            break;
        }
        let mut object = SqlRow::new();
        for (idx, name) in columns.iter().enumerate() {
            let value = row
                .get_ref(idx)
                .map_err(|err| StoreError::QueryFailed(err.to_string()))?;
            object.insert(name.clone(), value_ref_to_json(value));
        }
        out.push(object);
    }
    debug!(rows = out.len(), "select returned");
    Ok(out)
}

fn value_ref_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(int) => Value::Number(int.into()),
        ValueRef::Real(real) => Number::from_f64(real).map_or(Value::Null, Value::Number),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => Value::String(format!("<blob: {} bytes>", blob.len())),
    }
}
