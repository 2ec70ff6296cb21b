//! SQLite backend
//!
//! One rusqlite connection shared behind a reentrant lock, plus the value
//! conversions between [`DatabaseValue`] and SQLite storage classes.

use crate::core::{
    config::ConnectionConfig, database::Database, database::Execution, error::MapperError,
    error::Result, query_builder::StatementKind, value::DatabaseRow, value::DatabaseValue,
    value::FieldMap,
};
use parking_lot::ReentrantMutex;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{Connection, Row, ToSql};

/// Database handle over a single SQLite connection
///
/// Holds one connection. Every statement locks it; [`Database::exclusive`]
/// keeps it locked across a whole unit of work. The lock is reentrant, so the
/// thread running a transaction can keep issuing statements.
///
/// Transaction state is read from the connection itself (autocommit mode),
/// so a rollback SQLite performs on its own is seen immediately.
pub struct SqliteDatabase {
    connection: ReentrantMutex<Connection>,
}

impl SqliteDatabase {
    /// Open a database with the given configuration
    ///
    /// # Errors
    ///
    /// Returns a persistence error when the file cannot be opened or a
    /// connection setting is rejected.
    pub fn open(config: &ConnectionConfig) -> Result<Self> {
        let conn = if config.is_in_memory() {
            Connection::open_in_memory()?
        } else {
            Connection::open(&config.path)?
        };

        conn.busy_timeout(config.busy_timeout())?;
        conn.execute_batch(if config.foreign_keys {
            "PRAGMA foreign_keys = ON"
        } else {
            "PRAGMA foreign_keys = OFF"
        })?;

        tracing::debug!(path = %config.path, foreign_keys = config.foreign_keys, "database opened");

        Ok(Self {
            connection: ReentrantMutex::new(conn),
        })
    }

    /// Open a private in-memory database with default settings
    ///
    /// # Errors
    ///
    /// Returns a persistence error when SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&ConnectionConfig::in_memory())
    }

    /// Named parameters as rusqlite expects them (`:name`)
    fn bind(params: &FieldMap) -> Vec<(String, &DatabaseValue)> {
        params
            .iter()
            .map(|(name, value)| {
                let name = if name.starts_with([':', '@', '$']) {
                    name.clone()
                } else {
                    format!(":{}", name)
                };
                (name, value)
            })
            .collect()
    }

    /// Run BEGIN / COMMIT / ROLLBACK after checking the connection is in
    /// the expected transaction state
    fn transition(&self, sql: &str, in_transaction: bool) -> Result<()> {
        let conn = self.connection.lock();
        if conn.is_autocommit() == in_transaction {
            return Err(MapperError::transaction(if in_transaction {
                "Not in a transaction"
            } else {
                "Already in a transaction"
            }));
        }
        conn.execute_batch(sql)?;
        Ok(())
    }
}

impl Database for SqliteDatabase {
    fn execute(&self, sql: &str, params: &FieldMap) -> Result<Execution> {
        tracing::debug!(sql = %sql, params = params.len(), "Db::execute");

        let conn = self.connection.lock();
        let bound = Self::bind(params);
        let named: Vec<(&str, &dyn ToSql)> = bound
            .iter()
            .map(|(name, value)| (name.as_str(), *value as &dyn ToSql))
            .collect();

        let mut stmt = conn.prepare(sql)?;
        let execution = match StatementKind::of(sql) {
            StatementKind::Returning => {
                let mut rows = stmt.query(named.as_slice())?;
                let row = match rows.next()? {
                    Some(row) => Some(read_row(row)?),
                    None => None,
                };
                Execution::Row(row)
            }
            StatementKind::Query => {
                let rows = stmt
                    .query_map(named.as_slice(), read_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Execution::Rows(rows)
            }
            StatementKind::Command => {
                // Step through the statement so commands that yield rows
                // (pragmas, RETURNING) still run to completion
                let mut rows = stmt.query(named.as_slice())?;
                while rows.next()?.is_some() {}
                Execution::Done(true)
            }
        };

        Ok(execution)
    }

    fn execute_script(&self, sql: &str) -> Result<()> {
        tracing::debug!(bytes = sql.len(), "Db::execute_script");
        let conn = self.connection.lock();
        conn.execute_batch(sql)?;
        Ok(())
    }

    fn begin_transaction(&self) -> Result<()> {
        self.transition("BEGIN TRANSACTION", false)
    }

    fn commit(&self) -> Result<()> {
        self.transition("COMMIT", true)
    }

    /// Succeeds without SQL when SQLite already rolled back on its own
    /// (`ON CONFLICT ROLLBACK`, `RAISE(ROLLBACK)`, I/O errors)
    fn rollback(&self) -> Result<()> {
        let conn = self.connection.lock();
        if conn.is_autocommit() {
            tracing::debug!("transaction already rolled back by the store");
            return Ok(());
        }
        conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        !self.connection.lock().is_autocommit()
    }

    fn exclusive<R, F>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = self.connection.lock();
        f()
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<DatabaseRow> {
    let names = row.as_ref().column_names();
    names
        .iter()
        .enumerate()
        .map(|(index, name)| -> rusqlite::Result<(String, DatabaseValue)> {
            Ok((name.to_string(), decode(row.get_ref(index)?)))
        })
        .collect()
}

fn decode(value: ValueRef<'_>) -> DatabaseValue {
    match value {
        ValueRef::Null => DatabaseValue::Null,
        ValueRef::Integer(v) => DatabaseValue::Long(v),
        ValueRef::Real(v) => DatabaseValue::Double(v),
        ValueRef::Text(bytes) => DatabaseValue::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => DatabaseValue::Bytes(bytes.to_vec()),
    }
}

/// Booleans bind as 0/1 and floats widen to REAL
impl ToSql for DatabaseValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            DatabaseValue::Null => ToSqlOutput::Owned(Value::Null),
            DatabaseValue::Bool(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
            DatabaseValue::Int(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
            DatabaseValue::Long(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            DatabaseValue::Float(v) => ToSqlOutput::Owned(Value::Real(f64::from(*v))),
            DatabaseValue::Double(v) => ToSqlOutput::Owned(Value::Real(*v)),
            DatabaseValue::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            DatabaseValue::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl Drop for SqliteDatabase {
    fn drop(&mut self) {
        let conn = self.connection.get_mut();
        if !conn.is_autocommit() {
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                tracing::warn!(error = %e, "rollback on close failed");
            }
        }
    }
}
