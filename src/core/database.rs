//! Database trait
//!
//! This module defines the connection contract every backend implements. A
//! backend only supplies raw statement execution and transaction control; the
//! CRUD statements and the transactional unit-of-work are provided on top of it.

use super::error::{MapperError, Result};
use super::query_builder::{DeleteBuilder, InsertBuilder, SelectBuilder, SelectOptions, UpdateBuilder};
use super::transaction::TransactionGuard;
use super::value::{DatabaseResult, DatabaseRow, FieldMap};

/// Outcome of executing a raw statement, chosen by its shape
#[derive(Debug, Clone, PartialEq)]
pub enum Execution {
    /// INSERT / UPDATE: the affected row, `None` when nothing was touched
    Row(Option<DatabaseRow>),
    /// SELECT: all rows
    Rows(DatabaseResult),
    /// Any other statement
    Done(bool),
}

impl Execution {
    /// Rows of a SELECT, or the single returned row of a write
    pub fn into_rows(self) -> DatabaseResult {
        match self {
            Execution::Rows(rows) => rows,
            Execution::Row(Some(row)) => vec![row],
            Execution::Row(None) | Execution::Done(_) => Vec::new(),
        }
    }

    /// The single row of an INSERT / UPDATE, or the first row of a SELECT
    pub fn into_row(self) -> Option<DatabaseRow> {
        match self {
            Execution::Row(row) => row,
            Execution::Rows(rows) => rows.into_iter().next(),
            Execution::Done(_) => None,
        }
    }
}

/// Core database trait that all database backends must implement
///
/// Calls block until the store replies. Implementations must be safe to share
/// between threads, but a transaction belongs to the thread that opened it.
pub trait Database: Send + Sync {
    /// Execute one statement with named parameters
    ///
    /// Parameter names are column names without the leading `:`.
    /// INSERT/UPDATE return the affected row, SELECT returns all rows and
    /// anything else returns a success flag.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when preparing or running the statement fails.
    fn execute(&self, sql: &str, params: &FieldMap) -> Result<Execution>;

    /// Execute a batch of statements without parameters (schema, seed data)
    ///
    /// # Errors
    ///
    /// Returns a persistence error on the first failing statement.
    fn execute_script(&self, sql: &str) -> Result<()>;

    /// Begin a transaction
    ///
    /// # Errors
    ///
    /// Fails when a transaction is already active.
    fn begin_transaction(&self) -> Result<()>;

    /// Commit the current transaction
    ///
    /// # Errors
    ///
    /// Fails when no transaction is active or the store rejects the commit.
    fn commit(&self) -> Result<()>;

    /// Rollback the current transaction
    ///
    /// # Errors
    ///
    /// Fails when no transaction is active.
    fn rollback(&self) -> Result<()>;

    /// Check if currently in a transaction
    fn in_transaction(&self) -> bool;

    /// Run `f` while holding the connection exclusively
    ///
    /// Other threads block until `f` returns. The default does no locking.
    fn exclusive<R, F>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        f()
    }

    /// Insert a row and return it as stored (server-assigned id and defaults)
    ///
    /// # Errors
    ///
    /// Returns a persistence error on constraint violation, connectivity
    /// failure, or when the store returns no row.
    fn insert(&self, table: &str, fields: &FieldMap) -> Result<DatabaseRow> {
        let builder = InsertBuilder::new(table).values(fields);
        self.execute(&builder.build(), &builder.params())?
            .into_row()
            .ok_or_else(|| {
                MapperError::persistence(None, format!("Insert into {} returned no row", table))
            })
    }

    /// Update matching rows and return the first one as stored
    ///
    /// `id` is never written. `Ok(None)` means no row matched.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on constraint violation or connectivity failure.
    fn update(
        &self,
        table: &str,
        fields: &FieldMap,
        conditions: &FieldMap,
    ) -> Result<Option<DatabaseRow>> {
        let builder = UpdateBuilder::new(table)
            .set_all(fields)
            .conditions(conditions);
        let sql = builder.build()?;
        Ok(self.execute(&sql, &builder.params())?.into_row())
    }

    /// Select rows matching every condition
    ///
    /// An empty `fields` list selects `*`. No match is an empty vector.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when the query fails.
    fn select(
        &self,
        table: &str,
        conditions: &FieldMap,
        fields: &[&str],
        options: &SelectOptions,
    ) -> Result<DatabaseResult> {
        let builder = SelectBuilder::new(table)
            .columns(fields)
            .conditions(conditions)
            .options(options);
        Ok(self.execute(&builder.build(), &builder.params())?.into_rows())
    }

    /// Delete rows matching every condition
    ///
    /// Deleting rows that do not exist is not an error.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when the statement fails.
    fn delete(&self, table: &str, conditions: &FieldMap) -> Result<()> {
        let builder = DeleteBuilder::new(table).conditions(conditions);
        let sql = builder.build()?;
        self.execute(&sql, &builder.params())?;
        Ok(())
    }

    /// Run a unit of work inside a transaction
    ///
    /// Commits when `f` returns `Ok`. When `f` fails the transaction is rolled
    /// back and the error from `f` is returned unchanged.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_data_mapper::prelude::*;
    ///
    /// let db = SqliteDatabase::open_in_memory()?;
    /// db.execute_script("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)")?;
    ///
    /// let failed: Result<()> = db.transactional(|db| {
    ///     db.insert("notes", &fields! { "body" => "draft" })?;
    ///     Err(MapperError::query("abort"))
    /// });
    /// assert!(matches!(failed, Err(MapperError::QueryError(_))));
    /// assert!(db.select("notes", &fields! {}, &[], &SelectOptions::new())?.is_empty());
    /// # Ok::<(), MapperError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or a transaction error when begin or commit fails.
    fn transactional<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        Self: Sized,
        F: FnOnce(&Self) -> std::result::Result<T, E>,
        E: From<MapperError>,
    {
        self.exclusive(|| {
            let guard = TransactionGuard::begin(self)?;
            match f(self) {
                Ok(value) => {
                    guard.commit()?;
                    Ok(value)
                }
                Err(err) => {
                    if let Err(rollback_err) = guard.rollback() {
                        tracing::error!(error = %rollback_err, "rollback failed");
                    }
                    Err(err)
                }
            }
        })
    }
}
