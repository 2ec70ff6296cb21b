//! Transaction guard for automatic rollback on drop
//!
//! This module provides RAII-style transaction management with automatic rollback.

use super::database::Database;
use super::error::{MapperError, Result};
use std::cell::Cell;

/// Lifecycle of a transaction
///
/// ```text
/// Idle ──begin──> InTransaction ──commit──> Committed
///                       │
///                       └──rollback / drop──> RolledBack
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    InTransaction,
    Committed,
    RolledBack,
}

/// Transaction guard that automatically rolls back on drop if not committed
///
/// This provides RAII-style transaction management to prevent accidental
/// transaction leaks. If the guard is dropped without calling `commit()`,
/// the transaction will be automatically rolled back.
///
/// # Example
///
/// ```
/// use rust_data_mapper::prelude::*;
///
/// let db = SqliteDatabase::open_in_memory()?;
/// db.execute_script("CREATE TABLE accounts (id INTEGER PRIMARY KEY, balance REAL)")?;
///
/// let tx = TransactionGuard::begin(&db)?;
/// db.insert("accounts", &fields! { "balance" => 100.0 })?;
/// tx.commit()?;
///
/// {
///     let _tx = TransactionGuard::begin(&db)?;
///     db.insert("accounts", &fields! { "balance" => 5.0 })?;
///     // dropped without commit: rolled back
/// }
/// assert_eq!(db.select("accounts", &fields! {}, &[], &SelectOptions::new())?.len(), 1);
/// # Ok::<(), MapperError>(())
/// ```
pub struct TransactionGuard<'db, D: Database + ?Sized> {
    db: &'db D,
    state: Cell<TransactionState>,
}

impl<'db, D: Database + ?Sized> TransactionGuard<'db, D> {
    /// Begin a new transaction
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A transaction is already active
    /// - Database operation fails
    pub fn begin(db: &'db D) -> Result<Self> {
        db.begin_transaction()?;

        Ok(Self {
            db,
            state: Cell::new(TransactionState::InTransaction),
        })
    }

    /// Commit the transaction
    ///
    /// After calling this method, the transaction is complete and the guard
    /// will not perform automatic rollback on drop. If the commit itself
    /// fails the guard stays active and rolls back when dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails
    pub fn commit(self) -> Result<()> {
        self.ensure_active("commit")?;
        self.db.commit()?;
        self.state.set(TransactionState::Committed);
        Ok(())
    }

    /// Explicitly rollback the transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails
    pub fn rollback(self) -> Result<()> {
        self.ensure_active("rollback")?;
        // Whatever the store answers, the guard must not retry on drop
        self.state.set(TransactionState::RolledBack);
        self.db.rollback()
    }

    /// Current lifecycle state
    pub fn state(&self) -> TransactionState {
        self.state.get()
    }

    fn ensure_active(&self, action: &str) -> Result<()> {
        match self.state.get() {
            TransactionState::InTransaction => Ok(()),
            other => Err(MapperError::transaction(format!(
                "Cannot {} a transaction in state {:?}",
                action, other
            ))),
        }
    }
}

impl<D: Database + ?Sized> Drop for TransactionGuard<'_, D> {
    fn drop(&mut self) {
        if self.state.get() == TransactionState::InTransaction {
            self.state.set(TransactionState::RolledBack);
            tracing::warn!("transaction guard dropped without commit, rolling back");
            if let Err(e) = self.db.rollback() {
                tracing::error!(error = %e, "automatic rollback failed");
            }
        }
    }
}
