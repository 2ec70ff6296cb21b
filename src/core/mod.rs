//! Core data-mapper types and traits
//!
//! This module provides the fundamental building blocks: error types, the
//! database trait, value types, statement builders, transactions and
//! connection configuration.

pub mod config;
pub mod database;
pub mod error;
pub mod query_builder;
pub mod timestamp;
pub mod transaction;
pub mod value;

// Re-export commonly used types
pub use config::ConnectionConfig;
pub use database::{Database, Execution};
pub use error::{MapperError, Result};
pub use query_builder::{
    DeleteBuilder, InsertBuilder, OrderBy, OrderDirection, SelectBuilder, SelectOptions,
    StatementKind, UpdateBuilder,
};
pub use transaction::{TransactionGuard, TransactionState};
pub use value::{DatabaseResult, DatabaseRow, DatabaseValue, FieldMap};
