//! # Rust Data Mapper
//!
//! A small synchronous data-mapper persistence layer. Domain objects stay plain
//! Rust structs; mappers translate them to and from SQL rows.
//!
//! ## Features
//!
//! - **Typed entities**: every entity is built by one factory that checks
//!   required fields, derives timestamps, then hydrates typed fields
//! - **Type-checked collections**: `Collection<T>` only accepts `T` or payloads `T` can be built from
//! - **Generic CRUD**: `Repository` provides find / find_by / save / delete for any entity
//! - **Aggregates from joins**: one-to-many graphs rebuilt from a flat, ordered join
//! - **Transactions**: closure-based unit of work with rollback on error, plus an RAII guard
//! - **Thread Safety**: one connection shared behind a `parking_lot` reentrant mutex
//!
//! ## Error policy
//!
//! Construction errors and single-entity reads fail hard. All writes fail
//! hard. Collection reads (`find_by`, `find_all` and the ticketing lookups) log
//! store failures with `tracing` and return an empty collection instead.
//!
//! ## Quick Start
//!
//! ```rust
//! use rust_data_mapper::prelude::*;
//! use rust_data_mapper::ticketing::{Workshop, WorkshopMapper};
//! use std::sync::Arc;
//!
//! let db = Arc::new(SqliteDatabase::open_in_memory()?);
//! db.execute_script(
//!     "CREATE TABLE workshops (id INTEGER PRIMARY KEY, title TEXT NOT NULL, \
//!      created_at TEXT NOT NULL, updated_at TEXT NOT NULL)",
//! )?;
//!
//! let workshops = WorkshopMapper::new(Arc::clone(&db));
//! let saved = workshops.save(&Workshop::create(Record::new().with("title", "Macros"))?)?;
//!
//! let found = workshops.find(saved.id().unwrap(), None)?.expect("stored");
//! assert_eq!(found.title(), "Macros");
//!
//! workshops.delete(&found)?;
//! workshops.delete(&found)?; // idempotent
//! assert!(workshops.find_all(&SelectOptions::new())?.is_empty());
//! # Ok::<(), MapperError>(())
//! ```
//!
//! ### Working with Transactions
//!
//! ```rust
//! use rust_data_mapper::prelude::*;
//!
//! let db = SqliteDatabase::open_in_memory()?;
//! db.execute_script("CREATE TABLE accounts (id INTEGER PRIMARY KEY, balance REAL NOT NULL)")?;
//!
//! let result: Result<()> = db.transactional(|db| {
//!     db.insert("accounts", &fields! { "balance" => 100.0 })?;
//!     db.insert("accounts", &fields! { "balance" => DatabaseValue::Null })?;
//!     Ok(())
//! });
//!
//! assert!(matches!(result, Err(MapperError::Persistence { .. })));
//! assert!(db.select("accounts", &fields! {}, &[], &SelectOptions::new())?.is_empty());
//! # Ok::<(), MapperError>(())
//! ```
//!
//! ## Project Structure
//!
//! ```text
//! rust_data_mapper/
//! ├── src/
//! │   ├── core/              # Values, errors, SQL builders, Database trait, transactions
//! │   ├── backends/          # SQLite implementation
//! │   ├── model/             # Entity, Record, Collection
//! │   ├── mapper/            # Repository, Mapper, join regrouping
//! │   ├── ticketing/         # Users, workshops and tickets
//! │   └── lib.rs
//! ├── tests/                 # Integration and property tests, SQL fixtures
//! ├── benches/               # Criterion benchmarks
//! └── Cargo.toml
//! ```

/// Core types and traits
pub mod core;

/// Database backend implementations
pub mod backends;

/// Entity base, payloads and collections
pub mod model;

/// Generic data mapper
pub mod mapper;

/// Reference domain: users, workshops and tickets
pub mod ticketing;

/// Prelude for convenient imports
///
/// ```rust
/// use rust_data_mapper::prelude::*;
///
/// let db = SqliteDatabase::open_in_memory()?;
/// assert!(!db.in_transaction());
/// # Ok::<(), MapperError>(())
/// ```
pub mod prelude {
    pub use crate::backends::SqliteDatabase;
    pub use crate::core::{
        ConnectionConfig, Database, DatabaseResult, DatabaseRow, DatabaseValue, Execution,
        FieldMap, MapperError, OrderBy, OrderDirection, Result, SelectOptions, TransactionGuard,
    };
    pub use crate::fields;
    pub use crate::mapper::{Mapper, PrimaryKey, Repository};
    pub use crate::model::{Access, Collection, Element, Entity, EntityBase, Record};
}

// Re-export at root level for convenience
pub use crate::backends::SqliteDatabase;
pub use crate::core::{
    ConnectionConfig, Database, DatabaseResult, DatabaseRow, DatabaseValue, Execution, FieldMap,
    MapperError, Result, SelectOptions, TransactionGuard,
};
pub use crate::mapper::{Mapper, Repository};
pub use crate::model::{Collection, Entity, Record};
