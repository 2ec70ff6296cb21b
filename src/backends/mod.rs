//! Database backend implementations
//!
//! This module contains concrete implementations of the Database trait.

pub mod sqlite;

pub use sqlite::SqliteDatabase;
