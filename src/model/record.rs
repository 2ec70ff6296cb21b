//! Raw entity payloads
//!
//! A [`Record`] is the loosely-typed input an entity is manufactured from: a
//! database row, form data or hand-built test data. Scalar columns live in an
//! ordered field map; nested entities travel in a typed relations value so
//! they never need to be flattened into columns.

use crate::core::error::{MapperError, Result};
use crate::core::value::{DatabaseRow, DatabaseValue, FieldMap};
use std::fmt::Display;
use std::str::FromStr;

/// Payload for [`Entity::create`](super::Entity::create)
///
/// ```
/// use rust_data_mapper::prelude::*;
///
/// let record: Record = Record::new()
///     .with("title", "Rust for systems programmers")
///     .with("id", 3i64);
/// assert!(record.contains("title"));
/// assert_eq!(record.optional_long("id")?, Some(3));
/// # Ok::<(), MapperError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record<R = ()> {
    fields: FieldMap,
    relations: R,
}

impl Record {
    /// Empty payload without relations
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: Default> Record<R> {
    /// Wrap an existing field map
    pub fn from_fields(fields: FieldMap) -> Self {
        Self {
            fields,
            relations: R::default(),
        }
    }

    /// Copy a result row into a record
    pub fn from_row(row: &DatabaseRow) -> Self {
        Self::from_fields(row.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

impl<R: Default> From<FieldMap> for Record<R> {
    fn from(fields: FieldMap) -> Self {
        Self::from_fields(fields)
    }
}

impl<R> Record<R> {
    pub fn from_parts(fields: FieldMap, relations: R) -> Self {
        Self { fields, relations }
    }

    /// Set a field, builder style
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<DatabaseValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<DatabaseValue>) {
        self.fields.insert(key.to_string(), value.into());
    }

    /// Whether the key is present; a present `Null` counts
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&DatabaseValue> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn relations(&self) -> &R {
        &self.relations
    }

    pub fn relations_mut(&mut self) -> &mut R {
        &mut self.relations
    }

    /// Replace the relations, possibly changing their type
    pub fn with_relations<S>(self, relations: S) -> Record<S> {
        Record {
            fields: self.fields,
            relations,
        }
    }

    pub fn into_parts(self) -> (FieldMap, R) {
        (self.fields, self.relations)
    }

    /// Required string field
    ///
    /// # Errors
    ///
    /// Validation error when absent or `Null`, type mismatch for non-text values.
    pub fn string(&self, entity: &str, key: &str) -> Result<String> {
        self.optional_string(key)?
            .ok_or_else(|| MapperError::missing_field(entity, key))
    }

    /// Optional string field; absent and `Null` are `None`
    ///
    /// # Errors
    ///
    /// Type mismatch for non-text values.
    pub fn optional_string(&self, key: &str) -> Result<Option<String>> {
        match self.fields.get(key) {
            None | Some(DatabaseValue::Null) => Ok(None),
            Some(DatabaseValue::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(MapperError::type_mismatch(key, "string", other.type_name())),
        }
    }

    /// Required integer field
    ///
    /// # Errors
    ///
    /// Validation error when absent or `Null`, type mismatch when not an integer.
    pub fn long(&self, entity: &str, key: &str) -> Result<i64> {
        self.optional_long(key)?
            .ok_or_else(|| MapperError::missing_field(entity, key))
    }

    /// Optional integer field; absent and `Null` are `None`
    ///
    /// # Errors
    ///
    /// Type mismatch when the value cannot be read as an integer.
    pub fn optional_long(&self, key: &str) -> Result<Option<i64>> {
        match self.fields.get(key) {
            None | Some(DatabaseValue::Null) => Ok(None),
            Some(value) => value
                .as_long()
                .map(Some)
                .ok_or_else(|| MapperError::type_mismatch(key, "integer", value.type_name())),
        }
    }

    /// Parse a required string field into a value type
    ///
    /// # Errors
    ///
    /// Validation error naming `key` when the field is absent or does not parse.
    pub fn parse<V>(&self, entity: &str, key: &str) -> Result<V>
    where
        V: FromStr,
        V::Err: Display,
    {
        self.optional_parse(entity, key)?
            .ok_or_else(|| MapperError::missing_field(entity, key))
    }

    /// Parse an optional string field into a value type
    ///
    /// # Errors
    ///
    /// Validation error naming `key` when a present value does not parse.
    pub fn optional_parse<V>(&self, entity: &str, key: &str) -> Result<Option<V>>
    where
        V: FromStr,
        V::Err: Display,
    {
        self.optional_string(key)?
            .map(|raw| {
                raw.parse::<V>()
                    .map_err(|e| MapperError::invalid_field(entity, key, e.to_string()))
            })
            .transpose()
    }
}
