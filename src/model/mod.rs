//! Entity base
//!
//! Every persisted type implements [`Entity`]. Instances are only built
//! through [`Entity::create`], which runs the same sequence for every type:
//!
//! ```text
//! Record ──required fields──> checked ──timestamps──> base ──hydrate──> entity
//! ```
//!
//! Any failing step aborts construction; no partial entity is observable.

pub mod collection;
pub mod record;

pub use collection::{Collection, Element};
pub use record::Record;

use crate::core::error::{MapperError, Result};
use crate::core::timestamp;
use crate::core::value::{DatabaseValue, FieldMap};
use chrono::{DateTime, TimeZone, Utc};

/// Columns every entity carries
pub const BASE_FIELDS: [&str; 3] = ["id", "created_at", "updated_at"];

/// Identity and timestamps shared by all entities
///
/// Fixed at construction; there are no setters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityBase {
    id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EntityBase {
    /// Read `id`, `created_at` and `updated_at` from a payload
    ///
    /// Absent or `Null` timestamps default to now, independently.
    fn from_record<R>(entity: &str, record: &Record<R>) -> Result<Self> {
        let id = record.optional_long("id")?;
        let stamp = |field: &str| match record.get(field) {
            None | Some(DatabaseValue::Null) => Ok(timestamp::now_utc()),
            Some(value) => timestamp::timestamp_from(entity, field, value),
        };

        Ok(Self {
            id,
            created_at: stamp("created_at")?,
            updated_at: stamp("updated_at")?,
        })
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Creation time as Unix seconds (UTC)
    pub fn created_at(&self) -> i64 {
        self.created_at.timestamp()
    }

    /// Last update time as Unix seconds (UTC)
    pub fn updated_at(&self) -> i64 {
        self.updated_at.timestamp()
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Creation time in the given time zone
    pub fn created_in<Tz: TimeZone>(&self, tz: &Tz) -> DateTime<Tz> {
        self.created_at.with_timezone(tz)
    }

    /// Last update time in the given time zone
    pub fn updated_in<Tz: TimeZone>(&self, tz: &Tz) -> DateTime<Tz> {
        self.updated_at.with_timezone(tz)
    }

    /// Persisted form of the base columns; `id` only once assigned
    fn persisted(&self) -> FieldMap {
        let mut data = FieldMap::new();
        data.insert(
            "created_at".to_string(),
            timestamp::format_date(&self.created_at).into(),
        );
        data.insert(
            "updated_at".to_string(),
            timestamp::format_date(&self.updated_at).into(),
        );
        if let Some(id) = self.id {
            data.insert("id".to_string(), id.into());
        }
        data
    }
}

/// Capability to read an entity's persistable state
///
/// Only the mapper layer can construct one, so [`Entity::persist`] is not
/// callable from outside it.
#[derive(Debug, Clone, Copy)]
pub struct Access(());

impl Access {
    pub(crate) fn new() -> Self {
        Access(())
    }
}

/// A persisted domain object
///
/// # Example
///
/// ```
/// use rust_data_mapper::prelude::*;
///
/// #[derive(Debug)]
/// struct Note {
///     base: EntityBase,
///     body: String,
/// }
///
/// impl Entity for Note {
///     const NAME: &'static str = "Note";
///     const REQUIRED: &'static [&'static str] = &["body"];
///     const FIELDS: &'static [&'static str] = &["body"];
///     type Relations = ();
///
///     fn hydrate(base: EntityBase, record: Record) -> Result<Self> {
///         Ok(Note { base, body: record.string(Self::NAME, "body")? })
///     }
///
///     fn base(&self) -> &EntityBase {
///         &self.base
///     }
///
///     fn persist(&self, _: Access) -> FieldMap {
///         fields! { "body" => &self.body }
///     }
/// }
///
/// let note = Note::create(Record::new().with("body", "hello"))?;
/// assert_eq!(note.id(), None);
/// assert!(Note::create(Record::new()).is_err());
/// assert_eq!(Note::attributes(), ["id", "created_at", "updated_at", "body"]);
/// # Ok::<(), MapperError>(())
/// ```
pub trait Entity: Sized {
    /// Type name used in error messages
    const NAME: &'static str;

    /// Keys that must be present in a constructing payload
    const REQUIRED: &'static [&'static str];

    /// Persisted columns beyond [`BASE_FIELDS`]
    const FIELDS: &'static [&'static str];

    /// Nested entities supplied alongside the scalar fields
    type Relations: Default;

    /// Assign the type-specific fields
    ///
    /// Called by [`Entity::create`] once required fields and timestamps are
    /// settled. May impose further invariants.
    fn hydrate(base: EntityBase, record: Record<Self::Relations>) -> Result<Self>;

    fn base(&self) -> &EntityBase;

    /// Own persistable fields, without the base columns
    fn persist(&self, access: Access) -> FieldMap;

    /// Every persisted column, base columns first
    fn attributes() -> Vec<&'static str> {
        BASE_FIELDS.iter().chain(Self::FIELDS).copied().collect()
    }

    fn id(&self) -> Option<i64> {
        self.base().id()
    }

    /// Build an entity from a payload
    ///
    /// # Errors
    ///
    /// Validation error naming the first missing required field, a malformed
    /// timestamp, or whatever [`Entity::hydrate`] rejects.
    fn create(record: Record<Self::Relations>) -> Result<Self> {
        if let Some(missing) = Self::REQUIRED.iter().find(|f| !record.contains(f)) {
            return Err(MapperError::missing_field(Self::NAME, missing));
        }
        let base = EntityBase::from_record(Self::NAME, &record)?;
        Self::hydrate(base, record)
    }
}

/// Base columns followed by the entity's own persistable fields
pub(crate) fn persisted_fields<T: Entity>(entity: &T) -> FieldMap {
    let mut data = entity.base().persisted();
    data.extend(entity.persist(Access::new()));
    data
}
