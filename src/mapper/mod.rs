//! Generic data mapper
//!
//! A [`Repository`] binds one entity type to one table and one database. The
//! provided methods cover CRUD; mappers for aggregates override the ones
//! whose shape differs.
//!
//! Reads of a single entity and every write fail hard. Collection reads are
//! fail-soft: a store failure is logged and turned into an empty collection.
//!
//! An entity's persistable field map is only read inside this crate; a
//! caller holding a mapper cannot extract it:
//!
//! ```compile_fail
//! use rust_data_mapper::prelude::*;
//! use rust_data_mapper::ticketing::{Workshop, WorkshopMapper};
//! use std::sync::Arc;
//!
//! let workshops = WorkshopMapper::new(Arc::new(SqliteDatabase::open_in_memory()?));
//! let draft = Workshop::create(Record::new().with("title", "Macros"))?;
//! let leaked = workshops.model_data(&draft);
//! # Ok::<(), MapperError>(())
//! ```
//!
//! ```compile_fail
//! use rust_data_mapper::prelude::*;
//! use rust_data_mapper::ticketing::Workshop;
//!
//! let draft = Workshop::create(Record::new().with("title", "Macros"))?;
//! let leaked = draft.persist(Access::new());
//! # Ok::<(), MapperError>(())
//! ```

pub mod join;

use crate::backends::SqliteDatabase;
use crate::core::database::Database;
use crate::core::error::{MapperError, Result};
use crate::core::query_builder::SelectOptions;
use crate::core::value::FieldMap;
use crate::fields;
use crate::model::{persisted_fields, Collection, Entity, Record};
use std::marker::PhantomData;
use std::sync::Arc;

/// Something that identifies a `T` row: a raw id or the entity itself
pub trait PrimaryKey<T: Entity> {
    /// `None` for an entity that was never saved
    fn primary_key(&self) -> Option<i64>;
}

impl<T: Entity> PrimaryKey<T> for i64 {
    fn primary_key(&self) -> Option<i64> {
        Some(*self)
    }
}

impl<T: Entity> PrimaryKey<T> for &T {
    fn primary_key(&self) -> Option<i64> {
        self.id()
    }
}

/// CRUD for one entity type stored in one table
pub trait Repository {
    type Entity: Entity;
    type Db: Database;

    fn db(&self) -> &Arc<Self::Db>;

    fn table(&self) -> &str;

    /// Load one entity by primary key
    ///
    /// `fields` defaults to the entity's declared attributes.
    ///
    /// # Errors
    ///
    /// Store failures and construction failures. An absent row is `Ok(None)`.
    fn find(&self, id: i64, fields: Option<&[&str]>) -> Result<Option<Self::Entity>> {
        let rows = self.db().select(
            self.table(),
            &fields! { "id" => id },
            &columns::<Self::Entity>(fields),
            &SelectOptions::new().limit(1),
        )?;
        rows.first()
            .map(|row| Self::Entity::create(Record::from_row(row)))
            .transpose()
    }

    /// Load every entity matching all `conditions`
    ///
    /// # Errors
    ///
    /// Only construction failures; store failures yield an empty collection.
    fn find_by(
        &self,
        conditions: &FieldMap,
        fields: Option<&[&str]>,
        options: &SelectOptions,
    ) -> Result<Collection<Self::Entity>> {
        let loaded = self
            .db()
            .select(
                self.table(),
                conditions,
                &columns::<Self::Entity>(fields),
                options,
            )
            .and_then(|rows| Collection::from_records(rows.iter().map(Record::from_row)));
        fail_soft(self.table(), loaded)
    }

    /// # Errors
    ///
    /// Same as [`Repository::find_by`].
    fn find_all(&self, options: &SelectOptions) -> Result<Collection<Self::Entity>> {
        self.find_by(&FieldMap::new(), None, options)
    }

    /// Insert an unsaved entity or update a saved one
    ///
    /// Returns a new entity built from the row as stored; `entity` itself is
    /// not touched.
    ///
    /// # Errors
    ///
    /// Store failures, and a persistence error when an update matches no row.
    fn save(&self, entity: &Self::Entity) -> Result<Self::Entity> {
        let data = persisted_fields(entity);
        let row = match entity.id() {
            None => self.db().insert(self.table(), &data)?,
            Some(id) => self
                .db()
                .update(self.table(), &data, &fields! { "id" => id })?
                .ok_or_else(|| not_found(Self::Entity::NAME, id))?,
        };
        Self::Entity::create(Record::from_row(&row))
    }

    /// Delete by id or entity; deleting an absent row is not an error
    ///
    /// # Errors
    ///
    /// Store failures.
    fn delete<K: PrimaryKey<Self::Entity>>(&self, key: K) -> Result<()> {
        match key.primary_key() {
            Some(id) => self.db().delete(self.table(), &fields! { "id" => id }),
            None => Ok(()),
        }
    }
}

/// Read columns: the requested list or every declared attribute
fn columns<'a, T: Entity>(fields: Option<&[&'a str]>) -> Vec<&'a str> {
    match fields {
        Some(fields) => fields.to_vec(),
        None => T::attributes(),
    }
}

/// Turn store failures of a collection read into an empty collection
pub(crate) fn fail_soft<T: Entity>(
    source: &str,
    loaded: Result<Collection<T>>,
) -> Result<Collection<T>> {
    match loaded {
        Err(err) if err.is_store_failure() => {
            tracing::error!(
                source,
                entity = T::NAME,
                code = ?err.code(),
                error = %err,
                "collection read failed, returning empty result"
            );
            Ok(Collection::new())
        }
        other => other,
    }
}

pub(crate) fn not_found(entity: &str, id: i64) -> MapperError {
    MapperError::persistence(None, format!("{} {} not found", entity, id))
}

/// Plain mapper for entities stored in a single table
///
/// ```
/// use rust_data_mapper::prelude::*;
/// use rust_data_mapper::ticketing::Workshop;
/// use std::sync::Arc;
///
/// let db = Arc::new(SqliteDatabase::open_in_memory()?);
/// db.execute_script(
///     "CREATE TABLE workshops (id INTEGER PRIMARY KEY, title TEXT NOT NULL, \
///      created_at TEXT, updated_at TEXT)",
/// )?;
///
/// let workshops: Mapper<Workshop> = Mapper::new(Arc::clone(&db), "workshops");
/// let saved = workshops.save(&Workshop::create(Record::new().with("title", "Ownership"))?)?;
/// assert!(saved.id().is_some());
/// assert_eq!(workshops.find_all(&SelectOptions::new())?.len(), 1);
/// # Ok::<(), MapperError>(())
/// ```
pub struct Mapper<T, D = SqliteDatabase> {
    db: Arc<D>,
    table: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity, D: Database> Mapper<T, D> {
    pub fn new(db: Arc<D>, table: impl Into<String>) -> Self {
        Self {
            db,
            table: table.into(),
            _entity: PhantomData,
        }
    }
}

impl<T, D> Clone for Mapper<T, D> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            table: self.table.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity, D: Database> Repository for Mapper<T, D> {
    type Entity = T;
    type Db = D;

    fn db(&self) -> &Arc<D> {
        &self.db
    }

    fn table(&self) -> &str {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::{label, Label};

    fn setup() -> Mapper<Label> {
        let db = SqliteDatabase::open_in_memory().unwrap();
        db.execute_script(
            "CREATE TABLE labels (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, \
             color TEXT, created_at TEXT NOT NULL, updated_at TEXT NOT NULL)",
        )
        .unwrap();
        Mapper::new(Arc::new(db), "labels")
    }

    #[test]
    fn test_save_inserts_then_updates() {
        let labels = setup();
        let draft = Label::create(label("bug")).unwrap();

        let saved = labels.save(&draft).unwrap();
        let id = saved.id().expect("assigned id");
        assert_eq!(draft.id(), None);
        assert_eq!(saved.base().created_at(), draft.base().created_at());

        let recolored = Label::create(
            label("bug")
                .with("id", id)
                .with("color", "red")
                .with("created_at", crate::core::timestamp::format_date(&saved.base().created())),
        )
        .unwrap();
        let updated = labels.save(&recolored).unwrap();
        assert_eq!(updated.id(), Some(id));
        assert_eq!(updated.color.as_deref(), Some("red"));
        assert_eq!(labels.find_all(&SelectOptions::new()).unwrap().len(), 1);
    }

    #[test]
    fn test_update_of_missing_row_is_an_error() {
        let labels = setup();
        let ghost = Label::create(label("ghost").with("id", 404i64)).unwrap();
        let err = labels.save(&ghost).unwrap_err();
        assert!(matches!(err, MapperError::Persistence { .. }));
        assert!(err.to_string().contains("Label 404 not found"));
    }

    #[test]
    fn test_find_missing_is_none() {
        let labels = setup();
        assert!(labels.find(1, None).unwrap().is_none());
    }

    #[test]
    fn test_find_with_column_subset() {
        let labels = setup();
        let saved = labels
            .save(&Label::create(label("docs").with("color", "blue")).unwrap())
            .unwrap();

        let partial = labels
            .find(saved.id().unwrap(), Some(&["id", "name"][..]))
            .unwrap()
            .unwrap();
        assert_eq!(partial.name, "docs");
        assert_eq!(partial.color, None);
    }

    #[test]
    fn test_find_by_conditions_and_options() {
        let labels = setup();
        for (name, color) in [("a", "red"), ("b", "blue"), ("c", "red")] {
            labels
                .save(&Label::create(label(name).with("color", color)).unwrap())
                .unwrap();
        }

        let red = labels
            .find_by(
                &fields! { "color" => "red" },
                None,
                &SelectOptions::new().order("name desc").unwrap(),
            )
            .unwrap();
        let names: Vec<&str> = red.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["c", "a"]);

        let page = labels
            .find_all(&SelectOptions::new().order("id asc").unwrap().limit(1).offset(1))
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "b");
    }

    #[test]
    fn test_find_by_is_fail_soft() {
        let labels: Mapper<Label> = Mapper::new(setup().db().clone(), "no_such_table");
        let found = labels.find_all(&SelectOptions::new()).unwrap();
        assert!(found.is_empty());

        // single reads still fail hard
        assert!(labels.find(1, None).is_err());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let labels = setup();
        let saved = labels.save(&Label::create(label("tmp")).unwrap()).unwrap();

        labels.delete(&saved).unwrap();
        labels.delete(saved.id().unwrap()).unwrap();
        assert!(labels.find(saved.id().unwrap(), None).unwrap().is_none());

        let unsaved = Label::create(label("never")).unwrap();
        labels.delete(&unsaved).unwrap();
    }

    #[test]
    fn test_saved_columns_start_with_base_fields() {
        let entity = Label::create(label("x").with("id", 2i64)).unwrap();
        let data = persisted_fields(&entity);
        let keys: Vec<&str> = data.keys().map(String::as_str).collect();
        assert_eq!(keys, ["created_at", "updated_at", "id", "name", "color"]);
    }
}
