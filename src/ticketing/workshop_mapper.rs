use super::{User, Workshop};
use crate::backends::SqliteDatabase;
use crate::core::database::Database;
use crate::core::error::Result;
use crate::fields;
use crate::mapper::{fail_soft, PrimaryKey, Repository};
use crate::model::{Collection, Record};
use std::sync::Arc;

const WORKSHOPS_PER_USER: &str = "SELECT DISTINCT workshop_id AS id, workshop_title AS title \
     FROM ticket_details WHERE user_id = :user_id AND workshop_id IS NOT NULL \
     ORDER BY workshop_id";

/// Mapper for the `workshops` table
pub struct WorkshopMapper<D = SqliteDatabase> {
    db: Arc<D>,
}

impl<D: Database> WorkshopMapper<D> {
    pub fn new(db: Arc<D>) -> Self {
        Self { db }
    }

    /// Workshops `user` is enrolled in through any of their tickets
    ///
    /// # Errors
    ///
    /// Construction failures only; store failures yield an empty collection.
    pub fn find_per_user(&self, user: impl PrimaryKey<User>) -> Result<Collection<Workshop>> {
        let Some(user_id) = user.primary_key() else {
            return Ok(Collection::new());
        };
        let loaded = self
            .db
            .execute(WORKSHOPS_PER_USER, &fields! { "user_id" => user_id })
            .and_then(|execution| {
                Collection::from_records(execution.into_rows().iter().map(Record::from_row))
            });
        fail_soft("ticket_details", loaded)
    }
}

impl<D> Clone for WorkshopMapper<D> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
        }
    }
}

impl<D: Database> Repository for WorkshopMapper<D> {
    type Entity = Workshop;
    type Db = D;

    fn db(&self) -> &Arc<D> {
        &self.db
    }

    fn table(&self) -> &str {
        "workshops"
    }
}
