use super::{EmailAddress, User, Workshop};
use crate::backends::SqliteDatabase;
use crate::core::database::Database;
use crate::core::error::{MapperError, Result};
use crate::core::query_builder::SelectOptions;
use crate::fields;
use crate::mapper::{fail_soft, PrimaryKey, Repository};
use crate::model::{Collection, Entity, Record};
use std::sync::{Arc, OnceLock};

const USERS_PER_WORKSHOP: &str = "SELECT DISTINCT user_id AS id, user_full_name AS full_name, \
     user_email AS email, user_phone AS phone \
     FROM ticket_details WHERE workshop_id = :workshop_id ORDER BY user_id";

/// Hash checked when no stored hash exists, so every attempt costs one verify
fn fallback_hash() -> Option<&'static str> {
    static HASH: OnceLock<Option<String>> = OnceLock::new();
    HASH.get_or_init(|| bcrypt::hash("no such user", bcrypt::DEFAULT_COST).ok())
        .as_deref()
}

/// Mapper for the `users` table
pub struct UserMapper<D = SqliteDatabase> {
    db: Arc<D>,
}

impl<D: Database> UserMapper<D> {
    pub fn new(db: Arc<D>) -> Self {
        Self { db }
    }

    /// # Errors
    ///
    /// Construction failures only; store failures read as `None`.
    pub fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>> {
        let found = self.find_by(
            &fields! { "email" => email.as_str() },
            None,
            &SelectOptions::new().limit(1),
        )?;
        Ok(found.into_iter().next())
    }

    /// Return `user` if saved, else the stored user with its e-mail, else save it
    ///
    /// # Errors
    ///
    /// Store failures while saving.
    pub fn find_or_create(&self, user: &User) -> Result<User> {
        if user.id().is_some() {
            return Ok(user.clone());
        }
        match self.find_by_email(user.email())? {
            Some(found) => Ok(found),
            None => self.save(user),
        }
    }

    /// Users holding a ticket for `workshop`
    ///
    /// # Errors
    ///
    /// Construction failures only; store failures yield an empty collection.
    pub fn find_per_workshop(&self, workshop: impl PrimaryKey<Workshop>) -> Result<Collection<User>> {
        let Some(workshop_id) = workshop.primary_key() else {
            return Ok(Collection::new());
        };
        let loaded = self
            .db
            .execute(USERS_PER_WORKSHOP, &fields! { "workshop_id" => workshop_id })
            .and_then(|execution| {
                Collection::from_records(execution.into_rows().iter().map(Record::from_row))
            });
        fail_soft("ticket_details", loaded)
    }

    /// Verify a password against the stored hash
    ///
    /// Unknown e-mail and wrong password fail the same way.
    ///
    /// # Errors
    ///
    /// `AuthenticationFailed` on bad credentials, store failures otherwise.
    pub fn authenticate(&self, email: &EmailAddress, password: &str) -> Result<User> {
        let rows = self.db.select(
            self.table(),
            &fields! { "email" => email.as_str() },
            &[],
            &SelectOptions::new(),
        )?;

        let (row, hash) = match rows.as_slice() {
            [row] => (Some(row), row.get("password").and_then(|hash| hash.as_str())),
            _ => (None, None),
        };
        let verified = hash
            .or_else(|| fallback_hash())
            .is_some_and(|hash| bcrypt::verify(password, hash).unwrap_or(false));

        if let (Some(row), Some(_), true) = (row, hash, verified) {
            return User::create(Record::from_row(row));
        }

        tracing::debug!(email = %email, "authentication rejected");
        Err(MapperError::authentication_failed(email.as_str()))
    }
}

impl<D> Clone for UserMapper<D> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
        }
    }
}

impl<D: Database> Repository for UserMapper<D> {
    type Entity = User;
    type Db = D;

    fn db(&self) -> &Arc<D> {
        &self.db
    }

    fn table(&self) -> &str {
        "users"
    }
}
