use super::{Ticket, TicketRelations, User, UserMapper, Workshop};
use crate::backends::SqliteDatabase;
use crate::core::database::Database;
use crate::core::error::{MapperError, Result};
use crate::core::query_builder::{OrderBy, SelectOptions};
use crate::core::value::{DatabaseRow, DatabaseValue, FieldMap};
use crate::fields;
use crate::mapper::join::{column, group_by_parent};
use crate::mapper::{fail_soft, not_found, PrimaryKey, Repository};
use crate::model::{persisted_fields, Collection, Entity, Record};
use std::sync::Arc;

/// Join of tickets, users and enrollments; one row per enrolled workshop
const DETAILS: &str = "ticket_details";
const TICKETS: &str = "tickets";
const ENROLLMENTS: &str = "enrollments";

const TICKET_COLUMNS: [(&str, &str); 5] = [
    ("id", "id"),
    ("ip_address", "ip_address"),
    ("code", "code"),
    ("created_at", "created_at"),
    ("updated_at", "updated_at"),
];

const USER_COLUMNS: [(&str, &str); 6] = [
    ("user_id", "id"),
    ("user_full_name", "full_name"),
    ("user_phone", "phone"),
    ("user_email", "email"),
    ("user_created_at", "created_at"),
    ("user_updated_at", "updated_at"),
];

/// Mapper for the ticket aggregate
///
/// Reads go through the `ticket_details` view and are regrouped into one
/// ticket per id. Writes touch `tickets` and `enrollments` inside a single
/// transaction, creating the ticket's user first when it has no id.
pub struct TicketMapper<D = SqliteDatabase> {
    db: Arc<D>,
    users: UserMapper<D>,
}

impl<D: Database> TicketMapper<D> {
    pub fn new(db: Arc<D>) -> Self {
        Self {
            users: UserMapper::new(Arc::clone(&db)),
            db,
        }
    }

    /// # Errors
    ///
    /// Store and construction failures.
    pub fn find_by_code(&self, code: &str) -> Result<Option<Ticket>> {
        Ok(self
            .load(&fields! { "code" => code }, &SelectOptions::new())?
            .into_iter()
            .next())
    }

    /// Fetch and regroup matching view rows
    ///
    /// Rows are always ordered by ticket id so every ticket is one
    /// contiguous run. A limit counts view rows, not tickets.
    fn load(&self, conditions: &FieldMap, options: &SelectOptions) -> Result<Collection<Ticket>> {
        let options = SelectOptions {
            order: vec![OrderBy::asc("id"), OrderBy::asc("enrollment_id")],
            ..options.clone()
        };
        let rows = self.db.select(DETAILS, conditions, &[], &options)?;
        group_by_parent(&rows, "id", Self::ticket_from_rows).map(Collection::from_iter)
    }

    /// Build one ticket from its run of view rows
    fn ticket_from_rows(rows: &[DatabaseRow]) -> Result<Ticket> {
        let first = rows
            .first()
            .ok_or_else(|| MapperError::query("empty ticket group"))?;

        let user = User::create(Record::from_fields(pick(first, &USER_COLUMNS)?))?;

        let mut workshops = Collection::new();
        for row in rows {
            let workshop_id = column(row, "workshop_id")?;
            // LEFT JOIN: a ticket without enrollments still yields one row
            if workshop_id.is_null() {
                continue;
            }
            workshops.push_record(
                Record::new()
                    .with("id", workshop_id.clone())
                    .with("title", column(row, "workshop_title")?.clone()),
            )?;
        }

        Ticket::create(Record::from_parts(
            pick(first, &TICKET_COLUMNS)?,
            TicketRelations::new(user).workshops(workshops),
        ))
    }

    fn insert(&self, ticket: &Ticket) -> Result<Ticket> {
        self.db
            .transactional(|db| -> Result<Ticket> {
                let linked = self.link_user(ticket)?;
                let row = db.insert(TICKETS, &persisted_fields(&linked))?;
                let id = row
                    .get("id")
                    .and_then(DatabaseValue::as_long)
                    .ok_or_else(|| MapperError::persistence(None, "ticket row has no id"))?;
                Self::update_enrollments(db, linked.workshops(), id)?;

                let relations =
                    TicketRelations::new(linked.user().clone()).workshops(linked.workshops().clone());
                Ticket::create(Record::from_parts(row.into_iter().collect(), relations))
            })
            .map_err(|err| write_failure("create", err))
    }

    fn update(&self, ticket: &Ticket, id: i64) -> Result<Ticket> {
        self.db
            .transactional(|db| -> Result<()> {
                let linked = self.link_user(ticket)?;
                db.update(TICKETS, &persisted_fields(&linked), &fields! { "id" => id })?
                    .ok_or_else(|| not_found(Ticket::NAME, id))?;
                // Enrollments are immutable once the ticket exists
                Ok(())
            })
            .map_err(|err| write_failure("update", err))?;

        self.find(id, None)?
            .ok_or_else(|| not_found(Ticket::NAME, id))
    }

    /// Copy of `ticket` whose user is stored
    fn link_user(&self, ticket: &Ticket) -> Result<Ticket> {
        let mut linked = ticket.clone();
        if ticket.user().id().is_none() {
            linked.set_user(self.users.find_or_create(ticket.user())?);
        }
        Ok(linked)
    }

    fn update_enrollments(db: &D, workshops: &Collection<Workshop>, ticket_id: i64) -> Result<()> {
        db.delete(ENROLLMENTS, &fields! { "ticket_id" => ticket_id })?;
        for workshop in workshops {
            db.insert(
                ENROLLMENTS,
                &fields! { "ticket_id" => ticket_id, "workshop_id" => workshop.id() },
            )?;
        }
        Ok(())
    }
}

/// Copy `(source, target)` columns of a view row into a field map
fn pick(row: &DatabaseRow, columns: &[(&str, &str)]) -> Result<FieldMap> {
    columns
        .iter()
        .map(|(source, target)| -> Result<(String, DatabaseValue)> {
            Ok((target.to_string(), column(row, source)?.clone()))
        })
        .collect()
}

fn write_failure(action: &str, err: MapperError) -> MapperError {
    tracing::error!(error = %err, "unable to {} ticket", action);
    MapperError::persistence(err.code(), format!("Unable to {} ticket: {}", action, err))
}

impl<D> Clone for TicketMapper<D> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            users: self.users.clone(),
        }
    }
}

impl<D: Database> Repository for TicketMapper<D> {
    type Entity = Ticket;
    type Db = D;

    fn db(&self) -> &Arc<D> {
        &self.db
    }

    fn table(&self) -> &str {
        DETAILS
    }

    /// Load one ticket with its user and workshops; `fields` is ignored
    fn find(&self, id: i64, _fields: Option<&[&str]>) -> Result<Option<Ticket>> {
        Ok(self
            .load(&fields! { "id" => id }, &SelectOptions::new())?
            .into_iter()
            .next())
    }

    /// Conditions apply to `ticket_details` columns; `fields` is ignored
    fn find_by(
        &self,
        conditions: &FieldMap,
        _fields: Option<&[&str]>,
        options: &SelectOptions,
    ) -> Result<Collection<Ticket>> {
        fail_soft(DETAILS, self.load(conditions, options))
    }

    fn save(&self, ticket: &Ticket) -> Result<Ticket> {
        match ticket.id() {
            None => self.insert(ticket),
            Some(id) => self.update(ticket, id),
        }
    }

    /// Remove the ticket and its enrollments
    fn delete<K: PrimaryKey<Self::Entity>>(&self, key: K) -> Result<()> {
        let Some(id) = key.primary_key() else {
            return Ok(());
        };
        self.db.transactional(|db| -> Result<()> {
            db.delete(ENROLLMENTS, &fields! { "ticket_id" => id })?;
            db.delete(TICKETS, &fields! { "id" => id })
        })
    }
}
