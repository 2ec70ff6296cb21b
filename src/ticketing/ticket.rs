use super::{User, Workshop};
use crate::core::error::{MapperError, Result};
use crate::core::value::FieldMap;
use crate::fields;
use crate::model::{Access, Collection, Entity, EntityBase, Record};
use std::net::{IpAddr, Ipv4Addr};
use uuid::Uuid;

/// Nested entities of a [`Ticket`]
#[derive(Debug, Clone, Default)]
pub struct TicketRelations {
    pub user: Option<User>,
    pub workshops: Option<Collection<Workshop>>,
}

impl TicketRelations {
    pub fn new(user: User) -> Self {
        Self {
            user: Some(user),
            workshops: None,
        }
    }

    #[must_use]
    pub fn workshops(mut self, workshops: Collection<Workshop>) -> Self {
        self.workshops = Some(workshops);
        self
    }
}

/// Aggregate root: one user's admission to a set of workshops
///
/// Everything but the owning user is fixed at construction.
///
/// ```
/// use rust_data_mapper::prelude::*;
/// use rust_data_mapper::ticketing::{Ticket, TicketRelations, User};
///
/// let user = User::create(
///     Record::new()
///         .with("email", "linus@kernel.example")
///         .with("full_name", "Linus Torvalds")
///         .with("phone", "+358 9 1234567"),
/// )?;
/// let ticket = Ticket::create(Record::new().with_relations(TicketRelations::new(user)))?;
/// assert_eq!(ticket.ip_address().to_string(), "127.0.0.1");
/// assert!(ticket.workshops().is_empty());
/// assert!(!ticket.code().is_empty());
/// # Ok::<(), MapperError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    base: EntityBase,
    user: User,
    ip_address: IpAddr,
    code: String,
    workshops: Collection<Workshop>,
}

impl Ticket {
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Re-link the ticket to another user
    pub fn set_user(&mut self, user: User) {
        self.user = user;
    }

    pub fn ip_address(&self) -> IpAddr {
        self.ip_address
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn workshops(&self) -> &Collection<Workshop> {
        &self.workshops
    }

    fn generate_code() -> String {
        Uuid::new_v4().simple().to_string()
    }
}

impl Entity for Ticket {
    const NAME: &'static str = "Ticket";
    const REQUIRED: &'static [&'static str] = &[];
    const FIELDS: &'static [&'static str] = &["ip_address", "user_id", "code"];
    type Relations = TicketRelations;

    fn hydrate(base: EntityBase, record: Record<TicketRelations>) -> Result<Self> {
        let ip_address = record
            .optional_parse(Self::NAME, "ip_address")?
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let code = record
            .optional_string("code")?
            .unwrap_or_else(Self::generate_code);

        let (_, relations) = record.into_parts();
        let user = relations
            .user
            .ok_or_else(|| MapperError::invalid_field(Self::NAME, "user", "Invalid user"))?;

        Ok(Self {
            base,
            user,
            ip_address,
            code,
            workshops: relations.workshops.unwrap_or_default(),
        })
    }

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn persist(&self, _: Access) -> FieldMap {
        fields! {
            "ip_address" => self.ip_address.to_string(),
            "user_id" => self.user.id(),
            "code" => &self.code,
        }
    }
}
