use super::values::{EmailAddress, PersonName, PhoneNumber};
use crate::core::error::{MapperError, Result};
use crate::core::value::FieldMap;
use crate::fields;
use crate::model::{Access, Entity, EntityBase, Record};

/// A registered attendee
///
/// The password is write-only: it is hashed by [`User::set_password`], sent
/// to the store on the next save and never loaded back.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    base: EntityBase,
    email: EmailAddress,
    full_name: PersonName,
    phone: PhoneNumber,
    password_hash: Option<String>,
}

impl User {
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    pub fn full_name(&self) -> &PersonName {
        &self.full_name
    }

    pub fn phone(&self) -> &PhoneNumber {
        &self.phone
    }

    /// Hash and store a new password with the default bcrypt cost
    ///
    /// # Errors
    ///
    /// Returns a validation error if hashing fails.
    pub fn set_password(&mut self, password: &str) -> Result<()> {
        self.set_password_with_cost(password, bcrypt::DEFAULT_COST)
    }

    /// Hash and store a new password with an explicit bcrypt cost (4..=31)
    ///
    /// # Errors
    ///
    /// Returns a validation error for an out-of-range cost.
    pub fn set_password_with_cost(&mut self, password: &str, cost: u32) -> Result<()> {
        let hash = bcrypt::hash(password, cost)
            .map_err(|e| MapperError::invalid_field(Self::NAME, "password", e.to_string()))?;
        self.password_hash = Some(hash);
        Ok(())
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Copy with another full name; identity and timestamps are kept
    #[must_use]
    pub fn with_full_name(&self, full_name: PersonName) -> Self {
        Self {
            full_name,
            ..self.clone()
        }
    }

    /// Copy with another phone number
    #[must_use]
    pub fn with_phone(&self, phone: PhoneNumber) -> Self {
        Self {
            phone,
            ..self.clone()
        }
    }
}

impl Entity for User {
    const NAME: &'static str = "User";
    const REQUIRED: &'static [&'static str] = &["email", "full_name", "phone"];
    const FIELDS: &'static [&'static str] = &["email", "full_name", "phone", "password"];
    type Relations = ();

    fn hydrate(base: EntityBase, record: Record) -> Result<Self> {
        Ok(Self {
            base,
            email: record.parse(Self::NAME, "email")?,
            full_name: record.parse(Self::NAME, "full_name")?,
            phone: record.parse(Self::NAME, "phone")?,
            password_hash: None,
        })
    }

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn persist(&self, _: Access) -> FieldMap {
        let mut data = fields! {
            "email" => self.email.as_str(),
            "full_name" => self.full_name.as_str(),
            "phone" => self.phone.as_str(),
        };
        if let Some(hash) = &self.password_hash {
            data.insert("password".to_string(), hash.into());
        }
        data
    }
}
