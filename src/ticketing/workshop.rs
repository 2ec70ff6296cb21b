use crate::core::error::Result;
use crate::core::value::FieldMap;
use crate::fields;
use crate::model::{Access, Entity, EntityBase, Record};

/// A session tickets can enroll in
#[derive(Debug, Clone, PartialEq)]
pub struct Workshop {
    base: EntityBase,
    title: String,
}

impl Workshop {
    pub fn title(&self) -> &str {
        &self.title
    }
}

impl Entity for Workshop {
    const NAME: &'static str = "Workshop";
    const REQUIRED: &'static [&'static str] = &["title"];
    const FIELDS: &'static [&'static str] = &["title"];
    type Relations = ();

    fn hydrate(base: EntityBase, record: Record) -> Result<Self> {
        Ok(Self {
            base,
            title: record.string(Self::NAME, "title")?,
        })
    }

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn persist(&self, _: Access) -> FieldMap {
        fields! { "title" => &self.title }
    }
}
