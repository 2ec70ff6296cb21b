//! Type-checked entity collections
//!
//! A [`Collection`] only ever holds entities of one type. Raw records are
//! turned into entities when they are added, so a bad payload is rejected on
//! the spot and the collection is left as it was.
//!
//! The element type must implement [`Entity`]; anything else is refused at
//! compile time:
//!
//! ```compile_fail
//! use rust_data_mapper::model::Collection;
//!
//! let names: Collection<String> = Collection::new();
//! ```

use super::{Entity, Record};
use crate::core::error::Result;
use std::ops::Index;

/// Either a ready entity or a payload to build one from
#[derive(Debug, Clone)]
pub enum Element<T: Entity> {
    Entity(T),
    Record(Record<T::Relations>),
}

impl<T: Entity> Element<T> {
    fn into_entity(self) -> Result<T> {
        match self {
            Element::Entity(entity) => Ok(entity),
            Element::Record(record) => T::create(record),
        }
    }
}

/// Ordered, index-addressable sequence of one entity type
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T: Entity> {
    items: Vec<T>,
}

impl<T: Entity> Default for Collection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Entity> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every record in order
    ///
    /// # Errors
    ///
    /// The first construction failure; no collection is returned.
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = Record<T::Relations>>,
    {
        let items = records
            .into_iter()
            .map(T::create)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { items })
    }

    /// Build from a mix of entities and records
    ///
    /// # Errors
    ///
    /// The first construction failure; no collection is returned.
    pub fn from_elements<I>(elements: I) -> Result<Self>
    where
        I: IntoIterator<Item = Element<T>>,
    {
        let items = elements
            .into_iter()
            .map(Element::into_entity)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { items })
    }

    pub fn push(&mut self, entity: T) {
        self.items.push(entity);
    }

    /// Build an entity from `record` and append it
    ///
    /// # Errors
    ///
    /// Construction failure; the collection is unchanged.
    pub fn push_record(&mut self, record: Record<T::Relations>) -> Result<()> {
        self.items.push(T::create(record)?);
        Ok(())
    }

    /// Insert at `index`, shifting later elements
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, entity: T) {
        self.items.insert(index, entity);
    }

    /// Build an entity from `record` and insert it at `index`
    ///
    /// # Errors
    ///
    /// Construction failure; the collection is unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert_record(&mut self, index: usize, record: Record<T::Relations>) -> Result<()> {
        let entity = T::create(record)?;
        self.items.insert(index, entity);
        Ok(())
    }

    /// Replace the element at `index`, returning the previous one
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn set(&mut self, index: usize, entity: T) -> T {
        std::mem::replace(&mut self.items[index], entity)
    }

    /// Build an entity from `record` and put it at `index`
    ///
    /// # Errors
    ///
    /// Construction failure; the collection is unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn set_record(&mut self, index: usize, record: Record<T::Relations>) -> Result<T> {
        let entity = T::create(record)?;
        Ok(self.set(index, entity))
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// New collection of the elements matching `predicate`, in order
    pub fn filter<P>(&self, mut predicate: P) -> Self
    where
        T: Clone,
        P: FnMut(&T) -> bool,
    {
        self.items
            .iter()
            .filter(|item| predicate(item))
            .cloned()
            .collect()
    }

    /// Name of the element type
    pub fn item_type(&self) -> &'static str {
        T::NAME
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T: Entity> Index<usize> for Collection<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<T: Entity> FromIterator<T> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<T: Entity> Extend<T> for Collection<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl<T: Entity> IntoIterator for Collection<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T: Entity> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
