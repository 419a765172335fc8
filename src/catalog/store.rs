//! In-memory catalog collections.
//!
//! Each collection is an ordered list with ids unique inside it. Upsert of a
//! known id replaces in place (position kept), a new id appends, delete of an
//! unknown id does nothing. No integrity is enforced across collections.

use tracing::debug;

use crate::catalog::entities::{CatalogEntity, CatalogItem, CatalogKind, Clinic, Doctor, Product};

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
}

/// One ordered collection of catalog rows.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: CatalogEntity> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from rows; a repeated id keeps its first position and last value.
    pub fn from_items(items: impl IntoIterator<Item = T>) -> Self {
        let mut collection = Self::new();
        collection.replace_all(items);
        collection
    }

    /// Swap the whole collection.
    pub fn replace_all(&mut self, items: impl IntoIterator<Item = T>) {
        self.items.clear();
        for item in items {
            self.upsert(item);
        }
    }

    pub fn upsert(&mut self, item: T) -> Upsert {
        match self.position(item.id()) {
            Some(index) => {
                self.items[index] = item;
                Upsert::Replaced
            }
            None => {
                self.items.push(item);
                Upsert::Inserted
            }
        }
    }

    /// Remove by id, returning the removed row.
    pub fn delete(&mut self, id: &str) -> Option<T> {
        self.position(id).map(|index| self.items.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn list(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }
}

/// The three catalog collections.
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    pub products: Collection<Product>,
    pub clinics: Collection<Clinic>,
    pub doctors: Collection<Doctor>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route an edited row to its collection.
    pub fn upsert(&mut self, item: CatalogItem) -> Upsert {
        let kind = item.kind();
        let id = item.id().to_string();
        let outcome = match item {
            CatalogItem::Product(p) => self.products.upsert(p),
            CatalogItem::Clinic(c) => self.clinics.upsert(c),
            CatalogItem::Doctor(d) => self.doctors.upsert(d),
        };
        debug!(collection = %kind, id, ?outcome, "catalog upsert");
        outcome
    }

    /// Replace one collection. Rows of other kinds are ignored.
    pub fn replace_all(&mut self, kind: CatalogKind, items: Vec<CatalogItem>) {
        match kind {
            CatalogKind::Products => self.products.replace_all(items.into_iter().filter_map(|i| match i {
                CatalogItem::Product(p) => Some(p),
                _ => None,
            })),
            CatalogKind::Clinics => self.clinics.replace_all(items.into_iter().filter_map(|i| match i {
                CatalogItem::Clinic(c) => Some(c),
                _ => None,
            })),
            CatalogKind::Doctors => self.doctors.replace_all(items.into_iter().filter_map(|i| match i {
                CatalogItem::Doctor(d) => Some(d),
                _ => None,
            })),
        }
        debug!(collection = %kind, rows = self.len(kind), "catalog replaced");
    }

    /// Returns whether a row was removed.
    pub fn delete(&mut self, kind: CatalogKind, id: &str) -> bool {
        let removed = match kind {
            CatalogKind::Products => self.products.delete(id).is_some(),
            CatalogKind::Clinics => self.clinics.delete(id).is_some(),
            CatalogKind::Doctors => self.doctors.delete(id).is_some(),
        };
        debug!(collection = %kind, id, removed, "catalog delete");
        removed
    }

    pub fn get(&self, kind: CatalogKind, id: &str) -> Option<CatalogItem> {
        match kind {
            CatalogKind::Products => self.products.get(id).cloned().map(CatalogEntity::into_item),
            CatalogKind::Clinics => self.clinics.get(id).cloned().map(CatalogEntity::into_item),
            CatalogKind::Doctors => self.doctors.get(id).cloned().map(CatalogEntity::into_item),
        }
    }

    /// Rows of one collection in display order.
    pub fn items(&self, kind: CatalogKind) -> Vec<CatalogItem> {
        fn collect<T: CatalogEntity>(c: &Collection<T>) -> Vec<CatalogItem> {
            c.list().iter().cloned().map(CatalogEntity::into_item).collect()
        }
        match kind {
            CatalogKind::Products => collect(&self.products),
            CatalogKind::Clinics => collect(&self.clinics),
            CatalogKind::Doctors => collect(&self.doctors),
        }
    }

    pub fn len(&self, kind: CatalogKind) -> usize {
        match kind {
            CatalogKind::Products => self.products.len(),
            CatalogKind::Clinics => self.clinics.len(),
            CatalogKind::Doctors => self.doctors.len(),
        }
    }
}
