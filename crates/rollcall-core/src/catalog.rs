//! In-memory mirror of every registered employee's embedding.
//!
//! The catalog is always rebuilt wholesale from the store. There is no
//! incremental insert path: after a registration the caller reloads.

use crate::types::{Embedding, Employee, Matcher};

/// One employee as seen by the live comparison loop.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: i64,
    pub name: String,
    pub embedding: Embedding,
}

impl From<Employee> for CatalogEntry {
    fn from(e: Employee) -> Self {
        Self {
            id: e.id,
            name: e.name,
            embedding: e.embedding,
        }
    }
}

/// Ordered collection of catalog entries, in store iteration order.
#[derive(Debug, Default)]
pub struct FaceCatalog {
    entries: Vec<CatalogEntry>,
}

impl FaceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard every entry and repopulate from `employees`, preserving their order.
    pub fn reload<I>(&mut self, employees: I)
    where
        I: IntoIterator<Item = Employee>,
    {
        self.entries.clear();
        self.entries.extend(employees.into_iter().map(CatalogEntry::from));
        tracing::debug!(entries = self.entries.len(), "catalog reloaded");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Evaluate the match predicate against every entry, aligned with catalog order.
    pub fn compare<M: Matcher>(&self, matcher: &M, probe: &Embedding) -> Vec<bool> {
        self.entries
            .iter()
            .map(|entry| matcher.is_match(&entry.embedding, probe))
            .collect()
    }

    /// First entry in catalog order whose predicate holds.
    ///
    /// When several entries match, the earliest one wins. Catalog order is
    /// store order, which is not guaranteed stable across reloads.
    pub fn first_match<M: Matcher>(&self, matcher: &M, probe: &Embedding) -> Option<&CatalogEntry> {
        let matches = self.compare(matcher, probe);
        matches
            .iter()
            .position(|&m| m)
            .map(|idx| &self.entries[idx])
    }
}
