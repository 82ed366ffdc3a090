//! Concurrency-safe store of managed downloads.
//!
//! The [`Registry`] maps each [`DownloadId`] to its [`DownloadRecord`] and
//! keeps insertion order for listings. Every operation takes the internal lock
//! for the duration of the call only, so it can be used from synchronous
//! command handlers and from any number of asynchronous completion contexts.
//! Positions are recomputed on demand and are only valid for the instant they
//! were observed. Every update and removal bumps the record's revision before
//! the mutator sees it.

use crate::download::{DownloadId, DownloadRecord};
use crate::error::{Error, Result};

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Entries {
    order: Vec<DownloadId>,
    records: HashMap<DownloadId, DownloadRecord>,
}

impl Entries {
    fn position(&self, id: DownloadId) -> Option<usize> {
        self.order.iter().position(|candidate| *candidate == id)
    }
}

/// Ordered, identity-keyed collection of download records.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<Entries>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // Poisoned locks are recovered.
    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a record and returns its position.
    pub fn insert(&self, record: DownloadRecord) -> Result<usize> {
        let id = record.id();
        let mut entries = self.write();
        if entries.records.contains_key(&id) {
            return Err(Error::DuplicateIdentity(id));
        }
        entries.order.push(id);
        entries.records.insert(id, record);
        Ok(entries.order.len() - 1)
    }

    /// Returns a snapshot of the record, if it is still registered.
    pub fn lookup(&self, id: DownloadId) -> Option<DownloadRecord> {
        self.read().records.get(&id).cloned()
    }

    /// Returns a snapshot of the record currently at `position`.
    pub fn lookup_by_position(&self, position: usize) -> Option<DownloadRecord> {
        let entries = self.read();
        let id = entries.order.get(position)?;
        entries.records.get(id).cloned()
    }

    /// Current position of the record in the listing.
    pub fn position(&self, id: DownloadId) -> Option<usize> {
        self.read().position(id)
    }

    pub fn contains(&self, id: DownloadId) -> bool {
        self.read().records.contains_key(&id)
    }

    /// Atomically applies `mutator` to the record; `None` if it is absent.
    pub fn update<R>(
        &self,
        id: DownloadId,
        mutator: impl FnOnce(&mut DownloadRecord) -> R,
    ) -> Option<R> {
        self.write().records.get_mut(&id).map(|record| {
            record.touch();
            mutator(record)
        })
    }

    /// Like [`update`](Registry::update), also returning the position
    /// observed under the same lock.
    pub fn update_with_position<R>(
        &self,
        id: DownloadId,
        mutator: impl FnOnce(&mut DownloadRecord) -> R,
    ) -> Option<(usize, R)> {
        let mut entries = self.write();
        let position = entries.position(id)?;
        let record = entries.records.get_mut(&id)?;
        record.touch();
        Some((position, mutator(record)))
    }

    /// Atomically removes the record, returning it with its former position.
    pub fn remove(&self, id: DownloadId) -> Option<(usize, DownloadRecord)> {
        let mut entries = self.write();
        let position = entries.position(id)?;
        entries.order.remove(position);
        let mut record = entries.records.remove(&id)?;
        record.touch();
        Some((position, record))
    }

    /// Ordered snapshots of every record.
    pub fn snapshot(&self) -> Vec<DownloadRecord> {
        let entries = self.read();
        entries
            .order
            .iter()
            .filter_map(|id| entries.records.get(id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().order.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("len", &self.len()).finish()
    }
}
