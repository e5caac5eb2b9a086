//! A typed table of mirrored entities with change tracking
//!
//! Rows are keyed by id. Every local `add`, `update` and `remove` is
//! recorded as a pending change until the next successful push. Removed rows
//! are kept aside as tombstones so the push can carry them.

use std::collections::{BTreeMap, BTreeSet};

use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{NynabError, NynabResult};
use crate::models::{Entity, EntityId};

use super::query::Query;

/// A staged local change awaiting push
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Change {
    Added,
    Modified,
    Removed,
}

/// A pending change and when it was staged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Staged {
    change: Change,
    /// Staging sequence within the table; pushes go out in this order
    #[serde(default)]
    seq: u64,
}

/// Outcome of applying one pulled entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Inserted,
    Updated,
    Removed,
    Ignored,
}

/// Entities of one type, indexed by id, internal name and foreign key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Entity")]
pub struct Table<T: Entity> {
    rows: BTreeMap<T::Id, T>,
    /// Tombstones of removed rows that have not been pushed yet
    #[serde(default)]
    removed: BTreeMap<T::Id, T>,
    #[serde(default)]
    changes: BTreeMap<T::Id, Staged>,
    #[serde(default)]
    next_seq: u64,
    #[serde(skip)]
    by_internal_name: BTreeMap<String, T::Id>,
    #[serde(skip)]
    by_reference: BTreeMap<(&'static str, Uuid), BTreeSet<T::Id>>,
}

impl<T: Entity> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Table<T> {
    /// Create an empty table
    pub const fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            removed: BTreeMap::new(),
            changes: BTreeMap::new(),
            next_seq: 0,
            by_internal_name: BTreeMap::new(),
            by_reference: BTreeMap::new(),
        }
    }

    /// Number of live rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get a live row by id
    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.rows.get(&id)
    }

    pub fn contains(&self, id: T::Id) -> bool {
        self.rows.contains_key(&id)
    }

    /// Check for a live row by raw UUID
    pub fn contains_uuid(&self, uuid: Uuid) -> bool {
        self.rows.contains_key(&T::Id::from_uuid(uuid))
    }

    /// Look up a system-reserved row by its internal name
    pub fn by_internal_name(&self, internal_name: &str) -> Option<&T> {
        self.by_internal_name
            .get(internal_name)
            .and_then(|id| self.rows.get(id))
    }

    /// Live rows whose foreign key `field` points at `target`
    pub fn referencing(&self, field: &'static str, target: Uuid) -> Vec<&T> {
        self.by_reference
            .get(&(field, target))
            .map(|ids| ids.iter().filter_map(|id| self.rows.get(id)).collect())
            .unwrap_or_default()
    }

    /// Iterate live rows in id order
    pub fn rows(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    /// Start a lazy query over the live rows
    pub fn query(&self) -> Query<'_, T> {
        Query::new(self)
    }

    /// Stage a new entity, minting an id if it has none
    pub fn add(&mut self, mut entity: T) -> NynabResult<T::Id> {
        entity
            .validate()
            .map_err(|e| NynabError::Validation(e.to_string()))?;
        entity.set_tombstone(false);

        let id = match entity.id() {
            Some(id) => id,
            None => {
                let id = T::Id::generate();
                entity.set_id(id);
                id
            }
        };

        if self.rows.contains_key(&id) {
            return Err(NynabError::Duplicate {
                entity_type: T::KIND.name(),
                identifier: id.to_string(),
            });
        }

        // Re-adding a row whose removal was never pushed is just an edit
        let change = match self.removed.remove(&id) {
            Some(_) => Change::Modified,
            None => Change::Added,
        };

        self.index(&entity, id);
        self.rows.insert(id, entity);
        self.stage(id, change);
        Ok(id)
    }

    /// Replace a live entity and stage the modification
    pub fn update(&mut self, mut entity: T) -> NynabResult<()> {
        entity
            .validate()
            .map_err(|e| NynabError::Validation(e.to_string()))?;
        entity.set_tombstone(false);

        let id = entity.id().ok_or_else(|| {
            NynabError::Validation(format!("{} has no id; stage it with add", T::KIND))
        })?;
        let previous = self.rows.remove(&id).ok_or_else(|| NynabError::NotFound {
            entity_type: T::KIND.name(),
            identifier: id.to_string(),
        })?;

        self.unindex(&previous, id);
        self.index(&entity, id);
        self.rows.insert(id, entity);
        if !self.changes.contains_key(&id) {
            self.stage(id, Change::Modified);
        }
        Ok(())
    }

    /// Stage the removal of a live entity
    pub fn remove(&mut self, id: T::Id) -> NynabResult<T> {
        self.stage_removal(id).ok_or_else(|| NynabError::NotFound {
            entity_type: T::KIND.name(),
            identifier: id.to_string(),
        })
    }

    /// Stage the removal of every live row matching `predicate`
    pub fn remove_where<F>(&mut self, predicate: F) -> Vec<T::Id>
    where
        F: Fn(&T) -> bool,
    {
        let ids: Vec<T::Id> = self
            .rows
            .iter()
            .filter(|(_, entity)| predicate(entity))
            .map(|(id, _)| *id)
            .collect();

        for id in &ids {
            self.stage_removal(*id);
        }
        ids
    }

    /// The pending change for a row, if any
    pub fn change(&self, id: T::Id) -> Option<Change> {
        self.changes.get(&id).map(|staged| staged.change)
    }

    pub fn pending_count(&self) -> usize {
        self.changes.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Staged rows that are still live (added or modified), in staging order
    pub fn staged(&self) -> impl Iterator<Item = &T> {
        self.staging_order()
            .into_iter()
            .filter(|(_, change)| *change != Change::Removed)
            .filter_map(|(id, _)| self.rows.get(&id))
    }

    /// Everything to push in staging order: live rows for adds/edits,
    /// tombstones for removals
    pub(crate) fn pending(&self) -> Vec<T> {
        self.staging_order()
            .into_iter()
            .filter_map(|(id, change)| match change {
                Change::Removed => self.removed.get(&id).cloned(),
                Change::Added | Change::Modified => self.rows.get(&id).cloned(),
            })
            .collect()
    }

    /// Forget pending changes once the server has accepted them
    pub(crate) fn mark_pushed(&mut self) {
        self.changes.clear();
        self.removed.clear();
        self.next_seq = 0;
    }

    /// Apply one entity pulled from the server
    pub(crate) fn apply_remote(&mut self, entity: T) -> Applied {
        let Some(id) = entity.id() else {
            warn!("Ignoring pulled {} without an id", T::KIND);
            return Applied::Ignored;
        };

        self.removed.remove(&id);
        self.changes.remove(&id);

        if entity.is_tombstone() {
            return match self.rows.remove(&id) {
                Some(previous) => {
                    self.unindex(&previous, id);
                    Applied::Removed
                }
                None => Applied::Ignored,
            };
        }

        let applied = match self.rows.remove(&id) {
            Some(previous) => {
                self.unindex(&previous, id);
                Applied::Updated
            }
            None => Applied::Inserted,
        };
        self.index(&entity, id);
        self.rows.insert(id, entity);
        applied
    }

    /// Rebuild the secondary indexes from the rows
    pub(crate) fn reindex(&mut self) {
        self.by_internal_name.clear();
        self.by_reference.clear();
        let rows = std::mem::take(&mut self.rows);
        for (id, entity) in &rows {
            self.index(entity, *id);
        }
        self.rows = rows;
    }

    fn stage_removal(&mut self, id: T::Id) -> Option<T> {
        let entity = self.rows.remove(&id)?;
        self.unindex(&entity, id);

        match self.changes.remove(&id).map(|staged| staged.change) {
            // Never reached the server, nothing to tell it
            Some(Change::Added) => {}
            _ => {
                let mut tombstone = entity.clone();
                tombstone.set_tombstone(true);
                self.removed.insert(id, tombstone);
                self.stage(id, Change::Removed);
            }
        }
        Some(entity)
    }

    fn stage(&mut self, id: T::Id, change: Change) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.changes.insert(id, Staged { change, seq });
    }

    fn staging_order(&self) -> Vec<(T::Id, Change)> {
        let mut order: Vec<_> = self.changes.iter().collect();
        order.sort_by_key(|(_, staged)| staged.seq);
        order
            .into_iter()
            .map(|(id, staged)| (*id, staged.change))
            .collect()
    }

    fn index(&mut self, entity: &T, id: T::Id) {
        if let Some(name) = entity.internal_name() {
            self.by_internal_name.insert(name.to_string(), id);
        }
        for reference in entity.references() {
            self.by_reference
                .entry((reference.field, reference.target))
                .or_default()
                .insert(id);
        }
    }

    fn unindex(&mut self, entity: &T, id: T::Id) {
        if let Some(name) = entity.internal_name() {
            if self.by_internal_name.get(name) == Some(&id) {
                self.by_internal_name.remove(name);
            }
        }
        for reference in entity.references() {
            let key = (reference.field, reference.target);
            if let Some(ids) = self.by_reference.get_mut(&key) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.by_reference.remove(&key);
                }
            }
        }
    }
}
