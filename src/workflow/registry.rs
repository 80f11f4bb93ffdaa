//! Collection registry
//!
//! Owns the live item entities of one session, keyed by [`GroupKey`], plus the
//! two collections of groups that are shown but never renamed. The registry is
//! populated exactly once; after that it only shrinks as items are disposed.

use crate::error::{Error, Result};
use crate::group::{FileGroup, GroupKey, partition};
use crate::workflow::item::{ItemCommand, ItemEntity, ItemObserver, ItemState};
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
pub struct Registry {
    /// Renameable keys in batch order
    order: Vec<GroupKey>,
    items: HashMap<GroupKey, ItemEntity>,
    uncertain: Vec<FileGroup>,
    unsupported: Vec<FileGroup>,
    populated: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Partition the batch and spawn one entity per renameable group.
    ///
    /// Returns the number of spawned entities. Fails without touching the
    /// registry if it was already populated.
    pub fn populate(&mut self, groups: Vec<FileGroup>) -> Result<usize> {
        if self.populated {
            return Err(Error::AlreadyPopulated);
        }
        self.populated = true;

        let parts = partition(groups);
        for group in parts.renameable {
            let key = group.key().clone();
            if self.items.contains_key(&key) {
                warn!(%key, "Duplicate group key in batch, keeping the first");
                continue;
            }
            self.order.push(key.clone());
            self.items.insert(key, ItemEntity::spawn(group));
        }
        self.uncertain = parts.uncertain;
        self.unsupported = parts.unsupported;

        info!(
            renameable = self.order.len(),
            uncertain = self.uncertain.len(),
            unsupported = self.unsupported.len(),
            "Registry populated"
        );
        Ok(self.order.len())
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn get(&self, key: &GroupKey) -> Option<&ItemEntity> {
        self.items.get(key)
    }

    pub fn contains(&self, key: &GroupKey) -> bool {
        self.items.contains_key(key)
    }

    /// Live renameable items in batch order
    pub fn items(&self) -> impl Iterator<Item = &ItemEntity> {
        self.order.iter().filter_map(|key| self.items.get(key))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn uncertain(&self) -> &[FileGroup] {
        &self.uncertain
    }

    pub fn unsupported(&self) -> &[FileGroup] {
        &self.unsupported
    }

    /// Deliver a command to one item. `None` when no item lives under `key`.
    pub fn send(
        &mut self,
        key: &GroupKey,
        command: ItemCommand,
        observer: &mut dyn ItemObserver,
    ) -> Option<bool> {
        self.items
            .get_mut(key)
            .map(|item| item.apply(command, observer))
    }

    /// Deliver a command to every live item in order; returns how many accepted it
    pub fn broadcast(&mut self, command: &ItemCommand, observer: &mut dyn ItemObserver) -> usize {
        let mut accepted = 0;
        for key in &self.order {
            if let Some(item) = self.items.get_mut(key) {
                if item.apply(command.clone(), observer) {
                    accepted += 1;
                }
            }
        }
        accepted
    }

    /// Keys of selected, named items that have not been committed yet, in
    /// batch order. Items still waiting for a name have no target to rename to.
    pub fn commit_candidates(&self) -> Vec<GroupKey> {
        self.items()
            .filter(|item| {
                item.is_selected() && !item.is_committed() && item.state() == ItemState::Ready
            })
            .map(|item| item.key().clone())
            .collect()
    }

    /// Remove an item. Disposing an unknown key is a no-op.
    pub fn dispose(&mut self, key: &GroupKey) -> Option<ItemEntity> {
        let removed = self.items.remove(key)?;
        self.order.retain(|k| k != key);
        debug!(%key, remaining = self.order.len(), "Item disposed");
        Some(removed)
    }
}
