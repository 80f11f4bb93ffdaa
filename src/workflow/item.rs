//! Item entity: lifecycle of one renameable file group
//!
//! `enriching -> ready -> committing -> done`. The entity owns its selection
//! flag and target name and talks to its parent only through [`ItemObserver`].

use crate::group::{FileGroup, GroupKey, NextName};
use std::path::Path;
use tracing::{debug, trace, warn};

/// Lifecycle state of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    /// Waiting for the derived target name
    Enriching,
    /// Named; may be selected and committed
    Ready,
    /// Part of an accepted commit batch
    Committing,
    /// Renamed on disk; waiting to be disposed
    Done,
}

/// Who asked for a selection change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A user action on this item; the parent is notified
    User,
    /// A broadcast from the parent; no notification back
    Parent,
}

/// Commands delivered downward to an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemCommand {
    SetNextName(NextName),
    Select(Origin),
    Deselect(Origin),
    CommitStart,
    CommitAcknowledged,
    /// The rename of this group failed; it can be committed again
    CommitFailed,
    /// The display delay after `done` has elapsed
    DisposalDue,
}

/// Upward notifications from an item to its parent
pub trait ItemObserver {
    /// A user toggle changed the selection flag
    fn on_selection_changed(&mut self, key: &GroupKey);
    /// The commit acknowledgement arrived; the display delay starts now
    fn on_committed(&mut self, key: &GroupKey);
    /// The item may be removed from the registry
    fn on_disposable(&mut self, key: &GroupKey);
}

/// Per-group state holder
#[derive(Debug, Clone)]
pub struct ItemEntity {
    group: FileGroup,
    state: ItemState,
    selected: bool,
    next: Option<NextName>,
    committed: bool,
}

impl ItemEntity {
    /// Create an entity for a renameable group. Every item starts selected.
    pub fn spawn(group: FileGroup) -> Self {
        debug_assert!(group.is_renameable(), "only renameable groups get an entity");
        Self {
            group,
            state: ItemState::Enriching,
            selected: true,
            next: None,
            committed: false,
        }
    }

    pub fn key(&self) -> &GroupKey {
        self.group.key()
    }

    pub fn group(&self) -> &FileGroup {
        &self.group
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn next_stem(&self) -> Option<&str> {
        self.next.as_ref().map(|n| n.next_stem.as_str())
    }

    pub fn next_path(&self) -> Option<&Path> {
        self.next.as_ref().map(|n| n.next_path.as_path())
    }

    /// Whether selection toggles currently have any effect
    pub fn accepts_selection(&self) -> bool {
        matches!(self.state, ItemState::Enriching | ItemState::Ready)
    }

    /// Apply a command. Returns `false` when a guard rejected it; a rejected
    /// command leaves the entity untouched and notifies nobody.
    pub fn apply(&mut self, command: ItemCommand, observer: &mut dyn ItemObserver) -> bool {
        let accepted = match command {
            ItemCommand::SetNextName(next) => self.set_next_name(next),
            ItemCommand::Select(origin) => self.set_selected(true, origin, observer),
            ItemCommand::Deselect(origin) => self.set_selected(false, origin, observer),
            ItemCommand::CommitStart => self.transition(ItemState::Ready, ItemState::Committing),
            ItemCommand::CommitAcknowledged => {
                let accepted = self.transition(ItemState::Committing, ItemState::Done);
                if accepted {
                    self.committed = true;
                    observer.on_committed(self.group.key());
                }
                accepted
            }
            ItemCommand::CommitFailed => self.transition(ItemState::Committing, ItemState::Ready),
            ItemCommand::DisposalDue => {
                let accepted = self.state == ItemState::Done;
                if accepted {
                    observer.on_disposable(self.group.key());
                }
                accepted
            }
        };

        if !accepted {
            trace!(key = %self.key(), state = ?self.state, "Item ignored command");
        }
        accepted
    }

    fn set_next_name(&mut self, next: NextName) -> bool {
        if self.state != ItemState::Enriching {
            return false;
        }
        if &next.key != self.group.key() {
            warn!(key = %self.key(), payload_key = %next.key, "Name addressed to another item");
            return false;
        }
        debug!(key = %self.key(), next_stem = %next.next_stem, "Item named");
        self.next = Some(next);
        self.state = ItemState::Ready;
        true
    }

    fn set_selected(
        &mut self,
        selected: bool,
        origin: Origin,
        observer: &mut dyn ItemObserver,
    ) -> bool {
        if !self.accepts_selection() || self.selected == selected {
            return false;
        }
        self.selected = selected;
        if origin == Origin::User {
            observer.on_selection_changed(self.group.key());
        }
        true
    }

    fn transition(&mut self, from: ItemState, to: ItemState) -> bool {
        if self.state != from {
            return false;
        }
        debug!(key = %self.key(), ?from, ?to, "Item transition");
        self.state = to;
        true
    }
}
