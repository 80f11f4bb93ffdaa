//! Keyed routing of streamed events to item entities
//!
//! Every streamed event that targets a file group carries the group key. The
//! router hands it to the entity registered under that key, or drops it when
//! no such entity lives (it may have been disposed already).

use crate::group::GroupKey;
use crate::workflow::item::{ItemCommand, ItemObserver};
use crate::workflow::registry::Registry;
use tracing::debug;

/// Outcome of routing one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The item accepted the command
    Delivered,
    /// The item exists but its guards rejected the command
    Rejected,
    /// No item under that key
    Dropped,
}

pub fn route(
    registry: &mut Registry,
    key: &GroupKey,
    command: ItemCommand,
    observer: &mut dyn ItemObserver,
) -> Delivery {
    match registry.send(key, command, observer) {
        Some(true) => Delivery::Delivered,
        Some(false) => Delivery::Rejected,
        None => {
            debug!(%key, "No live item for routed event, dropping");
            Delivery::Dropped
        }
    }
}
