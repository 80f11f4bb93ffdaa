//! Selection aggregates over the registry

use crate::workflow::item::{ItemCommand, ItemObserver, Origin};
use crate::workflow::registry::Registry;
use tracing::debug;

/// "Selected count" and "all selected" for the renameable items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionSummary {
    pub selected_count: usize,
    /// True when every live item is selected, including the empty registry
    pub selected_all: bool,
}

impl Default for SelectionSummary {
    fn default() -> Self {
        Self {
            selected_count: 0,
            selected_all: true,
        }
    }
}

impl SelectionSummary {
    /// Full scan of every item's flag. Used after every notification instead
    /// of an incremental counter.
    pub fn recompute(registry: &Registry) -> Self {
        let selected_count = registry.items().filter(|item| item.is_selected()).count();
        Self {
            selected_count,
            selected_all: selected_count == registry.len(),
        }
    }
}

/// Direction chosen by a toggle-all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleDirection {
    SelectAll,
    DeselectAll,
}

/// Broadcast select or deselect to every item, depending on whether all are
/// currently selected, and return the new aggregates.
pub fn toggle_all(registry: &mut Registry, observer: &mut dyn ItemObserver) -> SelectionSummary {
    let every_selected = registry.items().all(|item| item.is_selected());
    let direction = if every_selected {
        ToggleDirection::DeselectAll
    } else {
        ToggleDirection::SelectAll
    };

    // Items that refuse toggles (committing or done) keep their flag, so the
    // broadcast direction only describes the result when all of them accept.
    let all_toggleable = registry.items().all(|item| item.accepts_selection());

    let command = match direction {
        ToggleDirection::SelectAll => ItemCommand::Select(Origin::Parent),
        ToggleDirection::DeselectAll => ItemCommand::Deselect(Origin::Parent),
    };
    let accepted = registry.broadcast(&command, observer);
    debug!(?direction, accepted, all_toggleable, "Toggled selection of all items");

    if !all_toggleable {
        return SelectionSummary::recompute(registry);
    }
    match direction {
        ToggleDirection::SelectAll => SelectionSummary {
            selected_count: registry.len(),
            selected_all: true,
        },
        ToggleDirection::DeselectAll => SelectionSummary {
            selected_count: 0,
            selected_all: registry.is_empty(),
        },
    }
}
