//! Rename workflow: phase controller, item entities and their registry
//!
//! The workflow never performs I/O. Every input arrives as a
//! [`WorkflowEvent`] and every side effect leaves as an [`Effect`] that the
//! [`Driver`](crate::driver::Driver) executes against a backend.

pub mod item;
pub mod phase;
pub mod registry;
pub mod router;
pub mod selection;
pub mod session;
pub mod view;

pub use item::{ItemCommand, ItemEntity, ItemObserver, ItemState, Origin};
pub use phase::{Phase, PhaseController, Step, Summary};
pub use registry::Registry;
pub use router::{Delivery, route};
pub use selection::SelectionSummary;
pub use session::Session;
pub use view::{ViewFilter, ViewRegion};

use crate::group::{GroupKey, NextName, RenameCounts, ScanOutcome};
use std::time::Duration;

/// Long-lived event sources the workflow subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Enrichment,
    Commit,
}

/// Everything the workflow reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    // Replies to request/response operations
    ScanSucceeded(ScanOutcome),
    ScanFailed(String),
    EnrichmentAccepted,
    EnrichmentFailed(String),
    CommitAccepted,
    CommitFailed(String),

    // Streamed events
    NameDerived(NextName),
    EnrichmentFinished,
    GroupCommitted(GroupKey),
    /// A group could not be renamed; carries the reason
    GroupFailed(GroupKey, String),
    CommitFinished(RenameCounts),

    // User actions
    Select(GroupKey),
    Deselect(GroupKey),
    ToggleSelectAll,
    CommitRequested,
    /// Re-issue the operation of a phase whose start failed
    Retry,
    RestartRequested,
    ShowView(ViewFilter),

    /// Display delay of a committed item elapsed
    DisposalDue(GroupKey),
}

impl WorkflowEvent {
    /// Stream this event was delivered on, if any
    pub fn stream(&self) -> Option<Stream> {
        match self {
            WorkflowEvent::NameDerived(_) | WorkflowEvent::EnrichmentFinished => {
                Some(Stream::Enrichment)
            }
            WorkflowEvent::GroupCommitted(_)
            | WorkflowEvent::GroupFailed(..)
            | WorkflowEvent::CommitFinished(_) => Some(Stream::Commit),
            _ => None,
        }
    }
}

/// Side effects requested by the workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Scan,
    StartEnrichment,
    /// Commit these groups, in this order
    Commit(Vec<GroupKey>),
    Subscribe(Stream),
    Unsubscribe(Stream),
    ScheduleDisposal { key: GroupKey, after: Duration },
    Notify(Notice),
    /// Tear this session down and go back to picking a source
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }
}
