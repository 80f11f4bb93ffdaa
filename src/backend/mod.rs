//! Backend boundary
//!
//! The workflow reaches the outside world through three operations:
//! scanning a source (request/response), starting metadata enrichment
//! (acknowledged on acceptance, results streamed) and committing a batch of
//! renames (acknowledged on acceptance, results streamed). Streamed results
//! travel through an [`EventSink`] that is only live while the matching
//! [`Subscription`] is held.

pub mod classify;
pub mod local;
pub mod naming;

pub use local::{LocalBackend, LocalOptions};

use crate::error::Result;
use crate::group::{FileGroup, GroupKey, NextName, RenameCounts, ScanOutcome};
use crate::workflow::{Stream, WorkflowEvent};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use tracing::{debug, trace};

/// Events produced by a running backend operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// Target name derived for one group
    NameDerived(NextName),
    /// Every group has been looked at
    EnrichmentFinished,
    /// One group was renamed on disk
    GroupCommitted(GroupKey),
    /// One group kept its old name
    GroupFailed { key: GroupKey, message: String },
    /// The batch is over
    CommitFinished(RenameCounts),
}

impl BackendEvent {
    pub fn stream(&self) -> Stream {
        match self {
            BackendEvent::NameDerived(_) | BackendEvent::EnrichmentFinished => Stream::Enrichment,
            BackendEvent::GroupCommitted(_)
            | BackendEvent::GroupFailed { .. }
            | BackendEvent::CommitFinished(_) => Stream::Commit,
        }
    }
}

impl From<BackendEvent> for WorkflowEvent {
    fn from(event: BackendEvent) -> Self {
        match event {
            BackendEvent::NameDerived(next) => WorkflowEvent::NameDerived(next),
            BackendEvent::EnrichmentFinished => WorkflowEvent::EnrichmentFinished,
            BackendEvent::GroupCommitted(key) => WorkflowEvent::GroupCommitted(key),
            BackendEvent::GroupFailed { key, message } => WorkflowEvent::GroupFailed(key, message),
            BackendEvent::CommitFinished(counts) => WorkflowEvent::CommitFinished(counts),
        }
    }
}

/// One group to rename, in commit order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlan {
    pub key: GroupKey,
    pub group: FileGroup,
    pub next_stem: String,
}

/// External collaborator executing the workflow's side effects
pub trait Backend {
    /// Walk `source` and classify every file found into groups
    fn scan(&mut self, source: &Path) -> Result<ScanOutcome>;

    /// Start deriving names for `groups`. Returns once the work is accepted;
    /// results arrive through `sink`.
    fn start_enrichment(&mut self, groups: Vec<FileGroup>, sink: EventSink) -> Result<()>;

    /// Start renaming `plan` in order. Returns once the batch is accepted;
    /// per-group acknowledgements arrive through `sink`.
    fn commit(&mut self, plan: Vec<RenamePlan>, sink: EventSink) -> Result<()>;
}

/// Scoped handle on a stream. Dropping it closes every sink made from it.
#[derive(Debug)]
pub struct Subscription {
    stream: Stream,
    live: Arc<AtomicBool>,
}

impl Subscription {
    pub fn open(stream: Stream) -> Self {
        debug!(?stream, "Subscription opened");
        Self {
            stream,
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn stream(&self) -> Stream {
        self.stream
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Sink delivering into `tx` for as long as this subscription lives
    pub fn sink(&self, tx: Sender<WorkflowEvent>) -> EventSink {
        EventSink {
            stream: self.stream,
            tx,
            live: Arc::clone(&self.live),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.live.store(false, Ordering::SeqCst);
        debug!(stream = ?self.stream, "Subscription released");
    }
}

/// Producer side of a stream, handed to backend workers
#[derive(Debug, Clone)]
pub struct EventSink {
    stream: Stream,
    tx: Sender<WorkflowEvent>,
    live: Arc<AtomicBool>,
}

impl EventSink {
    /// Whether anybody still listens. Workers stop early once this is false.
    pub fn is_open(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Deliver one event. Returns `false` when the subscription is gone, the
    /// receiver hung up or the event belongs to another stream.
    pub fn emit(&self, event: BackendEvent) -> bool {
        if event.stream() != self.stream {
            debug!(expected = ?self.stream, ?event, "Event sent on the wrong stream");
            return false;
        }
        if !self.is_open() {
            trace!(?event, "Subscription closed, event discarded");
            return false;
        }
        self.tx.send(event.into()).is_ok()
    }
}
