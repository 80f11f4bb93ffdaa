//! Phase controller
//!
//! Top-level sequential machine: `collecting -> enriching -> ready ->
//! committing -> done`. It owns the registry and the aggregate counters,
//! requests the backend operations at phase boundaries and routes streamed
//! events to the item entities.

use crate::group::{GroupKey, NextName, RenameCounts, ScanOutcome};
use crate::workflow::item::{ItemCommand, ItemObserver, Origin};
use crate::workflow::registry::Registry;
use crate::workflow::router::{Delivery, route};
use crate::workflow::selection::{self, SelectionSummary};
use crate::workflow::{Effect, Notice, Stream, WorkflowEvent};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Progress of the operation that opens a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Operation requested, waiting for its reply
    Requested,
    /// Operation was refused; waiting for the user to retry
    Failed,
    /// Operation accepted; streamed events are flowing
    Streaming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Collecting(Step),
    Enriching(Step),
    Ready,
    Committing(Step),
    Done,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Collecting(_) => "collecting",
            Phase::Enriching(_) => "enriching",
            Phase::Ready => "ready",
            Phase::Committing(_) => "committing",
            Phase::Done => "done",
        }
    }

    pub fn step(&self) -> Option<Step> {
        match self {
            Phase::Collecting(step) | Phase::Enriching(step) | Phase::Committing(step) => {
                Some(*step)
            }
            Phase::Ready | Phase::Done => None,
        }
    }

    pub fn has_failed(&self) -> bool {
        self.step() == Some(Step::Failed)
    }

    /// Phases in which the session-wide selection handlers run
    fn selection_handlers_active(&self) -> bool {
        matches!(self, Phase::Ready | Phase::Committing(_) | Phase::Done)
    }
}

/// Aggregate counters of a session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub source: PathBuf,
    pub total_file_count: usize,
    pub selection: SelectionSummary,
    pub renamed_file_count: usize,
    pub renamed_group_count: usize,
}

/// Collects upward notifications while the registry is borrowed
#[derive(Debug, Default)]
struct Upward {
    selection_changed: bool,
    committed: Vec<GroupKey>,
    disposable: Vec<GroupKey>,
}

impl ItemObserver for Upward {
    fn on_selection_changed(&mut self, _key: &GroupKey) {
        self.selection_changed = true;
    }

    fn on_committed(&mut self, key: &GroupKey) {
        self.committed.push(key.clone());
    }

    fn on_disposable(&mut self, key: &GroupKey) {
        self.disposable.push(key.clone());
    }
}

#[derive(Debug)]
pub struct PhaseController {
    phase: Phase,
    registry: Registry,
    summary: Summary,
    /// Keys sent with the last commit request
    pending_commit: Vec<GroupKey>,
    done_delay: Duration,
}

impl PhaseController {
    /// Controller that starts by scanning `source`
    pub fn new(source: impl Into<PathBuf>, done_delay: Duration) -> Self {
        Self {
            phase: Phase::Collecting(Step::Requested),
            registry: Registry::new(),
            summary: Summary {
                source: source.into(),
                ..Summary::default()
            },
            pending_commit: Vec::new(),
            done_delay,
        }
    }

    /// Controller for a source the caller already scanned; starts in `enriching`
    pub fn with_collected(
        source: impl Into<PathBuf>,
        outcome: ScanOutcome,
        done_delay: Duration,
    ) -> Self {
        let mut controller = Self::new(source, done_delay);
        controller.populate(outcome);
        controller.phase = Phase::Enriching(Step::Requested);
        controller
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn source(&self) -> &Path {
        &self.summary.source
    }

    /// Effects that open the current phase
    pub fn start(&mut self) -> Vec<Effect> {
        match self.phase {
            Phase::Collecting(_) => {
                self.phase = Phase::Collecting(Step::Requested);
                info!(source = %self.summary.source.display(), "Scanning source");
                vec![Effect::Scan]
            }
            Phase::Enriching(_) => {
                self.phase = Phase::Enriching(Step::Requested);
                info!("Starting metadata enrichment");
                vec![Effect::Subscribe(Stream::Enrichment), Effect::StartEnrichment]
            }
            phase => {
                warn!(
                    phase = phase.name(),
                    "Start requested in a phase without an entry operation"
                );
                Vec::new()
            }
        }
    }

    pub fn handle(&mut self, event: WorkflowEvent) -> Vec<Effect> {
        let mut effects = Vec::new();
        let phase = self.phase;

        match (phase, event) {
            // collecting
            (Phase::Collecting(Step::Requested), WorkflowEvent::ScanSucceeded(outcome)) => {
                self.populate(outcome);
                self.set_phase(Phase::Enriching(Step::Requested));
                effects.push(Effect::Subscribe(Stream::Enrichment));
                effects.push(Effect::StartEnrichment);
            }
            (Phase::Collecting(Step::Requested), WorkflowEvent::ScanFailed(message)) => {
                self.fail(format!("Could not scan the source: {}", message), &mut effects);
            }
            (Phase::Collecting(Step::Failed), WorkflowEvent::Retry) => {
                self.set_phase(Phase::Collecting(Step::Requested));
                effects.push(Effect::Scan);
            }

            // enriching
            (Phase::Enriching(Step::Requested), WorkflowEvent::EnrichmentAccepted) => {
                self.set_phase(Phase::Enriching(Step::Streaming));
            }
            (Phase::Enriching(Step::Requested), WorkflowEvent::EnrichmentFailed(message)) => {
                self.fail(format!("Could not start reading metadata: {}", message), &mut effects);
            }
            (Phase::Enriching(Step::Failed), WorkflowEvent::Retry) => {
                self.set_phase(Phase::Enriching(Step::Requested));
                effects.push(Effect::StartEnrichment);
            }
            (Phase::Enriching(_), WorkflowEvent::NameDerived(next)) => {
                self.deliver_name(next);
            }
            (
                Phase::Enriching(Step::Requested | Step::Streaming),
                WorkflowEvent::EnrichmentFinished,
            ) => {
                effects.push(Effect::Unsubscribe(Stream::Enrichment));
                self.set_phase(Phase::Ready);
            }

            // ready
            (Phase::Ready, WorkflowEvent::CommitRequested) => {
                effects.push(Effect::Subscribe(Stream::Commit));
                self.set_phase(Phase::Committing(Step::Requested));
                self.request_commit(&mut effects);
            }

            // committing
            (Phase::Committing(Step::Requested), WorkflowEvent::CommitAccepted) => {
                self.set_phase(Phase::Committing(Step::Streaming));
                self.start_pending_items(&mut effects);
            }
            (Phase::Committing(Step::Requested), WorkflowEvent::CommitFailed(message)) => {
                self.fail(format!("Could not start renaming: {}", message), &mut effects);
            }
            (Phase::Committing(Step::Failed), WorkflowEvent::Retry) => {
                self.set_phase(Phase::Committing(Step::Requested));
                self.request_commit(&mut effects);
            }
            (Phase::Committing(_), WorkflowEvent::GroupCommitted(key)) => {
                self.route_upward(&key, ItemCommand::CommitAcknowledged, &mut effects);
            }
            (Phase::Committing(_), WorkflowEvent::GroupFailed(key, message)) => {
                warn!(%key, %message, "Group kept its old name");
                self.route_upward(&key, ItemCommand::CommitFailed, &mut effects);
                effects.push(Effect::Notify(Notice::error(format!(
                    "Could not rename {}: {}",
                    key, message
                ))));
            }
            (
                Phase::Committing(Step::Requested | Step::Streaming),
                WorkflowEvent::CommitFinished(counts),
            ) => {
                self.finish_commit(counts, &mut effects);
            }

            // done
            (Phase::Done, WorkflowEvent::RestartRequested) => {
                info!("Restart requested");
                effects.push(Effect::Restart);
            }

            // phase-independent handlers
            (_, WorkflowEvent::Select(key)) => {
                self.route_upward(&key, ItemCommand::Select(Origin::User), &mut effects);
            }
            (_, WorkflowEvent::Deselect(key)) => {
                self.route_upward(&key, ItemCommand::Deselect(Origin::User), &mut effects);
            }
            (phase, WorkflowEvent::ToggleSelectAll) if phase.selection_handlers_active() => {
                let mut upward = Upward::default();
                self.summary.selection = selection::toggle_all(&mut self.registry, &mut upward);
            }
            (_, WorkflowEvent::DisposalDue(key)) => {
                self.route_upward(&key, ItemCommand::DisposalDue, &mut effects);
            }

            (phase, event) => {
                debug!(phase = phase.name(), ?event, "Event ignored in this phase");
            }
        }

        effects
    }

    fn set_phase(&mut self, next: Phase) {
        if self.phase != next {
            info!(from = ?self.phase, to = ?next, "Workflow phase changed");
            self.phase = next;
        }
    }

    fn fail(&mut self, message: String, effects: &mut Vec<Effect>) {
        error!(phase = self.phase.name(), %message, "Phase operation failed");
        if let Some(Step::Requested) = self.phase.step() {
            let failed = match self.phase {
                Phase::Collecting(_) => Phase::Collecting(Step::Failed),
                Phase::Enriching(_) => Phase::Enriching(Step::Failed),
                Phase::Committing(_) => Phase::Committing(Step::Failed),
                other => other,
            };
            self.set_phase(failed);
        }
        effects.push(Effect::Notify(Notice::error(message)));
    }

    fn populate(&mut self, outcome: ScanOutcome) {
        match self.registry.populate(outcome.file_groups) {
            Ok(_) => {
                self.summary.total_file_count = outcome.file_count;
                self.summary.selection = SelectionSummary::recompute(&self.registry);
            }
            Err(e) => warn!(error = %e, "Ignoring second scan result"),
        }
    }

    fn deliver_name(&mut self, next: NextName) {
        let key = next.key.clone();
        let mut upward = Upward::default();
        if route(&mut self.registry, &key, ItemCommand::SetNextName(next), &mut upward)
            == Delivery::Rejected
        {
            debug!(%key, "Item was already named");
        }
    }

    fn request_commit(&mut self, effects: &mut Vec<Effect>) {
        self.pending_commit = self.registry.commit_candidates();
        info!(groups = self.pending_commit.len(), "Requesting rename of selected groups");
        effects.push(Effect::Commit(self.pending_commit.clone()));
    }

    fn start_pending_items(&mut self, effects: &mut Vec<Effect>) {
        for key in std::mem::take(&mut self.pending_commit) {
            self.route_upward(&key, ItemCommand::CommitStart, effects);
        }
    }

    fn finish_commit(&mut self, counts: RenameCounts, effects: &mut Vec<Effect>) {
        self.summary.renamed_file_count = counts.file_count;
        self.summary.renamed_group_count = counts.group_count;
        effects.push(Effect::Unsubscribe(Stream::Commit));
        self.set_phase(Phase::Done);
        info!(
            files = counts.file_count,
            groups = counts.group_count,
            failed = counts.failed_group_count,
            "Rename batch finished"
        );
        let renamed = format!(
            "Renamed {} files in {} groups",
            counts.file_count, counts.group_count
        );
        let notice = match counts.failed_group_count {
            0 => Notice::success(renamed),
            failed => Notice::error(format!("{}, {} groups failed", renamed, failed)),
        };
        effects.push(Effect::Notify(notice));
    }

    /// Route a command and act on whatever the item reports back
    fn route_upward(&mut self, key: &GroupKey, command: ItemCommand, effects: &mut Vec<Effect>) {
        let mut upward = Upward::default();
        route(&mut self.registry, key, command, &mut upward);

        for key in upward.committed {
            effects.push(Effect::ScheduleDisposal {
                key,
                after: self.done_delay,
            });
        }
        let disposed = !upward.disposable.is_empty();
        for key in &upward.disposable {
            self.registry.dispose(key);
        }
        if upward.selection_changed || disposed {
            self.summary.selection = SelectionSummary::recompute(&self.registry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::fixtures::{image, next_name, uncertain};
    use crate::workflow::ItemState;

    const DELAY: Duration = Duration::from_millis(500);

    fn outcome(keys: &[&str]) -> ScanOutcome {
        ScanOutcome {
            file_groups: keys.iter().map(|k| image(k)).collect(),
            file_count: keys.len(),
        }
    }

    fn ready_controller(keys: &[&str]) -> PhaseController {
        let mut c = PhaseController::new("/src", DELAY);
        c.start();
        c.handle(WorkflowEvent::ScanSucceeded(outcome(keys)));
        c.handle(WorkflowEvent::EnrichmentAccepted);
        for key in keys {
            c.handle(WorkflowEvent::NameDerived(next_name(key, &format!("n-{}", key))));
        }
        c.handle(WorkflowEvent::EnrichmentFinished);
        assert_eq!(c.phase(), Phase::Ready);
        c
    }

    fn key(k: &str) -> GroupKey {
        GroupKey::new(k)
    }

    #[test]
    fn test_start_requests_scan() {
        let mut c = PhaseController::new("/src", DELAY);
        assert_eq!(c.start(), vec![Effect::Scan]);
        assert_eq!(c.phase(), Phase::Collecting(Step::Requested));
        assert_eq!(c.source(), Path::new("/src"));
    }

    #[test]
    fn test_scan_success_enters_enriching() {
        let mut c = PhaseController::new("/src", DELAY);
        c.start();
        let mut scan = outcome(&["a", "b"]);
        scan.file_groups.push(uncertain("q"));
        scan.file_count = 7;

        let effects = c.handle(WorkflowEvent::ScanSucceeded(scan));
        assert_eq!(
            effects,
            vec![Effect::Subscribe(Stream::Enrichment), Effect::StartEnrichment]
        );
        assert_eq!(c.phase(), Phase::Enriching(Step::Requested));
        assert_eq!(c.registry().len(), 2);
        assert_eq!(c.registry().uncertain().len(), 1);
        assert_eq!(c.summary().total_file_count, 7);
        assert_eq!(c.summary().selection.selected_count, 2);
        assert!(c.summary().selection.selected_all);
    }

    #[test]
    fn test_enrichment_failure_stays_and_retries() {
        let mut c = PhaseController::new("/src", DELAY);
        c.start();
        c.handle(WorkflowEvent::ScanSucceeded(outcome(&["a"])));

        let effects = c.handle(WorkflowEvent::EnrichmentFailed("busy".into()));
        assert_eq!(c.phase(), Phase::Enriching(Step::Failed));
        assert!(matches!(effects.as_slice(), [Effect::Notify(n)] if n.message.contains("busy")));

        // Retry re-issues only the trigger; the subscription is still held
        assert_eq!(c.handle(WorkflowEvent::Retry), vec![Effect::StartEnrichment]);
        assert_eq!(c.phase(), Phase::Enriching(Step::Requested));
    }

    #[test]
    fn test_retry_ignored_unless_failed() {
        let mut c = ready_controller(&["a"]);
        assert!(c.handle(WorkflowEvent::Retry).is_empty());
        assert_eq!(c.phase(), Phase::Ready);
    }

    #[test]
    fn test_enrichment_finished_releases_subscription() {
        let mut c = PhaseController::new("/src", DELAY);
        c.start();
        c.handle(WorkflowEvent::ScanSucceeded(outcome(&["a"])));
        c.handle(WorkflowEvent::EnrichmentAccepted);
        let effects = c.handle(WorkflowEvent::EnrichmentFinished);
        assert_eq!(effects, vec![Effect::Unsubscribe(Stream::Enrichment)]);
        assert_eq!(c.phase(), Phase::Ready);
        // No name ever arrived: the item stays parked
        assert_eq!(c.registry().get(&key("a")).unwrap().state(), ItemState::Enriching);
    }

    #[test]
    fn test_names_after_enriching_are_ignored() {
        let mut c = ready_controller(&["a"]);
        c.handle(WorkflowEvent::NameDerived(next_name("a", "late")));
        assert_eq!(c.registry().get(&key("a")).unwrap().next_stem(), Some("n-a"));
    }

    #[test]
    fn test_with_collected_skips_scan() {
        let mut c = PhaseController::with_collected("/src", outcome(&["a", "b"]), DELAY);
        assert_eq!(c.phase(), Phase::Enriching(Step::Requested));
        assert_eq!(c.registry().len(), 2);
        assert_eq!(
            c.start(),
            vec![Effect::Subscribe(Stream::Enrichment), Effect::StartEnrichment]
        );
    }

    #[test]
    fn test_commit_sends_selected_keys_in_order() {
        let mut c = ready_controller(&["a", "b", "c"]);
        c.handle(WorkflowEvent::Deselect(key("b")));

        let effects = c.handle(WorkflowEvent::CommitRequested);
        assert_eq!(
            effects,
            vec![
                Effect::Subscribe(Stream::Commit),
                Effect::Commit(vec![key("a"), key("c")]),
            ]
        );
        // Items enter committing only once the batch is accepted
        assert_eq!(c.registry().get(&key("a")).unwrap().state(), ItemState::Ready);
        c.handle(WorkflowEvent::CommitAccepted);
        assert_eq!(c.registry().get(&key("a")).unwrap().state(), ItemState::Committing);
        assert_eq!(c.registry().get(&key("b")).unwrap().state(), ItemState::Ready);
    }

    #[test]
    fn test_commit_failure_recomputes_keys_on_retry() {
        let mut c = ready_controller(&["a", "b"]);
        c.handle(WorkflowEvent::CommitRequested);
        c.handle(WorkflowEvent::CommitFailed("disk".into()));
        assert_eq!(c.phase(), Phase::Committing(Step::Failed));

        // Items are still ready, so the user may change the selection
        c.handle(WorkflowEvent::Deselect(key("a")));
        assert_eq!(c.handle(WorkflowEvent::Retry), vec![Effect::Commit(vec![key("b")])]);
    }

    #[test]
    fn test_commit_ack_schedules_disposal() {
        let mut c = ready_controller(&["a"]);
        c.handle(WorkflowEvent::CommitRequested);
        c.handle(WorkflowEvent::CommitAccepted);

        let effects = c.handle(WorkflowEvent::GroupCommitted(key("a")));
        assert_eq!(
            effects,
            vec![Effect::ScheduleDisposal {
                key: key("a"),
                after: DELAY
            }]
        );
        assert!(c.registry().get(&key("a")).unwrap().is_committed());

        c.handle(WorkflowEvent::DisposalDue(key("a")));
        assert!(c.registry().is_empty());
        assert!(c.summary().selection.selected_all);
        assert_eq!(c.summary().selection.selected_count, 0);

        // Idempotent per key
        assert!(c.handle(WorkflowEvent::DisposalDue(key("a"))).is_empty());
    }

    #[test]
    fn test_commit_finished_records_counts() {
        let mut c = ready_controller(&["a"]);
        c.handle(WorkflowEvent::CommitRequested);
        c.handle(WorkflowEvent::CommitAccepted);
        let effects = c.handle(WorkflowEvent::CommitFinished(RenameCounts {
            file_count: 3,
            group_count: 1,
            failed_group_count: 0,
        }));

        assert_eq!(c.phase(), Phase::Done);
        assert_eq!(effects[0], Effect::Unsubscribe(Stream::Commit));
        assert!(matches!(
            &effects[1],
            Effect::Notify(n) if n.level == crate::workflow::NoticeLevel::Success
        ));
        assert_eq!(c.summary().renamed_file_count, 3);
        assert_eq!(c.summary().renamed_group_count, 1);
    }

    #[test]
    fn test_group_failure_returns_item_to_ready() {
        let mut c = ready_controller(&["a", "b"]);
        c.handle(WorkflowEvent::CommitRequested);
        c.handle(WorkflowEvent::CommitAccepted);
        c.handle(WorkflowEvent::GroupCommitted(key("a")));

        let effects = c.handle(WorkflowEvent::GroupFailed(key("b"), "target taken".into()));
        assert_eq!(
            effects,
            vec![Effect::Notify(Notice::error("Could not rename b: target taken"))]
        );
        assert_eq!(c.registry().get(&key("b")).unwrap().state(), ItemState::Ready);
        assert!(!c.registry().get(&key("b")).unwrap().is_committed());

        let effects = c.handle(WorkflowEvent::CommitFinished(RenameCounts {
            file_count: 1,
            group_count: 1,
            failed_group_count: 1,
        }));
        assert_eq!(c.phase(), Phase::Done);
        assert_eq!(
            effects,
            vec![
                Effect::Unsubscribe(Stream::Commit),
                Effect::Notify(Notice::error("Renamed 1 files in 1 groups, 1 groups failed")),
            ]
        );
    }

    #[test]
    fn test_restart_only_from_done() {
        let mut c = ready_controller(&["a"]);
        assert!(c.handle(WorkflowEvent::RestartRequested).is_empty());
        c.handle(WorkflowEvent::CommitRequested);
        c.handle(WorkflowEvent::CommitAccepted);
        c.handle(WorkflowEvent::CommitFinished(RenameCounts::default()));
        assert_eq!(c.handle(WorkflowEvent::RestartRequested), vec![Effect::Restart]);
    }

    #[test]
    fn test_toggle_all_inactive_while_enriching() {
        let mut c = PhaseController::new("/src", DELAY);
        c.start();
        c.handle(WorkflowEvent::ScanSucceeded(outcome(&["a"])));
        c.handle(WorkflowEvent::ToggleSelectAll);
        assert!(c.registry().get(&key("a")).unwrap().is_selected());
    }

    #[test]
    fn test_user_toggle_while_enriching_updates_aggregates() {
        let mut c = PhaseController::new("/src", DELAY);
        c.start();
        c.handle(WorkflowEvent::ScanSucceeded(outcome(&["a", "b"])));
        c.handle(WorkflowEvent::Deselect(key("a")));
        assert_eq!(c.summary().selection.selected_count, 1);
        assert!(!c.summary().selection.selected_all);
    }

    #[test]
    fn test_selected_count_invariant_over_event_sequence() {
        let mut c = ready_controller(&["a", "b", "c", "d"]);
        let events = vec![
            WorkflowEvent::Deselect(key("a")),
            WorkflowEvent::Deselect(key("a")),
            WorkflowEvent::ToggleSelectAll,
            WorkflowEvent::Deselect(key("c")),
            WorkflowEvent::ToggleSelectAll,
            WorkflowEvent::ToggleSelectAll,
            WorkflowEvent::Select(key("b")),
            WorkflowEvent::Select(key("missing")),
            WorkflowEvent::CommitRequested,
            WorkflowEvent::CommitAccepted,
            WorkflowEvent::GroupCommitted(key("b")),
            WorkflowEvent::ToggleSelectAll,
            WorkflowEvent::DisposalDue(key("b")),
            WorkflowEvent::ToggleSelectAll,
        ];

        for event in events {
            c.handle(event);
            let actual = c.registry().items().filter(|i| i.is_selected()).count();
            let summary = c.summary().selection;
            assert_eq!(summary.selected_count, actual);
            assert_eq!(summary.selected_all, actual == c.registry().len());
        }
    }
}
