//! One rename session: the phase controller plus the parallel view region

use crate::group::ScanOutcome;
use crate::workflow::phase::{Phase, PhaseController, Summary};
use crate::workflow::registry::Registry;
use crate::workflow::view::{ViewFilter, ViewRegion};
use crate::workflow::{Effect, WorkflowEvent};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
pub struct Session {
    controller: PhaseController,
    view: ViewRegion,
}

impl Session {
    /// Session that scans `source` first
    pub fn new(source: impl Into<PathBuf>, done_delay: Duration) -> Self {
        Self {
            controller: PhaseController::new(source, done_delay),
            view: ViewRegion::default(),
        }
    }

    /// Session over groups collected by the caller; starts enriching
    pub fn from_collected(
        source: impl Into<PathBuf>,
        outcome: ScanOutcome,
        done_delay: Duration,
    ) -> Self {
        Self {
            controller: PhaseController::with_collected(source, outcome, done_delay),
            view: ViewRegion::default(),
        }
    }

    pub fn start(&mut self) -> Vec<Effect> {
        self.controller.start()
    }

    pub fn handle(&mut self, event: WorkflowEvent) -> Vec<Effect> {
        match event {
            WorkflowEvent::ShowView(filter) => {
                debug!(?filter, "View changed");
                self.view.navigate(filter);
                Vec::new()
            }
            event => self.controller.handle(event),
        }
    }

    pub fn phase(&self) -> Phase {
        self.controller.phase()
    }

    pub fn view(&self) -> ViewFilter {
        self.view.current()
    }

    pub fn registry(&self) -> &Registry {
        self.controller.registry()
    }

    pub fn summary(&self) -> &Summary {
        self.controller.summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::fixtures::{image, next_name, uncertain, unsupported};
    use crate::group::{GroupKey, RenameCounts};
    use crate::workflow::{ItemState, NoticeLevel, Step, Stream};

    const DELAY: Duration = Duration::from_secs(1);

    fn key(k: &str) -> GroupKey {
        GroupKey::new(k)
    }

    fn batch() -> ScanOutcome {
        ScanOutcome {
            file_groups: vec![
                image("a"),
                uncertain("q"),
                image("b"),
                unsupported("u"),
                image("c"),
            ],
            file_count: 7,
        }
    }

    fn enriched_session() -> Session {
        let mut session = Session::new("/src", DELAY);
        session.start();
        session.handle(WorkflowEvent::ScanSucceeded(batch()));
        session.handle(WorkflowEvent::EnrichmentAccepted);
        for k in ["a", "b", "c"] {
            session.handle(WorkflowEvent::NameDerived(next_name(k, &format!("2024-{}", k))));
        }
        session.handle(WorkflowEvent::EnrichmentFinished);
        session
    }

    #[test]
    fn test_batch_is_partitioned_and_named() {
        let session = enriched_session();
        assert_eq!(session.phase(), Phase::Ready);
        assert_eq!(session.registry().len(), 3);
        assert_eq!(session.registry().uncertain().len(), 1);
        assert_eq!(session.registry().unsupported().len(), 1);
        assert!(session.registry().items().all(|i| i.state() == ItemState::Ready));
        assert_eq!(session.summary().selection.selected_count, 3);
        assert!(session.summary().selection.selected_all);
    }

    #[test]
    fn test_toggle_all_after_enrichment_deselects_every_item() {
        let mut session = Session::new("/src", DELAY);
        session.start();
        session.handle(WorkflowEvent::ScanSucceeded(batch()));
        assert_eq!(session.registry().len(), 3);
        assert_eq!(session.registry().uncertain().len(), 1);
        assert_eq!(session.registry().unsupported().len(), 1);

        session.handle(WorkflowEvent::EnrichmentAccepted);
        for k in ["a", "b", "c"] {
            session.handle(WorkflowEvent::NameDerived(next_name(k, &format!("2024-{}", k))));
        }
        session.handle(WorkflowEvent::EnrichmentFinished);
        assert_eq!(session.phase(), Phase::Ready);
        assert!(session.registry().items().all(|i| i.state() == ItemState::Ready));
        assert!(session.summary().selection.selected_all);

        assert!(session.handle(WorkflowEvent::ToggleSelectAll).is_empty());
        assert_eq!(session.summary().selection.selected_count, 0);
        assert!(!session.summary().selection.selected_all);
        assert!(session.registry().items().all(|i| !i.is_selected()));
    }

    #[test]
    fn test_commit_subset_runs_to_done() {
        let mut session = enriched_session();
        session.handle(WorkflowEvent::Deselect(key("b")));

        let effects = session.handle(WorkflowEvent::CommitRequested);
        assert!(effects.contains(&Effect::Commit(vec![key("a"), key("c")])));

        session.handle(WorkflowEvent::CommitAccepted);
        let mut scheduled = Vec::new();
        for k in ["a", "c"] {
            scheduled.extend(session.handle(WorkflowEvent::GroupCommitted(key(k))));
        }
        assert_eq!(scheduled.len(), 2);

        let effects = session.handle(WorkflowEvent::CommitFinished(RenameCounts {
            file_count: 2,
            group_count: 2,
            failed_group_count: 0,
        }));
        assert_eq!(session.phase(), Phase::Done);
        assert!(effects.contains(&Effect::Unsubscribe(Stream::Commit)));
        assert_eq!(session.summary().renamed_file_count, 2);
        assert_eq!(session.summary().renamed_group_count, 2);

        for k in ["a", "c"] {
            session.handle(WorkflowEvent::DisposalDue(key(k)));
        }
        let remaining: Vec<&str> = session.registry().items().map(|i| i.key().as_str()).collect();
        assert_eq!(remaining, vec!["b"]);
    }

    #[test]
    fn test_scan_failure_stays_collecting() {
        let mut session = Session::new("/missing", DELAY);
        session.start();
        let effects = session.handle(WorkflowEvent::ScanFailed("not found".into()));

        assert_eq!(session.phase(), Phase::Collecting(Step::Failed));
        assert_eq!(effects.len(), 1);
        assert!(matches!(&effects[0], Effect::Notify(n) if n.level == NoticeLevel::Error));
        assert!(!session.registry().is_populated());

        assert_eq!(session.handle(WorkflowEvent::Retry), vec![Effect::Scan]);
    }

    #[test]
    fn test_toggle_racing_commit_ack_is_discarded() {
        let mut session = enriched_session();
        session.handle(WorkflowEvent::CommitRequested);
        session.handle(WorkflowEvent::CommitAccepted);

        session.handle(WorkflowEvent::GroupCommitted(key("a")));
        session.handle(WorkflowEvent::Deselect(key("a")));

        let item = session.registry().get(&key("a")).unwrap();
        assert_eq!(item.state(), ItemState::Done);
        assert!(item.is_committed());
        assert!(item.is_selected());
        assert_eq!(session.summary().selection.selected_count, 3);
    }

    #[test]
    fn test_view_region_runs_in_parallel() {
        let mut session = enriched_session();
        assert_eq!(session.view(), ViewFilter::ToRename);

        assert!(session.handle(WorkflowEvent::ShowView(ViewFilter::Uncertain)).is_empty());
        assert_eq!(session.view(), ViewFilter::Uncertain);
        assert_eq!(session.phase(), Phase::Ready);

        session.handle(WorkflowEvent::CommitRequested);
        assert_eq!(session.view(), ViewFilter::Uncertain);
    }

    #[test]
    fn test_from_collected_enriches_first() {
        let mut session = Session::from_collected("/src", batch(), DELAY);
        assert_eq!(session.phase(), Phase::Enriching(Step::Requested));
        assert_eq!(
            session.start(),
            vec![Effect::Subscribe(Stream::Enrichment), Effect::StartEnrichment]
        );
        assert_eq!(session.summary().total_file_count, 7);
    }
}
