//! Cooperative event loop
//!
//! The driver owns a [`Session`], a [`Backend`] and the single inbound queue
//! every stream writes into. Events are handled one at a time to completion;
//! the effects they produce are executed before the next event is taken.

use crate::backend::{Backend, RenamePlan, Subscription};
use crate::group::{FileGroup, GroupKey};
use crate::workflow::{Effect, Notice, NoticeLevel, Phase, Session, Stream, WorkflowEvent};
use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

pub struct Driver<B: Backend> {
    session: Session,
    backend: B,
    tx: Sender<WorkflowEvent>,
    inbox: Receiver<WorkflowEvent>,
    subscriptions: HashMap<Stream, Subscription>,
    /// Pending disposal timers, in scheduling order
    timers: Vec<(Instant, GroupKey)>,
    notices: Vec<Notice>,
    restart: bool,
}

impl<B: Backend> Driver<B> {
    pub fn new(session: Session, backend: B) -> Self {
        let (tx, inbox) = mpsc::channel();
        Self {
            session,
            backend,
            tx,
            inbox,
            subscriptions: HashMap::new(),
            timers: Vec::new(),
            notices: Vec::new(),
            restart: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run the entry operation of the session's first phase
    pub fn start(&mut self) {
        let effects = self.session.start();
        self.run(VecDeque::new(), effects);
    }

    /// Handle one event, plus every reply it triggers, to completion
    pub fn dispatch(&mut self, event: WorkflowEvent) {
        let mut queue = VecDeque::from([event]);
        self.run_queue(&mut queue);
    }

    /// Wait up to `timeout` for stream events or due timers and handle
    /// everything available. Returns the number of events handled.
    pub fn pump(&mut self, timeout: Duration) -> usize {
        let wait = self
            .next_deadline()
            .map(|at| at.saturating_duration_since(Instant::now()).min(timeout))
            .unwrap_or(timeout);

        let mut handled = 0;
        match self.inbox.recv_timeout(wait) {
            Ok(event) => handled += self.accept_streamed(event),
            Err(RecvTimeoutError::Timeout) => {}
            // The driver holds a sender, so the channel never disconnects
            Err(RecvTimeoutError::Disconnected) => {}
        }
        while let Ok(event) = self.inbox.try_recv() {
            handled += self.accept_streamed(event);
        }

        handled + self.fire_due_timers()
    }

    /// Pump until `done` holds for the session. Returns `false` as soon as
    /// the current phase reports a failed operation.
    pub fn pump_until(&mut self, poll: Duration, done: impl Fn(&Session) -> bool) -> bool {
        loop {
            if done(&self.session) {
                return true;
            }
            if self.session.phase().has_failed() {
                return false;
            }
            self.pump(poll);
        }
    }

    /// Notices produced since the last call
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Whether the session asked to be torn down
    pub fn restart_requested(&self) -> bool {
        self.restart
    }

    pub fn has_pending_timers(&self) -> bool {
        !self.timers.is_empty()
    }

    pub fn is_subscribed(&self, stream: Stream) -> bool {
        self.subscriptions.contains_key(&stream)
    }

    fn accept_streamed(&mut self, event: WorkflowEvent) -> usize {
        if let Some(stream) = event.stream() {
            if !self.is_subscribed(stream) {
                trace!(?stream, ?event, "No live subscription, dropping event");
                return 0;
            }
        }
        self.dispatch(event);
        1
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|(at, _)| *at).min()
    }

    fn fire_due_timers(&mut self) -> usize {
        let now = Instant::now();
        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.timers)
            .into_iter()
            .partition(|(at, _)| *at <= now);
        self.timers = pending;

        let fired = due.len();
        for (_, key) in due {
            self.dispatch(WorkflowEvent::DisposalDue(key));
        }
        fired
    }

    fn run_queue(&mut self, queue: &mut VecDeque<WorkflowEvent>) {
        while let Some(event) = queue.pop_front() {
            let effects = self.session.handle(event);
            for effect in effects {
                if let Some(reply) = self.execute(effect) {
                    queue.push_back(reply);
                }
            }
        }
    }

    fn run(&mut self, mut queue: VecDeque<WorkflowEvent>, effects: Vec<Effect>) {
        for effect in effects {
            if let Some(reply) = self.execute(effect) {
                queue.push_back(reply);
            }
        }
        self.run_queue(&mut queue);
    }

    /// Execute one effect; request/response operations return their reply
    fn execute(&mut self, effect: Effect) -> Option<WorkflowEvent> {
        trace!(?effect, "Executing effect");
        match effect {
            Effect::Scan => {
                let source = self.session.summary().source.clone();
                Some(match self.backend.scan(&source) {
                    Ok(outcome) => WorkflowEvent::ScanSucceeded(outcome),
                    Err(e) => WorkflowEvent::ScanFailed(e.to_string()),
                })
            }
            Effect::StartEnrichment => {
                let Some(sink) = self.sink(Stream::Enrichment) else {
                    return Some(WorkflowEvent::EnrichmentFailed("not subscribed".to_string()));
                };
                let groups: Vec<FileGroup> = self
                    .session
                    .registry()
                    .items()
                    .map(|item| item.group().clone())
                    .collect();
                Some(match self.backend.start_enrichment(groups, sink) {
                    Ok(()) => WorkflowEvent::EnrichmentAccepted,
                    Err(e) => WorkflowEvent::EnrichmentFailed(e.to_string()),
                })
            }
            Effect::Commit(keys) => {
                let Some(sink) = self.sink(Stream::Commit) else {
                    return Some(WorkflowEvent::CommitFailed("not subscribed".to_string()));
                };
                let plan = self.rename_plan(&keys);
                Some(match self.backend.commit(plan, sink) {
                    Ok(()) => WorkflowEvent::CommitAccepted,
                    Err(e) => WorkflowEvent::CommitFailed(e.to_string()),
                })
            }
            Effect::Subscribe(stream) => {
                self.subscriptions
                    .entry(stream)
                    .or_insert_with(|| Subscription::open(stream));
                None
            }
            Effect::Unsubscribe(stream) => {
                self.subscriptions.remove(&stream);
                None
            }
            Effect::ScheduleDisposal { key, after } => {
                debug!(%key, ?after, "Disposal scheduled");
                self.timers.push((Instant::now() + after, key));
                None
            }
            Effect::Notify(notice) => {
                match notice.level {
                    NoticeLevel::Success => info!(message = %notice.message, "Notice"),
                    NoticeLevel::Error => error!(message = %notice.message, "Notice"),
                }
                self.notices.push(notice);
                None
            }
            Effect::Restart => {
                self.restart = true;
                self.subscriptions.clear();
                self.timers.clear();
                None
            }
        }
    }

    fn sink(&self, stream: Stream) -> Option<crate::backend::EventSink> {
        self.subscriptions
            .get(&stream)
            .map(|subscription| subscription.sink(self.tx.clone()))
    }

    fn rename_plan(&self, keys: &[GroupKey]) -> Vec<RenamePlan> {
        let registry = self.session.registry();
        keys.iter()
            .filter_map(|key| {
                let item = registry.get(key)?;
                match item.next_stem() {
                    Some(next_stem) => Some(RenamePlan {
                        key: key.clone(),
                        group: item.group().clone(),
                        next_stem: next_stem.to_string(),
                    }),
                    None => {
                        warn!(%key, "Commit key has no target name, skipping");
                        None
                    }
                }
            })
            .collect()
    }
}

/// Whether a session has nothing left to do in its phase
pub fn is_settled(session: &Session) -> bool {
    matches!(session.phase(), Phase::Ready | Phase::Done)
}
