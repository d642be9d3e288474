//! Assistant Session
//!
//! Owns the interaction state machine for the coach panel:
//!
//! ```text
//!            submit(text)                 answer
//!   Idle ───────────────→ Pending ─────────────────→ Answered
//!    ↑                     │  ↑  \                      │
//!    │                     │  └──┘ submit (ignored)     │
//!    │                     │        failure             │
//!    │                     └────────────────────→ Failed│
//!    └──────────────── dismiss ◄────────────────────────┘
//! ```
//!
//! Only one request is ever in flight. A submit while `Pending` is dropped,
//! not queued, so answers can never arrive out of order. Every transition is
//! a single update of the watch channel, so the pending check and the state
//! change cannot interleave with another event.
//!
//! An answer takes its speech ticket inside the same update that shows it,
//! then speech is handed to the blocking pool. A newer answer shown before
//! the older one reaches the engine makes the older one silent.

use std::sync::{Arc, Mutex, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::coach::client::Coach;
use crate::coach::error::AskError;
use crate::types::{is_blank, Answer};
use crate::voice::announcer::SpeechAnnouncer;

/// Shown for every failure kind
pub const FALLBACK_MESSAGE: &str =
    "Sorry, I'm having trouble connecting to the store data right now.";

/// What the coach panel shows
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InteractionState {
    /// Nothing asked yet, input enabled
    #[default]
    Idle,
    /// A request is in flight, input disabled
    Pending,
    /// Last request succeeded
    Answered(Answer),
    /// Last request failed; holds the user-facing fallback message
    Failed(String),
}

impl InteractionState {
    pub fn is_pending(&self) -> bool {
        matches!(self, InteractionState::Pending)
    }

    /// Whether a new question would be accepted
    pub fn accepts_input(&self) -> bool {
        !self.is_pending()
    }

    pub fn answer(&self) -> Option<&Answer> {
        match self {
            InteractionState::Answered(answer) => Some(answer),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            InteractionState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Result of a submit call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The question was sent
    Dispatched,
    /// Empty or whitespace-only text, nothing happened
    EmptyQuestion,
    /// A request is already in flight, nothing happened
    AlreadyPending,
}

type StateCell = watch::Sender<InteractionState>;

/// Single-flight question session for one store
pub struct AssistantSession {
    store_id: i64,
    coach: Arc<dyn Coach>,
    announcer: Arc<SpeechAnnouncer>,
    state: Arc<StateCell>,
    in_flight: Mutex<Option<JoinHandle<()>>>,
    /// Request tasks not yet finished, speech hand-off included
    tasks: Arc<watch::Sender<usize>>,
}

/// Counts a request task until it finishes or is aborted
struct TaskGuard(Arc<watch::Sender<usize>>);

impl TaskGuard {
    fn enter(tasks: &Arc<watch::Sender<usize>>) -> Self {
        tasks.send_modify(|n| *n += 1);
        Self(Arc::clone(tasks))
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl AssistantSession {
    pub fn new(store_id: i64, coach: Arc<dyn Coach>, announcer: Arc<SpeechAnnouncer>) -> Self {
        let (state, _) = watch::channel(InteractionState::Idle);
        let (tasks, _) = watch::channel(0);
        Self {
            store_id,
            coach,
            announcer,
            state: Arc::new(state),
            in_flight: Mutex::new(None),
            tasks: Arc::new(tasks),
        }
    }

    pub fn store_id(&self) -> i64 {
        self.store_id
    }

    /// Snapshot of the current state
    pub fn state(&self) -> InteractionState {
        self.state.borrow().clone()
    }

    /// Receiver that sees every state change, for rendering
    pub fn subscribe(&self) -> watch::Receiver<InteractionState> {
        self.state.subscribe()
    }

    /// Ask a question.
    ///
    /// Must be called from within a tokio runtime; the request runs on a
    /// spawned task and resolves into the state asynchronously.
    pub fn submit(&self, text: &str) -> SubmitOutcome {
        if is_blank(text) {
            debug!("Ignoring empty question");
            return SubmitOutcome::EmptyQuestion;
        }

        let mut dispatched = false;
        self.state.send_if_modified(|state| {
            if state.is_pending() {
                return false;
            }
            *state = InteractionState::Pending;
            dispatched = true;
            true
        });

        if !dispatched {
            debug!("Ignoring question while another is pending");
            return SubmitOutcome::AlreadyPending;
        }

        info!(store_id = self.store_id, "Question submitted");

        let coach = Arc::clone(&self.coach);
        let announcer = Arc::clone(&self.announcer);
        let state = Arc::downgrade(&self.state);
        let store_id = self.store_id;
        let question = text.to_string();
        let guard = TaskGuard::enter(&self.tasks);

        let handle = tokio::spawn(async move {
            let _guard = guard;
            let result = coach.ask(store_id, &question).await;
            resolve(&state, &announcer, result).await;
        });

        // Any previous handle belongs to a request that already resolved and
        // at most has speech left to hand off; it keeps running detached
        *self.in_flight.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);

        SubmitOutcome::Dispatched
    }

    /// Clear a shown answer or failure.
    ///
    /// Leaves a pending request alone; its answer still lands. Does not stop
    /// audio that is already playing. Returns whether the state changed.
    pub fn dismiss(&self) -> bool {
        self.state.send_if_modified(|state| match state {
            InteractionState::Answered(_) | InteractionState::Failed(_) => {
                *state = InteractionState::Idle;
                true
            }
            InteractionState::Idle | InteractionState::Pending => false,
        })
    }

    /// Wait until no request is pending and return the resulting state
    pub async fn settled(&self) -> InteractionState {
        let mut rx = self.state.subscribe();
        let settled = match rx.wait_for(|state| !state.is_pending()).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        settled
    }

    /// Wait until every dispatched request has resolved and handed its
    /// answer to the speech engine
    pub async fn drained(&self) {
        let mut rx = self.tasks.subscribe();
        let _ = rx.wait_for(|running| *running == 0).await;
    }

    /// Abort the in-flight request, if any. The state is left as is.
    pub fn shutdown(&self) {
        if let Some(handle) = self.in_flight.lock().unwrap_or_else(|e| e.into_inner()).take() {
            if !handle.is_finished() {
                debug!("Aborting in-flight coach request");
                handle.abort();
            }
        }
    }
}

impl Drop for AssistantSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Apply a request result to the session, if the session still exists
async fn resolve(
    state: &Weak<StateCell>,
    announcer: &Arc<SpeechAnnouncer>,
    result: Result<Answer, AskError>,
) {
    let Some(state) = state.upgrade() else {
        debug!("Session closed before the coach answered, dropping response");
        return;
    };

    match result {
        Ok(answer) => {
            let text = answer.text.clone();
            let mut ticket = None;
            state.send_if_modified(|current| {
                if !current.is_pending() {
                    return false;
                }
                *current = InteractionState::Answered(answer);
                ticket = Some(announcer.next_ticket());
                true
            });
            drop(state);

            let Some(ticket) = ticket else {
                return;
            };
            info!(chars = text.chars().count(), ticket, "Coach answered");

            // Engines may run child processes; keep them off the executor
            let announcer = Arc::clone(announcer);
            let spoken =
                tokio::task::spawn_blocking(move || announcer.announce_ticket(ticket, &text)).await;
            if let Err(e) = spoken {
                warn!("Speech hand-off failed: {}", e);
            }
        }
        Err(e) => {
            warn!(kind = e.kind(), "Coach request failed: {}", e);
            state.send_if_modified(|current| {
                if !current.is_pending() {
                    return false;
                }
                *current = InteractionState::Failed(FALLBACK_MESSAGE.to_string());
                true
            });
        }
    }
}
