//! Chat state: the session store, the active-session tracker and the
//! dispatcher that sends messages.

mod dispatch;
mod sessions;

pub use dispatch::SendOutcome;

use crate::api::Backend;
use crate::attachment::Attachment;
use crate::notice::Notifier;
use crate::transform::DisplayMessage;
use parking_lot::{Mutex, MutexGuard};
use ragchat_shared::{RagMode, Session};
use std::sync::Arc;

/// What the user is composing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    pub text: String,
    pub image: Option<Attachment>,
    pub rag_mode: RagMode,
}

impl Draft {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty() && self.image.is_none()
    }

    /// Text and image are cleared on send; the retrieval mode sticks.
    fn clear_content(&mut self) {
        self.text.clear();
        self.image = None;
    }
}

/// A store mutation made while a fetched list may still be in flight.
#[derive(Debug, Clone)]
enum LocalChange {
    Created(Session),
    Deleted(String),
}

#[derive(Debug, Clone, Default)]
pub struct ChatState {
    pub sessions: Vec<Session>,
    pub active: Option<String>,
    pub messages: Vec<DisplayMessage>,
    pub draft: Draft,
    /// Path typed into the attach field; reset once a send settles.
    pub file_input: String,
    /// A send is between Ensure-Session and Settled.
    pub busy: bool,
    /// An activation is re-fetching history.
    pub loading: bool,
    /// Bumped on logout; tasks started under an older epoch drop their results.
    epoch: u64,
    /// Bumped by every activation, creation or active-session delete.
    activation: u64,
    revision: u64,
    /// Revision at which the last applied fetch started.
    synced: u64,
    pending: Vec<(u64, LocalChange)>,
}

impl ChatState {
    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.as_deref() == Some(id)
    }

    fn record(&mut self, change: LocalChange) {
        match &change {
            LocalChange::Created(session) => self.sessions.push(session.clone()),
            LocalChange::Deleted(id) => self.sessions.retain(|s| &s.id != id),
        }
        self.revision += 1;
        self.pending.push((self.revision, change));
    }

    /// Takes over the message pane from any in-flight activation.
    fn supersede(&mut self, active: Option<String>) -> u64 {
        self.active = active;
        self.activation += 1;
        self.activation
    }

    /// Installs a list fetched at `started`, replaying local changes made
    /// since. A list older than the one already applied is ignored.
    fn apply_fetched(&mut self, started: u64, mut fetched: Vec<Session>) {
        if started < self.synced {
            return;
        }
        for (revision, change) in &self.pending {
            if *revision <= started {
                continue;
            }
            match change {
                LocalChange::Created(session) => {
                    if !fetched.iter().any(|s| s.id == session.id) {
                        fetched.push(session.clone());
                    }
                }
                LocalChange::Deleted(id) => fetched.retain(|s| &s.id != id),
            }
        }
        self.pending.retain(|(revision, _)| *revision > started);
        self.synced = started;
        self.sessions = fetched;
    }
}

#[derive(Clone)]
pub struct ChatClient {
    backend: Arc<dyn Backend>,
    notifier: Arc<Notifier>,
    state: Arc<Mutex<ChatState>>,
}

impl ChatClient {
    pub fn new(backend: Arc<dyn Backend>, notifier: Arc<Notifier>) -> Self {
        Self {
            backend,
            notifier,
            state: Arc::new(Mutex::new(ChatState::default())),
        }
    }

    pub fn snapshot(&self) -> ChatState {
        self.state.lock().clone()
    }

    pub fn view<R>(&self, f: impl FnOnce(&ChatState) -> R) -> R {
        f(&self.state.lock())
    }

    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    pub fn set_text(&self, text: impl Into<String>) {
        self.state.lock().draft.text = text.into();
    }

    pub fn edit_text(&self, f: impl FnOnce(&mut String)) {
        f(&mut self.state.lock().draft.text);
    }

    pub fn set_rag_mode(&self, mode: RagMode) {
        self.state.lock().draft.rag_mode = mode;
    }

    pub fn attach(&self, image: Attachment) {
        let mut state = self.state.lock();
        state.file_input = image
            .source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| image.name.clone());
        state.draft.image = Some(image);
    }

    pub fn edit_file_input(&self, f: impl FnOnce(&mut String)) {
        f(&mut self.state.lock().file_input);
    }

    pub fn detach(&self) {
        let mut state = self.state.lock();
        state.draft.image = None;
        state.file_input.clear();
    }

    /// Drops all chat state, used on logout. Work still in flight from the
    /// previous login no longer writes here.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        let epoch = state.epoch + 1;
        *state = ChatState {
            epoch,
            ..ChatState::default()
        };
    }

    fn lock(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock()
    }
}
