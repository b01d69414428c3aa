//! Failure classification and transient notices.
//!
//! Every backend failure goes through [`Notifier::report`], which sorts it
//! into [`FailureKind::Unauthorized`] or [`FailureKind::Generic`]. Expiry of
//! notices and delayed navigation are driven by [`Notifier::tick`], which the
//! event loop calls with the current instant.

use crate::api::ApiError;
use crate::app::Screen;
use crate::credentials::SessionContext;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const SESSION_EXPIRED: &str = "Session expired. Redirecting to login...";
pub const GENERIC_FAILURE: &str = "An error occurred while connecting to the chat.";

const HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

impl NoticeKind {
    pub fn title(self) -> &'static str {
        match self {
            NoticeKind::Success => "Success",
            NoticeKind::Error => "Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    pub raised_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Unauthorized,
    Generic,
}

impl FailureKind {
    pub fn classify(err: &ApiError) -> Self {
        if err.is_unauthorized() {
            FailureKind::Unauthorized
        } else {
            FailureKind::Generic
        }
    }
}

#[derive(Debug)]
struct Redirect {
    screen: Screen,
    due: Instant,
    teardown: bool,
}

#[derive(Debug, Default)]
struct Board {
    current: Option<Notice>,
    redirect: Option<Redirect>,
    history: VecDeque<Notice>,
}

impl Board {
    fn raise(&mut self, kind: NoticeKind, text: String, now: Instant) {
        let notice = Notice {
            kind,
            text,
            raised_at: now,
        };
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(notice.clone());
        self.current = Some(notice);
    }
}

pub struct Notifier {
    context: Arc<SessionContext>,
    delay: Duration,
    board: Mutex<Board>,
}

impl Notifier {
    pub fn new(context: Arc<SessionContext>, delay: Duration) -> Self {
        Self {
            context,
            delay,
            board: Mutex::new(Board::default()),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.context
    }

    pub fn report(&self, operation: &str, err: &ApiError) -> FailureKind {
        self.report_at(operation, err, GENERIC_FAILURE, Instant::now())
    }

    /// Like [`Notifier::report`] but with a caller-specific generic message.
    pub fn report_as(&self, operation: &str, err: &ApiError, generic: &str) -> FailureKind {
        self.report_at(operation, err, generic, Instant::now())
    }

    pub fn report_at(
        &self,
        operation: &str,
        err: &ApiError,
        generic: &str,
        now: Instant,
    ) -> FailureKind {
        let kind = FailureKind::classify(err);
        let mut board = self.board.lock();
        match kind {
            FailureKind::Unauthorized => {
                tracing::warn!(%operation, "credential rejected: {err}");
                self.context.revoke_token();
                board.raise(NoticeKind::Error, SESSION_EXPIRED.to_string(), now);
                board.redirect = Some(Redirect {
                    screen: Screen::Login,
                    due: now + self.delay,
                    teardown: true,
                });
            }
            FailureKind::Generic => {
                tracing::error!(%operation, "backend call failed: {err}");
                board.raise(NoticeKind::Error, generic.to_string(), now);
            }
        }
        kind
    }

    pub fn succeed(&self, text: impl Into<String>) {
        self.board
            .lock()
            .raise(NoticeKind::Success, text.into(), Instant::now());
    }

    pub fn fail(&self, text: impl Into<String>) {
        self.board
            .lock()
            .raise(NoticeKind::Error, text.into(), Instant::now());
    }

    /// Schedules navigation once the notice delay has elapsed. A pending
    /// forced logout is never replaced.
    pub fn navigate_after(&self, screen: Screen) {
        let mut board = self.board.lock();
        if board.redirect.as_ref().is_some_and(|r| r.teardown) {
            return;
        }
        board.redirect = Some(Redirect {
            screen,
            due: Instant::now() + self.delay,
            teardown: false,
        });
    }

    /// Expires the current notice and fires a due redirect.
    pub fn tick(&self, now: Instant) -> Option<Screen> {
        let mut board = self.board.lock();
        if board
            .current
            .as_ref()
            .is_some_and(|n| now >= n.raised_at + self.delay)
        {
            board.current = None;
        }

        if !board.redirect.as_ref().is_some_and(|r| now >= r.due) {
            return None;
        }
        let redirect = board.redirect.take()?;
        drop(board);

        if redirect.teardown {
            self.context.teardown();
        }
        tracing::info!(screen = ?redirect.screen, "navigating after notice");
        Some(redirect.screen)
    }

    pub fn current(&self) -> Option<Notice> {
        self.board.lock().current.clone()
    }

    pub fn dismiss(&self) {
        self.board.lock().current = None;
    }

    pub fn history(&self) -> Vec<Notice> {
        self.board.lock().history.iter().cloned().collect()
    }
}
