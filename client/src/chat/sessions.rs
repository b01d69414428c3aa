use super::{ChatClient, LocalChange};
use crate::transform::to_display;
use ragchat_shared::Session;

impl ChatClient {
    async fn fetch_sessions(&self, operation: &str) -> Option<Vec<Session>> {
        match self.backend.list_sessions().await {
            Ok(sessions) => {
                tracing::debug!(count = sessions.len(), %operation, "fetched sessions");
                Some(sessions)
            }
            Err(e) => {
                self.notifier.report(operation, &e);
                None
            }
        }
    }

    /// Replaces the local store with the backend's list. Creations and
    /// deletions made while the request was in flight are kept.
    pub async fn list_sessions(&self) -> Option<Vec<Session>> {
        let (epoch, started) = {
            let state = self.lock();
            (state.epoch, state.revision)
        };
        let sessions = self.fetch_sessions("list_sessions").await?;

        let mut state = self.lock();
        if state.epoch != epoch {
            tracing::debug!("session list from a previous login dropped");
            return Some(sessions);
        }
        state.apply_fetched(started, sessions);
        Some(state.sessions.clone())
    }

    /// Creates a session, registers it locally and makes it active.
    pub async fn create_session(&self) -> Option<String> {
        let epoch = self.lock().epoch;
        let id = match self.backend.create_session().await {
            Ok(id) => id,
            Err(e) => {
                self.notifier.report("create_session", &e);
                return None;
            }
        };

        let mut state = self.lock();
        if state.epoch != epoch {
            tracing::debug!(session_id = %id, "session created after logout not registered");
            return None;
        }
        tracing::info!(session_id = %id, "session created");
        state.record(LocalChange::Created(Session::empty(id.clone())));
        state.supersede(Some(id.clone()));
        state.messages.clear();
        state.loading = false;
        Some(id)
    }

    pub async fn delete_session(&self, id: &str) -> bool {
        let epoch = self.lock().epoch;
        if let Err(e) = self.backend.delete_session(id).await {
            self.notifier.report("delete_session", &e);
            return false;
        }

        tracing::info!(session_id = %id, "session deleted");
        {
            let mut state = self.lock();
            if state.epoch == epoch {
                state.record(LocalChange::Deleted(id.to_string()));
                if state.is_active(id) {
                    state.supersede(None);
                    state.messages.clear();
                    state.loading = false;
                }
            }
        }
        self.notifier.succeed("Session deleted successfully!");
        true
    }

    /// Switches the message pane to `id`, re-fetching history first. A failed
    /// fetch is reported and the local copy is used instead.
    pub async fn set_active(&self, id: &str) {
        let (epoch, ticket, started) = {
            let mut state = self.lock();
            let ticket = state.supersede(Some(id.to_string()));
            state.loading = true;
            (state.epoch, ticket, state.revision)
        };

        let fetched = self.fetch_sessions("set_active").await;

        let mut state = self.lock();
        if state.epoch != epoch {
            return;
        }
        if let Some(sessions) = fetched {
            state.apply_fetched(started, sessions);
        }
        // A later activation, creation or delete owns the pane now.
        if state.activation == ticket {
            state.messages = to_display(state.session(id).map(|s| s.messages.as_slice()));
            state.loading = false;
        }
    }
}
