use super::ChatClient;
use crate::api::ChatRequest;
use crate::transform::DisplayMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty text and no image.
    Skipped,
    /// Another send is still in flight.
    Busy,
    Replied,
    /// The reply arrived after the user switched sessions and was not shown.
    Detached,
    /// Reported through the notifier.
    Failed,
}

impl ChatClient {
    /// Sends the current draft.
    ///
    /// Ensures a session exists, appends the user's message straight away,
    /// then waits for the bot. `busy` stays set from the first await until
    /// the reply (or failure) has been applied.
    pub async fn send(&self) -> SendOutcome {
        let (draft, active) = {
            let mut state = self.lock();
            if state.busy {
                return SendOutcome::Busy;
            }
            if state.draft.is_blank() {
                return SendOutcome::Skipped;
            }
            state.busy = true;
            (state.draft.clone(), state.active.clone())
        };

        let session_id = match active {
            Some(id) => id,
            None => match self.create_session().await {
                Some(id) => id,
                None => {
                    self.settle();
                    return SendOutcome::Failed;
                }
            },
        };

        {
            let mut state = self.lock();
            let preview = draft.image.as_ref().map(|image| image.local_uri());
            state
                .messages
                .push(DisplayMessage::user(draft.text.clone(), preview));
            state.draft.clear_content();
        }

        tracing::debug!(
            session_id = %session_id,
            rag_mode = %draft.rag_mode,
            has_image = draft.image.is_some(),
            "sending chat message"
        );
        let request = ChatRequest {
            message: draft.text,
            session_id: session_id.clone(),
            rag_mode: draft.rag_mode,
            image: draft.image,
        };
        let result = self.backend.chat(request).await;

        let outcome = match result {
            Ok(reply) => {
                let mut state = self.lock();
                if state.is_active(&session_id) {
                    state.messages.push(DisplayMessage::bot(reply.message, reply.image));
                    SendOutcome::Replied
                } else {
                    tracing::debug!(session_id = %session_id, "reply for inactive session not shown");
                    SendOutcome::Detached
                }
            }
            Err(e) => {
                self.notifier.report("send", &e);
                SendOutcome::Failed
            }
        };
        self.settle();
        outcome
    }

    fn settle(&self) {
        let mut state = self.lock();
        state.busy = false;
        state.file_input.clear();
    }
}
