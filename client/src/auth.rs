use crate::api::Backend;
use crate::app::Screen;
use crate::notice::Notifier;
use ragchat_shared::AuthRequest;
use std::sync::Arc;

#[derive(Clone)]
pub struct Auth {
    backend: Arc<dyn Backend>,
    notifier: Arc<Notifier>,
}

impl Auth {
    pub fn new(backend: Arc<dyn Backend>, notifier: Arc<Notifier>) -> Self {
        Self { backend, notifier }
    }

    /// Stores the returned credentials and heads to the chat after the notice.
    pub async fn login(&self, username: &str, password: &str) -> bool {
        let request = AuthRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = match self.backend.login(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%username, "login rejected: {e}");
                self.notifier.fail(e.detail().unwrap_or("Login failed."));
                return false;
            }
        };

        if let Err(e) = self.notifier.context().establish(&response) {
            tracing::error!("failed to persist credentials: {e}");
            self.notifier.fail("Login failed.");
            return false;
        }
        self.notifier.succeed(response.message);
        self.notifier.navigate_after(Screen::Chat);
        true
    }

    pub async fn register(&self, username: &str, password: &str) -> bool {
        let request = AuthRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        match self.backend.register(&request).await {
            Ok(response) => {
                tracing::info!(%username, "registered");
                self.notifier.succeed(response.message);
                self.notifier.navigate_after(Screen::Login);
                true
            }
            Err(e) => {
                tracing::warn!(%username, "registration rejected: {e}");
                self.notifier.fail(e.detail().unwrap_or("Registration failed."));
                false
            }
        }
    }

    pub fn logout(&self) {
        tracing::info!("logout");
        self.notifier.context().teardown();
    }
}
