#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use ragchat::api::{ApiError, Backend, ChatRequest, FileScope};
use ragchat::attachment::Attachment;
use ragchat::credentials::{CredentialStore, MemoryStore, SessionContext, IS_ADMIN_KEY, TOKEN_KEY, USERNAME_KEY};
use ragchat::notice::Notifier;
use ragchat::ChatClient;
use ragchat_shared::{
    AuthRequest, ChatReply, FileRecord, LoginResponse, RagMode, RawMessage, RegisterResponse, Role,
    Session, Tags, UploadReply, UserRecord,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

pub const DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Register(String),
    Login(String),
    ListSessions,
    CreateSession,
    DeleteSession(String),
    Chat {
        message: String,
        session_id: String,
        rag_mode: RagMode,
        image: Option<String>,
    },
    ListUsers,
    ListFiles(FileScope),
    Upload {
        scope: FileScope,
        names: Vec<String>,
        tags: String,
    },
}

/// In-memory backend that records every call and can be told to fail.
pub struct MockBackend {
    calls: Mutex<Vec<Call>>,
    sessions: Mutex<Vec<Session>>,
    failures: Mutex<HashMap<&'static str, u16>>,
    reply: Mutex<ChatReply>,
    gate: Mutex<Option<Arc<Notify>>>,
    held_lists: Mutex<Option<Vec<Arc<Notify>>>>,
    next_id: Mutex<usize>,
    pub users: Mutex<Vec<UserRecord>>,
    pub files: Mutex<Vec<FileRecord>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            sessions: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            reply: Mutex::new(ChatReply {
                message: "ok".into(),
                image: None,
                session_id: None,
            }),
            gate: Mutex::new(None),
            held_lists: Mutex::new(None),
            next_id: Mutex::new(0),
            users: Mutex::new(Vec::new()),
            files: Mutex::new(Vec::new()),
        }
    }
}

impl MockBackend {
    pub fn with_sessions(sessions: Vec<Session>) -> Self {
        let backend = Self::default();
        *backend.sessions.lock() = sessions;
        backend
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Makes `operation` fail with `status` until cleared.
    pub fn fail(&self, operation: &'static str, status: u16) {
        self.failures.lock().insert(operation, status);
    }

    pub fn recover(&self, operation: &'static str) {
        self.failures.lock().remove(operation);
    }

    pub fn reply_with(&self, message: &str, image: Option<&str>) {
        *self.reply.lock() = ChatReply {
            message: message.into(),
            image: image.map(str::to_string),
            session_id: None,
        };
    }

    /// Holds every chat call until the returned handle is notified.
    pub fn hold_chat(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(gate.clone());
        gate
    }

    /// Holds every later `list_sessions` call, each answering with the list
    /// as it was when the call arrived, until released by arrival index.
    pub fn hold_lists(&self) {
        *self.held_lists.lock() = Some(Vec::new());
    }

    pub fn release_list(&self, index: usize) {
        if let Some(held) = self.held_lists.lock().as_ref() {
            held[index].notify_one();
        }
    }

    pub fn held_list_count(&self) -> usize {
        self.held_lists.lock().as_ref().map_or(0, Vec::len)
    }

    pub fn server_sessions(&self) -> Vec<Session> {
        self.sessions.lock().clone()
    }

    fn record(&self, operation: &'static str, call: Call) -> Result<(), ApiError> {
        self.calls.lock().push(call);
        match self.failures.lock().get(operation) {
            Some(401) => Err(ApiError::Unauthorized {
                detail: "Invalid token: Signature has expired".into(),
            }),
            Some(status) => Err(ApiError::Status {
                status: *status,
                detail: format!("{operation} failed"),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn register(&self, request: &AuthRequest) -> Result<RegisterResponse, ApiError> {
        self.record("register", Call::Register(request.username.clone()))?;
        Ok(RegisterResponse {
            message: "User registered successfully".into(),
            username: Some(request.username.clone()),
        })
    }

    async fn login(&self, request: &AuthRequest) -> Result<LoginResponse, ApiError> {
        self.record("login", Call::Login(request.username.clone()))?;
        Ok(LoginResponse {
            access_token: format!("token-for-{}", request.username),
            token_type: Some("bearer".into()),
            username: request.username.clone(),
            is_admin: request.username == "admin",
            message: "Login successful".into(),
        })
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, ApiError> {
        self.record("list_sessions", Call::ListSessions)?;
        let sessions = self.sessions.lock().clone();
        let gate = self.held_lists.lock().as_mut().map(|held| {
            let gate = Arc::new(Notify::new());
            held.push(gate.clone());
            gate
        });
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(sessions)
    }

    async fn create_session(&self) -> Result<String, ApiError> {
        self.record("create_session", Call::CreateSession)?;
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            format!("new-{}", *next)
        };
        self.sessions.lock().push(Session::empty(id.clone()));
        Ok(id)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError> {
        self.record("delete_session", Call::DeleteSession(session_id.to_string()))?;
        self.sessions.lock().retain(|s| s.id != session_id);
        Ok(())
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, ApiError> {
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.record(
            "chat",
            Call::Chat {
                message: request.message.clone(),
                session_id: request.session_id.clone(),
                rag_mode: request.rag_mode,
                image: request.image.as_ref().map(|i| i.name.clone()),
            },
        )?;

        let reply = self.reply.lock().clone();
        if let Some(session) = self
            .sessions
            .lock()
            .iter_mut()
            .find(|s| s.id == request.session_id)
        {
            session.messages.push(RawMessage::new(Role::User, request.message));
            session.messages.push(RawMessage::new(Role::Assistant, reply.message.clone()));
            session.message_count = session.messages.len();
        }
        Ok(reply)
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, ApiError> {
        self.record("list_users", Call::ListUsers)?;
        Ok(self.users.lock().clone())
    }

    async fn list_files(&self, scope: FileScope) -> Result<Vec<FileRecord>, ApiError> {
        self.record("list_files", Call::ListFiles(scope))?;
        Ok(self.files.lock().clone())
    }

    async fn upload_files(
        &self,
        scope: FileScope,
        files: Vec<Attachment>,
        tags: String,
    ) -> Result<UploadReply, ApiError> {
        let names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
        self.record(
            "upload_files",
            Call::Upload {
                scope,
                names: names.clone(),
                tags: tags.clone(),
            },
        )?;
        let mut stored = self.files.lock();
        for name in names {
            let id = (stored.len() + 1).to_string();
            stored.push(FileRecord {
                id,
                filename: name,
                uploader: None,
                role: None,
                upload_time: "2025-01-22 10:00:00".into(),
                collection_name: None,
                tags: Tags::Joined(tags.clone()),
            });
        }
        Ok(UploadReply {
            message: "All Files uploaded successfully".into(),
        })
    }
}

pub fn session(id: &str, messages: &[(&str, &str)]) -> Session {
    let messages: Vec<RawMessage> = messages
        .iter()
        .map(|(role, content)| RawMessage::new(Role::from(role.to_string()), *content))
        .collect();
    Session {
        id: id.to_string(),
        message_count: messages.len(),
        messages,
    }
}

pub fn signed_in_context(is_admin: bool) -> Arc<SessionContext> {
    let store = MemoryStore::new();
    store.set(TOKEN_KEY, "tok").unwrap();
    store.set(USERNAME_KEY, "ada").unwrap();
    store
        .set(IS_ADMIN_KEY, if is_admin { "true" } else { "false" })
        .unwrap();
    Arc::new(SessionContext::init(Box::new(store)))
}

pub struct Harness {
    pub backend: Arc<MockBackend>,
    pub notifier: Arc<Notifier>,
    pub chat: ChatClient,
}

pub fn harness(backend: MockBackend) -> Harness {
    let backend = Arc::new(backend);
    let notifier = Arc::new(Notifier::new(signed_in_context(false), DELAY));
    let chat = ChatClient::new(backend.clone(), notifier.clone());
    Harness {
        backend,
        notifier,
        chat,
    }
}

/// Polls until `check` holds, yielding to other tasks in between.
pub async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not reached");
}
