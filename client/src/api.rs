use crate::attachment::Attachment;
use crate::credentials::SessionContext;
use async_trait::async_trait;
use ragchat_shared::{
    AuthRequest, ChatReply, CreatedSession, ErrorBody, FileRecord, LoginResponse, RagMode,
    RegisterResponse, Session, SessionList, UploadReply, UserRecord,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized: {detail}")]
    Unauthorized { detail: String },
    #[error("backend returned {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Human-readable detail supplied by the backend, when there is one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { detail } | ApiError::Status { detail, .. }
                if !detail.is_empty() =>
            {
                Some(detail.as_str())
            }
            _ => None,
        }
    }
}

/// Which side of the file endpoints a dashboard talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileScope {
    Admin,
    User,
}

impl FileScope {
    pub fn for_admin(is_admin: bool) -> Self {
        if is_admin {
            FileScope::Admin
        } else {
            FileScope::User
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            FileScope::Admin => "/admin",
            FileScope::User => "/user",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
    pub rag_mode: RagMode,
    pub image: Option<Attachment>,
}

/// Everything the client needs from the backend.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn register(&self, request: &AuthRequest) -> Result<RegisterResponse, ApiError>;
    async fn login(&self, request: &AuthRequest) -> Result<LoginResponse, ApiError>;

    async fn list_sessions(&self) -> Result<Vec<Session>, ApiError>;
    async fn create_session(&self) -> Result<String, ApiError>;
    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError>;
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, ApiError>;

    async fn list_users(&self) -> Result<Vec<UserRecord>, ApiError>;
    async fn list_files(&self, scope: FileScope) -> Result<Vec<FileRecord>, ApiError>;
    async fn upload_files(
        &self,
        scope: FileScope,
        files: Vec<Attachment>,
        tags: String,
    ) -> Result<UploadReply, ApiError>;
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
    context: Arc<SessionContext>,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        context: Arc<SessionContext>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            context,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match self.context.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        builder: RequestBuilder,
    ) -> Result<T, ApiError> {
        let res = checked(endpoint, builder.send().await?).await?;
        let body = res.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }
}

async fn checked(endpoint: &str, res: Response) -> Result<Response, ApiError> {
    let status = res.status();
    tracing::debug!(%endpoint, status = status.as_u16(), "backend responded");
    if status.is_success() {
        return Ok(res);
    }

    let text = res.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.detail)
        .map(|detail| detail.into_text())
        .unwrap_or_else(|| {
            if text.trim().is_empty() {
                status.canonical_reason().unwrap_or_default().to_string()
            } else {
                text
            }
        });

    if status == StatusCode::UNAUTHORIZED {
        Err(ApiError::Unauthorized { detail })
    } else {
        Err(ApiError::Status {
            status: status.as_u16(),
            detail,
        })
    }
}

fn attachment_part(attachment: Attachment) -> Result<Part, ApiError> {
    let mime = attachment.mime.clone();
    Ok(Part::bytes(attachment.bytes)
        .file_name(attachment.name)
        .mime_str(&mime)?)
}

#[async_trait]
impl Backend for HttpBackend {
    async fn register(&self, request: &AuthRequest) -> Result<RegisterResponse, ApiError> {
        let builder = self.request(Method::POST, "/auth/register").json(request);
        self.send("/auth/register", builder).await
    }

    async fn login(&self, request: &AuthRequest) -> Result<LoginResponse, ApiError> {
        let builder = self.request(Method::POST, "/auth/login").json(request);
        self.send("/auth/login", builder).await
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, ApiError> {
        let builder = self.request(Method::GET, "/chat/sessions");
        let list: SessionList = self.send("/chat/sessions", builder).await?;
        Ok(list.sessions)
    }

    async fn create_session(&self) -> Result<String, ApiError> {
        let builder = self.request(Method::POST, "/chat/create_session");
        let created: CreatedSession = self.send("/chat/create_session", builder).await?;
        Ok(created.session_id)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError> {
        let path = format!("/chat/sessions/{session_id}");
        let res = self.request(Method::DELETE, &path).send().await?;
        checked(&path, res).await?;
        Ok(())
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, ApiError> {
        let mut form = Form::new()
            .text("message", request.message)
            .text("session_id", request.session_id)
            .text("rag_mode", request.rag_mode.as_str());
        if let Some(image) = request.image {
            form = form.part("image", attachment_part(image)?);
        }
        let builder = self.request(Method::POST, "/chat/chat_ai").multipart(form);
        self.send("/chat/chat_ai", builder).await
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, ApiError> {
        let builder = self.request(Method::GET, "/admin/users");
        self.send("/admin/users", builder).await
    }

    async fn list_files(&self, scope: FileScope) -> Result<Vec<FileRecord>, ApiError> {
        let path = format!("{}/list_files", scope.prefix());
        let builder = self.request(Method::GET, &path);
        self.send(&path, builder).await
    }

    async fn upload_files(
        &self,
        scope: FileScope,
        files: Vec<Attachment>,
        tags: String,
    ) -> Result<UploadReply, ApiError> {
        let path = format!("{}/upload", scope.prefix());
        let mut form = Form::new();
        for file in files {
            form = form.part("files", attachment_part(file)?);
        }
        form = form.text("tags", tags);
        let builder = self.request(Method::POST, &path).multipart(form);
        self.send(&path, builder).await
    }
}
