use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a message as recorded by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    System,
    User,
    Assistant,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Other(name) => name,
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "system" => Role::System,
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => Role::Other(value),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    // Locally synthesized records carry `text` instead of `content`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl RawMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            text: None,
            image: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "session_id")]
    pub id: String,
    #[serde(rename = "messages_count", default)]
    pub message_count: usize,
    #[serde(default)]
    pub messages: Vec<RawMessage>,
}

impl Session {
    /// A freshly created session as registered locally before any re-fetch.
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message_count: 0,
            messages: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionList {
    pub sessions: Vec<Session>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedSession {
    pub session_id: String,
}

/// Which knowledge source the chat endpoint consults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RagMode {
    #[serde(rename = "user")]
    User,
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "no-rag")]
    NoRag,
}

impl RagMode {
    pub const ALL: [RagMode; 3] = [RagMode::User, RagMode::All, RagMode::NoRag];

    pub fn as_str(self) -> &'static str {
        match self {
            RagMode::User => "user",
            RagMode::All => "all",
            RagMode::NoRag => "no-rag",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RagMode::User => "User Data Only",
            RagMode::All => "All Data (Admin)",
            RagMode::NoRag => "Direct Chatbot Response",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == value)
    }
}

impl fmt::Display for RagMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Tags arrive either as the comma-joined string sent at upload or as a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tags {
    Joined(String),
    List(Vec<String>),
}

impl Default for Tags {
    fn default() -> Self {
        Tags::Joined(String::new())
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tags::Joined(joined) => f.write_str(joined),
            Tags::List(list) => f.write_str(&list.join(", ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub upload_time: String,
    #[serde(default)]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReply {
    pub message: String,
}

/// Error body shape used by the backend for non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_detail::Detail>,
}

pub mod serde_detail {
    use serde::Deserialize;

    /// `detail` is a plain string for handled errors and a structured list for
    /// request validation failures.
    #[derive(Debug, Clone, Deserialize)]
    #[serde(untagged)]
    pub enum Detail {
        Text(String),
        Structured(Vec<StructuredDetail>),
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct StructuredDetail {
        #[serde(default)]
        pub msg: String,
    }

    impl Detail {
        pub fn into_text(self) -> String {
            match self {
                Detail::Text(text) => text,
                Detail::Structured(items) => items
                    .into_iter()
                    .map(|item| item.msg)
                    .filter(|msg| !msg.is_empty())
                    .collect::<Vec<_>>()
                    .join("; "),
            }
        }
    }
}
