pub mod api;
pub mod app;
pub mod attachment;
pub mod auth;
pub mod chat;
pub mod config;
pub mod credentials;
pub mod dashboard;
pub mod notice;
pub mod transform;
pub mod ui;

pub use api::{ApiError, Backend, ChatRequest, FileScope, HttpBackend};
pub use chat::{ChatClient, ChatState, Draft, SendOutcome};
pub use notice::{FailureKind, Notifier};
pub use transform::{to_display, DisplayMessage, DisplayRole};
