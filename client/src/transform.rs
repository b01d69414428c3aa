use ragchat_shared::{RawMessage, Role};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayRole {
    User,
    Bot,
    Other(String),
}

impl DisplayRole {
    pub fn label(&self) -> &str {
        match self {
            DisplayRole::User => "user",
            DisplayRole::Bot => "bot",
            DisplayRole::Other(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
    pub role: DisplayRole,
    pub text: String,
    pub image: Option<String>,
}

impl DisplayMessage {
    pub fn user(text: impl Into<String>, image: Option<String>) -> Self {
        Self {
            role: DisplayRole::User,
            text: text.into(),
            image,
        }
    }

    pub fn bot(text: impl Into<String>, image: Option<String>) -> Self {
        Self {
            role: DisplayRole::Bot,
            text: text.into(),
            image,
        }
    }
}

/// Maps a backend history onto what the message pane shows. System entries
/// are dropped; everything else keeps its order.
pub fn to_display(messages: Option<&[RawMessage]>) -> Vec<DisplayMessage> {
    messages
        .unwrap_or_default()
        .iter()
        .filter_map(display_one)
        .collect()
}

fn display_one(msg: &RawMessage) -> Option<DisplayMessage> {
    let role = match &msg.role {
        Role::System => return None,
        Role::User => DisplayRole::User,
        Role::Assistant => DisplayRole::Bot,
        Role::Other(name) => DisplayRole::Other(name.clone()),
    };
    let text = msg
        .content
        .as_ref()
        .or(msg.text.as_ref())
        .cloned()
        .unwrap_or_default();
    Some(DisplayMessage {
        role,
        text,
        image: msg.image.clone(),
    })
}
