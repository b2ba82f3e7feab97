use super::User;
use chrono::{DateTime, Utc};

/// Kind of inbound activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Message,
    Join,
    Leave,
    Upload,
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Message => "message",
            EventKind::Join => "join",
            EventKind::Leave => "leave",
            EventKind::Upload => "upload",
        }
    }
}

/// Inbound event received from the chat platform
#[derive(Debug, Clone)]
pub struct Event {
    pub id: String,
    pub channel_id: String,
    pub is_direct: bool,
    pub kind: EventKind,
    pub text: String,
    /// External name of an uploaded file, e.g. `picture024.png`
    pub attachment: Option<String>,
    /// Handle by which the uploaded content can be fetched
    pub url: Option<String>,
    pub actor: Option<User>,
    pub received_at: DateTime<Utc>,
}

impl Event {
    pub fn new(channel_id: impl Into<String>, kind: EventKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            channel_id: channel_id.into(),
            is_direct: false,
            kind,
            text: String::new(),
            attachment: None,
            url: None,
            actor: None,
            received_at: Utc::now(),
        }
    }

    pub fn message(channel_id: impl Into<String>, text: impl Into<String>) -> Self {
        let mut event = Self::new(channel_id, EventKind::Message);
        event.text = text.into();
        event
    }

    pub fn upload(
        channel_id: impl Into<String>,
        attachment: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        let mut event = Self::new(channel_id, EventKind::Upload);
        event.attachment = Some(attachment.into());
        event.url = Some(url.into());
        event
    }

    pub fn join(channel_id: impl Into<String>, actor: User) -> Self {
        Self::new(channel_id, EventKind::Join).with_actor(actor)
    }

    pub fn leave(channel_id: impl Into<String>, actor: User) -> Self {
        Self::new(channel_id, EventKind::Leave).with_actor(actor)
    }

    pub fn direct(mut self) -> Self {
        self.is_direct = true;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_actor(mut self, actor: User) -> Self {
        self.actor = Some(actor);
        self
    }
}

/// Outbound message handed to the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub channel_id: String,
    pub content: String,
    pub file: Option<String>,
}
