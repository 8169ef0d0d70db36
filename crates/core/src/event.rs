//! Inbound events as the router sees them, independent of the messaging platform.

use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;

/// One inbound chat event together with the token its reply must be attached to.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    /// Identity the conversation state is keyed by.
    pub sender: String,
    pub reply_token: String,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Text(String),
    /// Image content is fetched lazily through a [`ContentFetcher`].
    Image { message_id: String },
    /// Audio content is fetched lazily through a [`ContentFetcher`].
    Audio { message_id: String },
}

impl EventKind {
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Text(_) => "text",
            EventKind::Image { .. } => "image",
            EventKind::Audio { .. } => "audio",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("message content unavailable: {0}")]
    Unavailable(String),
}

/// Retrieves the binary payload of an image or audio message.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, message_id: &str) -> Result<Bytes, ContentError>;
}
