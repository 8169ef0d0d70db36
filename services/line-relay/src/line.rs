//! LINE Messaging API: reply submission and message content download.

use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;
use relay_core::{ContentError, ContentFetcher, ReplyBatch, ReplyMessage};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

pub const API_BASE: &str = "https://api.line.me";
pub const DATA_API_BASE: &str = "https://api-data.line.me";

#[derive(Debug, thiserror::Error)]
pub enum LineError {
    #[error("request to LINE failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("LINE rejected the reply with {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Delivers a reply burst to the platform.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn reply(&self, batch: &ReplyBatch) -> Result<(), LineError>;
}

// Outgoing wire types
#[derive(Serialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LineMessage {
    Text {
        text: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        emojis: Vec<LineEmoji>,
    },
    Audio {
        #[serde(rename = "originalContentUrl")]
        original_content_url: String,
        duration: u32,
    },
    Sticker {
        #[serde(rename = "packageId")]
        package_id: String,
        #[serde(rename = "stickerId")]
        sticker_id: String,
    },
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineEmoji {
    pub index: usize,
    pub product_id: String,
    pub emoji_id: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest<'a> {
    pub reply_token: &'a str,
    pub messages: Vec<LineMessage>,
}

impl From<&ReplyMessage> for LineMessage {
    fn from(message: &ReplyMessage) -> Self {
        match message {
            ReplyMessage::Text { text, glyphs } => LineMessage::Text {
                text: text.clone(),
                emojis: glyphs
                    .iter()
                    .map(|g| LineEmoji {
                        index: g.index,
                        product_id: g.product_id.clone(),
                        emoji_id: g.glyph_id.clone(),
                    })
                    .collect(),
            },
            ReplyMessage::Audio { url, duration_ms } => LineMessage::Audio {
                original_content_url: url.clone(),
                duration: *duration_ms,
            },
            ReplyMessage::Sticker {
                package_id,
                sticker_id,
            } => LineMessage::Sticker {
                package_id: package_id.clone(),
                sticker_id: sticker_id.clone(),
            },
        }
    }
}

impl<'a> From<&'a ReplyBatch> for ReplyRequest<'a> {
    fn from(batch: &'a ReplyBatch) -> Self {
        Self {
            reply_token: &batch.reply_token,
            messages: batch.messages.iter().map(LineMessage::from).collect(),
        }
    }
}

pub struct LineClient {
    http: reqwest::Client,
    access_token: SecretString,
    api_base: String,
    data_api_base: String,
}

impl LineClient {
    pub fn new(access_token: SecretString) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token,
            api_base: API_BASE.to_string(),
            data_api_base: DATA_API_BASE.to_string(),
        }
    }

    pub fn with_base_urls(mut self, api_base: &str, data_api_base: &str) -> Self {
        self.api_base = api_base.to_string();
        self.data_api_base = data_api_base.to_string();
        self
    }
}

#[async_trait]
impl ReplySender for LineClient {
    async fn reply(&self, batch: &ReplyBatch) -> Result<(), LineError> {
        let resp = self
            .http
            .post(format!("{}/v2/bot/message/reply", self.api_base))
            .bearer_auth(self.access_token.expose_secret())
            .json(&ReplyRequest::from(batch))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LineError::Rejected { status, body });
        }
        tracing::info!("Sent {} messages for reply token {}", batch.messages.len(), batch.reply_token);
        Ok(())
    }
}

#[async_trait]
impl ContentFetcher for LineClient {
    async fn fetch(&self, message_id: &str) -> Result<Bytes, ContentError> {
        let resp = self
            .http
            .get(format!("{}/v2/bot/message/{}/content", self.data_api_base, message_id))
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ContentError::Unavailable(e.to_string()))?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ContentError::Unavailable(e.to_string()))?;
        tracing::debug!("Fetched {} bytes for message {}", bytes.len(), message_id);
        Ok(bytes)
    }
}
