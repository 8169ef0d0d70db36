//! The `/callback` endpoint: parses LINE webhook deliveries and hands each
//! message event to the conversation router on its own task.

use crate::line::ReplySender;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use relay_core::{ConversationRouter, EventKind, InboundEvent};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ConversationRouter>,
    pub replier: Arc<dyn ReplySender>,
}

// Incoming wire types
#[derive(Deserialize, Debug)]
pub struct WebhookPayload {
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WebhookEvent {
    Message(MessageEvent),
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    pub reply_token: String,
    pub source: Source,
    pub message: MessagePayload,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    pub room_id: Option<String>,
}

impl Source {
    /// User first, then group or room for chats where the user id is withheld.
    pub fn sender(&self) -> Option<&str> {
        self.user_id
            .as_deref()
            .or(self.group_id.as_deref())
            .or(self.room_id.as_deref())
    }
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessagePayload {
    Text { text: String },
    Image { id: String },
    Audio { id: String },
    #[serde(other)]
    Other,
}

impl MessageEvent {
    /// `None` for message kinds the relay does not handle.
    pub fn into_inbound(self) -> Option<InboundEvent> {
        let sender = self.source.sender()?.to_string();
        let kind = match self.message {
            MessagePayload::Text { text } => EventKind::Text(text),
            MessagePayload::Image { id } => EventKind::Image { message_id: id },
            MessagePayload::Audio { id } => EventKind::Audio { message_id: id },
            MessagePayload::Other => return None,
        };
        Some(InboundEvent {
            sender,
            reply_token: self.reply_token,
            kind,
        })
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/callback", post(callback))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn callback(State(state): State<AppState>, body: String) -> impl IntoResponse {
    tracing::info!("Request body: {}", body);

    let payload: WebhookPayload = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("Rejecting malformed webhook body: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid payload");
        }
    };

    for event in payload.events {
        let WebhookEvent::Message(message) = event else {
            tracing::debug!("Ignoring non-message webhook event");
            continue;
        };
        match message.into_inbound() {
            Some(inbound) => {
                tokio::spawn(dispatch(state.clone(), inbound));
            }
            None => tracing::debug!("Ignoring unsupported message event"),
        }
    }

    (StatusCode::OK, "OK")
}

/// Runs one turn and submits its reply. Failures are logged; nothing is sent.
pub async fn dispatch(state: AppState, event: InboundEvent) {
    let sender = event.sender.clone();
    let batch = match state.router.handle(event).await {
        Ok(batch) => batch,
        Err(e) => {
            tracing::error!("Turn from {} failed: {}", sender, e);
            return;
        }
    };
    if let Err(e) = state.replier.reply(&batch).await {
        tracing::error!("Failed to send reply to {}: {}", sender, e);
    }
}
