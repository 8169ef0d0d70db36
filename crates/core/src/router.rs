use crate::error::RelayError;
use crate::event::{ContentFetcher, EventKind, InboundEvent};
use crate::food::FoodNameResolver;
use crate::function::FunctionResolver;
use crate::language::LanguageResolver;
use crate::oracle::Oracle;
use crate::prompts::{Prompt, PromptBook};
use crate::reply::{ReplyBatch, ReplyMessage};
use crate::speech::SpeechPublisher;
use crate::state::{ConversationState, SessionStore};
use crate::transcription::AudioTranscriber;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Leading character that routes a text turn straight to speech synthesis.
pub const TRIGGER_PREFIX: char = '@';
/// Nominal duration attached to every audio reply.
pub const AUDIO_REPLY_DURATION_MS: u32 = 5000;

/// The conversation controller: picks a resolver per inbound event, applies
/// its result to the sender's state, and assembles the reply burst.
pub struct ConversationRouter {
    oracle: Arc<dyn Oracle>,
    speech: Arc<dyn SpeechPublisher>,
    content: Arc<dyn ContentFetcher>,
    prompts: Arc<PromptBook>,
    sessions: SessionStore,
    scratch_dir: PathBuf,
}

impl ConversationRouter {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        speech: Arc<dyn SpeechPublisher>,
        content: Arc<dyn ContentFetcher>,
        prompts: Arc<PromptBook>,
    ) -> Self {
        Self {
            oracle,
            speech,
            content,
            prompts,
            sessions: SessionStore::new(),
            scratch_dir: std::env::temp_dir(),
        }
    }

    pub fn with_scratch_dir(mut self, scratch_dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = scratch_dir.into();
        self
    }

    pub fn with_session_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.sessions = SessionStore::with_idle_timeout(idle_timeout);
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Resolves one inbound event into exactly one reply burst.
    ///
    /// An `Err` means the turn failed loudly (oracle outage on a text or image
    /// turn); the caller logs it and sends nothing.
    pub async fn handle(&self, event: InboundEvent) -> Result<ReplyBatch, RelayError> {
        tracing::info!(
            "Handling {} event from {}",
            event.kind.label(),
            event.sender
        );
        let session = self.sessions.session(&event.sender);
        let mut state = session.lock().await;

        let messages = match &event.kind {
            EventKind::Text(text) => match text.strip_prefix(TRIGGER_PREFIX) {
                Some(speech_text) => self.handle_speech(speech_text.trim()).await,
                None => self.handle_text(&mut state, text).await?,
            },
            EventKind::Image { message_id } => {
                FoodNameResolver::new(self.oracle.as_ref(), &self.prompts)
                    .resolve(&state, self.content.as_ref(), message_id)
                    .await?
            }
            EventKind::Audio { message_id } => {
                AudioTranscriber::new(
                    self.oracle.as_ref(),
                    &self.prompts,
                    self.content.as_ref(),
                    &self.scratch_dir,
                )
                .transcribe(message_id)
                .await
            }
        };

        Ok(ReplyBatch {
            reply_token: event.reply_token,
            messages,
        })
    }

    /// Tries the text as a language name first; if it is not one, the same text
    /// is read as a function-mode command instead.
    async fn handle_text(
        &self,
        state: &mut ConversationState,
        text: &str,
    ) -> Result<Vec<ReplyMessage>, RelayError> {
        let language_reply = LanguageResolver::new(self.oracle.as_ref(), &self.prompts)
            .resolve(state, text)
            .await?;

        if state.failed_language_detection() {
            state.awaiting_language_confirmation = None;
            tracing::info!("Falling back to function selection for {:?}", text);
            return Ok(FunctionResolver::new(&self.prompts).resolve(state, text));
        }
        Ok(language_reply)
    }

    async fn handle_speech(&self, text: &str) -> Vec<ReplyMessage> {
        match self.speech.synthesize_and_publish(text).await {
            Ok(url) => vec![ReplyMessage::Audio {
                url,
                duration_ms: AUDIO_REPLY_DURATION_MS,
            }],
            Err(e) => {
                let message = self
                    .prompts
                    .render(Prompt::SpeechError, &[("error", &e.to_string())]);
                vec![ReplyMessage::text(message)]
            }
        }
    }
}
