use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// How long a sender's state survives without a turn before it is dropped.
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// The high-level capability a user has picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionMode {
    /// Menu photo translation.
    Translate,
    /// Text-to-speech for ordering out loud.
    Speech,
}

impl FunctionMode {
    pub const TRANSLATE_TAG: &'static str = "翻譯";
    pub const SPEECH_TAG: &'static str = "語音";

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            Self::TRANSLATE_TAG => Some(FunctionMode::Translate),
            Self::SPEECH_TAG => Some(FunctionMode::Speech),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            FunctionMode::Translate => Self::TRANSLATE_TAG,
            FunctionMode::Speech => Self::SPEECH_TAG,
        }
    }
}

/// Per-conversation fields carried from one turn to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    /// Display name of the language replies are rendered in.
    pub target_language: Option<String>,
    /// `Some(false)` after the last text failed language classification.
    /// `Some(true)` is never produced.
    pub awaiting_language_confirmation: Option<bool>,
    pub active_function: Option<FunctionMode>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failed_language_detection(&self) -> bool {
        self.awaiting_language_confirmation == Some(false)
    }
}

/// Conversation states keyed by sender identity.
///
/// Each sender gets its own async lock, held for a whole turn, so turns from
/// one sender run one at a time while different senders proceed in parallel.
/// Senders idle for longer than the idle timeout are forgotten on the next
/// lookup, unless a turn still holds their handle.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    idle_timeout: Duration,
}

#[derive(Debug)]
struct Session {
    state: Arc<tokio::sync::Mutex<ConversationState>>,
    last_seen: Instant,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_SESSION_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Returns the state handle for `sender`, creating a fresh one on first contact.
    pub fn session(&self, sender: &str) -> Arc<tokio::sync::Mutex<ConversationState>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        let before = sessions.len();
        sessions.retain(|_, s| {
            Arc::strong_count(&s.state) > 1
                || now.saturating_duration_since(s.last_seen) < self.idle_timeout
        });
        if sessions.len() < before {
            tracing::debug!("Evicted {} idle conversation states", before - sessions.len());
        }

        let session = sessions.entry(sender.to_string()).or_insert_with(|| {
            tracing::debug!("Creating conversation state for sender {}", sender);
            Session {
                state: Arc::new(tokio::sync::Mutex::new(ConversationState::new())),
                last_seen: now,
            }
        });
        session.last_seen = now;
        session.state.clone()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
