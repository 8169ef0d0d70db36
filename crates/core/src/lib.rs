//! Conversation state machine and oracle orchestration for the menu relay.
//!
//! The messaging transport, the generative oracle, the speech engine and the
//! blob store are all reached through the traits declared here, so every turn
//! can be driven end to end against test doubles.

pub mod error;
pub mod event;
pub mod food;
pub mod function;
pub mod language;
pub mod oracle;
pub mod prompts;
pub mod reply;
pub mod router;
pub mod speech;
pub mod state;
pub mod transcription;

pub use error::RelayError;
pub use event::{ContentError, ContentFetcher, EventKind, InboundEvent};
pub use oracle::{Media, Oracle, OracleError, Verdict};
pub use prompts::{Prompt, PromptBook};
pub use reply::{InlineGlyph, ReplyBatch, ReplyMessage};
pub use router::ConversationRouter;
pub use speech::{BlobStore, SpeechEngine, SpeechError, SpeechPipeline, SpeechPublisher};
pub use state::{ConversationState, DEFAULT_SESSION_IDLE_TIMEOUT, FunctionMode, SessionStore};
