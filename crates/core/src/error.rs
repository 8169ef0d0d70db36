//! Error taxonomy for a single conversation turn.

use crate::event::ContentError;
use crate::oracle::OracleError;
use crate::speech::SpeechError;

/// Everything that can go wrong while resolving one inbound event.
///
/// `MissingLanguage` and `UnrecognizedFunction` are expected branches: the
/// router turns them into fixed replies instead of failing the turn.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Speech(#[from] SpeechError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("no target language has been set")]
    MissingLanguage,
    #[error("unrecognized function: {0}")]
    UnrecognizedFunction(String),
    #[error("scratch file error: {0}")]
    Io(#[from] std::io::Error),
}
