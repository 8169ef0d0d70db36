//! Identifies the language of a voice message and translates it.

use crate::error::RelayError;
use crate::event::ContentFetcher;
use crate::oracle::Oracle;
use crate::prompts::{Prompt, PromptBook};
use crate::reply::ReplyMessage;
use std::path::Path;

/// Mime type the oracle is told the uploaded audio has.
const AUDIO_MIME_TYPE: &str = "audio/mpeg";

pub struct AudioTranscriber<'a> {
    oracle: &'a dyn Oracle,
    prompts: &'a PromptBook,
    content: &'a dyn ContentFetcher,
    scratch_dir: &'a Path,
}

impl<'a> AudioTranscriber<'a> {
    pub fn new(
        oracle: &'a dyn Oracle,
        prompts: &'a PromptBook,
        content: &'a dyn ContentFetcher,
        scratch_dir: &'a Path,
    ) -> Self {
        Self {
            oracle,
            prompts,
            content,
            scratch_dir,
        }
    }

    /// Always produces exactly one reply; failures are reported as text.
    pub async fn transcribe(&self, message_id: &str) -> Vec<ReplyMessage> {
        match self.try_transcribe(message_id).await {
            Ok(text) => vec![ReplyMessage::text(text)],
            Err(e) => {
                tracing::error!("Failed to process audio message {}: {}", message_id, e);
                let message = self
                    .prompts
                    .render(Prompt::AudioError, &[("error", &e.to_string())]);
                vec![ReplyMessage::text(message)]
            }
        }
    }

    async fn try_transcribe(&self, message_id: &str) -> Result<String, RelayError> {
        let audio = self.content.fetch(message_id).await?;

        let scratch = tempfile::Builder::new()
            .prefix(&format!("{message_id}-"))
            .suffix(".m4a")
            .tempfile_in(self.scratch_dir)?
            .into_temp_path();

        let result = self.upload_and_ask(&scratch, &audio).await;

        if let Err(e) = scratch.close() {
            tracing::warn!("Failed to remove audio scratch file: {}", e);
        }
        result
    }

    async fn upload_and_ask(&self, scratch: &Path, audio: &[u8]) -> Result<String, RelayError> {
        tokio::fs::write(scratch, audio).await?;
        let media = self.oracle.upload_media(scratch, AUDIO_MIME_TYPE).await?;
        let reply = self
            .oracle
            .generate(self.prompts.text(Prompt::TranscribeAudio), Some(media))
            .await?;
        Ok(reply)
    }
}
