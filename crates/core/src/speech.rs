//! Text-to-speech publishing: synthesize into a scratch file, upload, hand back a URL.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::path::{Path, PathBuf};

/// Object name every synthesized clip is published under.
pub const OUTPUT_OBJECT_NAME: &str = "output.wav";

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("speech synthesis canceled: {0}")]
    SynthesisCanceled(String),
    #[error("failed to upload to blob storage: {0}")]
    UploadFailed(String),
    #[error("failed to prepare scratch file: {0}")]
    Scratch(#[from] std::io::Error),
}

/// Renders text into an audio file at `output`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), SpeechError>;
}

/// Durable storage for published clips.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Uploads the file at `path` as `object_name`, overwriting, and returns its public URL.
    async fn upload(&self, path: &Path, object_name: &str) -> Result<String, SpeechError>;
}

/// The contract the router needs for speech turns.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpeechPublisher: Send + Sync {
    async fn synthesize_and_publish(&self, text: &str) -> Result<String, SpeechError>;
}

/// Glues a [`SpeechEngine`] to a [`BlobStore`] through a scratch file that is
/// removed on every exit path.
pub struct SpeechPipeline<E, B> {
    engine: E,
    store: B,
    scratch_dir: PathBuf,
}

impl<E: SpeechEngine, B: BlobStore> SpeechPipeline<E, B> {
    pub fn new(engine: E, store: B) -> Self {
        Self {
            engine,
            store,
            scratch_dir: std::env::temp_dir(),
        }
    }

    pub fn with_scratch_dir(mut self, scratch_dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = scratch_dir.into();
        self
    }

    async fn render_and_upload(&self, text: &str, artifact: &Path) -> Result<String, SpeechError> {
        self.engine.synthesize(text, artifact).await?;
        tracing::debug!("Synthesized speech into {}", artifact.display());
        self.store.upload(artifact, OUTPUT_OBJECT_NAME).await
    }
}

#[async_trait]
impl<E: SpeechEngine, B: BlobStore> SpeechPublisher for SpeechPipeline<E, B> {
    async fn synthesize_and_publish(&self, text: &str) -> Result<String, SpeechError> {
        let artifact = tempfile::Builder::new()
            .prefix("output-")
            .suffix(".wav")
            .tempfile_in(&self.scratch_dir)?
            .into_temp_path();

        let result = self.render_and_upload(text, &artifact).await;

        // `TempPath` also removes the file on drop; closing here surfaces failures.
        if let Err(e) = artifact.close() {
            tracing::warn!("Failed to remove speech scratch file: {}", e);
        }
        match &result {
            Ok(url) => tracing::info!("Published speech to {}", url),
            Err(e) => tracing::error!("Error during text-to-speech: {}", e),
        }
        result
    }
}
