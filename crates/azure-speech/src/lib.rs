//! Azure Cognitive Services text-to-speech and Azure Blob Storage, behind the
//! `SpeechEngine` and `BlobStore` seams of `relay-core`.

pub mod blob;
pub mod tts;

pub use blob::{AzureBlobStore, StorageAccount, StorageConfigError};
pub use tts::{AzureSpeechEngine, DEFAULT_VOICE};
