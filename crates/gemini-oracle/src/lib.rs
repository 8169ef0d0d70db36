//! REST client for Google's Gemini models, exposed through the `Oracle` seam.

pub mod client;
pub mod types;

pub use client::{DEFAULT_MODEL, GeminiClient};
