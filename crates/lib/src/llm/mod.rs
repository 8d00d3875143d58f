//! Generative-text abstraction and the Gemini client.
//!
//! Both the webhook and the prompt form only need "prompt in, text out", so the seam is a
//! single-method trait. Tests swap in their own implementations.

mod gemini;

use async_trait::async_trait;

pub use gemini::{GeminiClient, GenerateContentResponse};

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("gemini request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("gemini api error: {status} {body}")]
    Api { status: u16, body: String },
}

/// Generate text from a prompt. `Ok(None)` means the API answered but produced no usable text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, GenerateError>;
}
