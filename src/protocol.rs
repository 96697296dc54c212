//! Wire types for the Ollama generation endpoint.
//!
//! The request is a single JSON object; the response is a sequence of JSON
//! objects, one per generated fragment.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Longest error body kept in a diagnostic message.
const MAX_BODY_EXCERPT: usize = 1024;

/// The user's prompt, assembled from the argument tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    /// Join tokens with single spaces and terminate with a newline.
    ///
    /// Only an empty token list is rejected; blank tokens are sent as-is.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Self> {
        if tokens.is_empty() {
            return Err(Error::Usage);
        }
        let joined = tokens
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(" ");
        Ok(Self(format!("{}\n", joined)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Request body for `POST /api/generate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    /// Always true; the pipeline only speaks the streaming mode.
    pub stream: bool,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: &Prompt) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.as_str().to_string(),
            stream: true,
        }
    }

    /// Serialize the request into the bytes sent on the wire.
    pub fn to_body(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// One element of the streamed response.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct GenerationChunk {
    /// Text fragment to append to the output.
    #[serde(default)]
    pub response: String,
    /// Set on the final chunk of a well-formed stream.
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    #[allow(dead_code)]
    pub model: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    pub created_at: Option<String>,
}

/// Error shape the daemon uses for failed requests.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Turn a non-success response body into a short diagnostic string.
pub fn describe_error_body(body: &str) -> String {
    let text = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => body.trim().to_string(),
    };
    excerpt(&text, MAX_BODY_EXCERPT)
}

fn excerpt(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
