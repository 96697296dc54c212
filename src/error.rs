//! Error types for the prompt-to-stream pipeline.
//!
//! Mid-stream decode failures and teardown failures are logged where they
//! happen and never show up here.

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Nothing to send.
    #[error("no prompt provided")]
    Usage,

    #[error("failed to encode request body: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The daemon binary could not be launched.
    #[error("failed to start '{command}'")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The request never completed (connection refused, reset, ...).
    #[error("failed to send request to {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The daemon answered with something other than success.
    #[error("received non-200 response: {status}, body: {body}")]
    Protocol { status: StatusCode, body: String },

    /// Writing generated text to stdout failed.
    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),
}
