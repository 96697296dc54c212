//! Client side of the generation endpoint.
//!
//! - `http` opens the streaming POST and checks the status
//! - `stream` decodes the body chunk by chunk and writes the text out

pub mod http;
pub mod stream;

pub use http::StreamClient;
pub use stream::{emit_stream, StreamEnd, StreamOutcome};
