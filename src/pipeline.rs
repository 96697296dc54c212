//! The prompt-to-stream pipeline.
//!
//! Sequences daemon start, request, streaming and teardown. Stages move
//! `Idle -> Requesting -> Streaming -> Draining -> Done`; any stage before
//! `Done` may end in `Failed`.

use crate::client::{emit_stream, StreamClient, StreamOutcome};
use crate::daemon::{Launcher, Supervisor};
use crate::error::{Error, Result};
use crate::protocol::{GenerationRequest, Prompt};
use std::fmt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Requesting,
    Streaming,
    Draining,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Requesting => "requesting",
            Stage::Streaming => "streaming",
            Stage::Draining => "draining",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

pub struct Pipeline<L> {
    supervisor: Supervisor<L>,
    client: StreamClient,
    model: String,
}

impl<L: Launcher> Pipeline<L> {
    pub fn new(supervisor: Supervisor<L>, client: StreamClient, model: impl Into<String>) -> Self {
        Self {
            supervisor,
            client,
            model: model.into(),
        }
    }

    /// Send the prompt made of `tokens` and stream the completion to `out`.
    ///
    /// Once the daemon has been started it is torn down on every path except
    /// a transport failure, where the daemon may well be healthy.
    pub async fn run<S, W>(&self, tokens: &[S], out: &mut W) -> Result<StreamOutcome>
    where
        S: AsRef<str>,
        W: AsyncWrite + Unpin,
    {
        let mut stage = Stage::Idle;
        let result = self.drive(tokens, out, &mut stage).await;
        if result.is_err() {
            advance(&mut stage, Stage::Failed);
        }
        result
    }

    async fn drive<S, W>(&self, tokens: &[S], out: &mut W, stage: &mut Stage) -> Result<StreamOutcome>
    where
        S: AsRef<str>,
        W: AsyncWrite + Unpin,
    {
        let prompt = Prompt::from_tokens(tokens)?;
        let body = GenerationRequest::new(self.model.as_str(), &prompt).to_body()?;

        advance(stage, Stage::Requesting);
        self.supervisor.ensure_running().await?;

        let response = match self.client.send(body).await {
            Ok(response) => response,
            Err(e @ Error::Transport { .. }) => return Err(e),
            Err(e) => {
                self.teardown(out, stage).await;
                return Err(e);
            }
        };

        advance(stage, Stage::Streaming);
        let streamed = emit_stream(response.bytes_stream(), out).await;

        self.teardown(out, stage).await;
        let outcome = streamed?;
        advance(stage, Stage::Done);
        Ok(outcome)
    }

    async fn teardown<W: AsyncWrite + Unpin>(&self, out: &mut W, stage: &mut Stage) {
        advance(stage, Stage::Draining);
        if let Err(e) = out.flush().await {
            debug!("Flushing output before teardown failed: {}", e);
        }
        self.supervisor.shutdown().await;
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    debug!("Pipeline {} -> {}", stage, next);
    *stage = next;
}
