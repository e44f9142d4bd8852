use std::sync::Mutex;

use ask_protocol::{approximate_tokens, is_cancelled, raise, CancelSignal, Turn};
use async_trait::async_trait;

use crate::client::{ChunkSink, ModelClient, StreamSummary};
use crate::error::{ModelError, Result};

/// Replays a fixed reply; used in tests and dry runs.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    model: String,
    chunks: Vec<String>,
    cancel_after: Option<usize>,
    fail_after: Option<usize>,
    received: Mutex<Vec<Vec<Turn>>>,
}

impl ScriptedClient {
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            model: "scripted".to_string(),
            chunks: chunks.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Raise the cancel signal once `count` chunks have been delivered.
    #[must_use]
    pub fn cancel_after(mut self, count: usize) -> Self {
        self.cancel_after = Some(count);
        self
    }

    /// Fail with an API error once `count` chunks have been delivered.
    #[must_use]
    pub fn fail_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// Histories passed to this client, one entry per call.
    pub fn received(&self) -> Vec<Vec<Turn>> {
        self.received
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, turns: &[Turn]) {
        if let Ok(mut calls) = self.received.lock() {
            calls.push(turns.to_vec());
        }
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn send_history(&self, turns: &[Turn]) -> Result<String> {
        self.record(turns);
        Ok(self.chunks.concat())
    }

    async fn stream_history(
        &self,
        turns: &[Turn],
        cancel: &CancelSignal,
        on_chunk: &mut ChunkSink<'_>,
    ) -> Result<StreamSummary> {
        self.record(turns);
        let mut text_len = 0usize;

        for (delivered, chunk) in self.chunks.iter().enumerate() {
            if self.cancel_after == Some(delivered) {
                raise(cancel);
            }
            if self.fail_after == Some(delivered) {
                return Err(ModelError::Api {
                    status: Some(529),
                    message: "overloaded_error: Overloaded".to_string(),
                });
            }
            if is_cancelled(cancel) {
                return Ok(StreamSummary {
                    output_tokens: text_len / 4,
                    cancelled: true,
                });
            }
            text_len += chunk.len();
            on_chunk(chunk, approximate_tokens(&self.chunks[..=delivered].concat()))
                .map_err(ModelError::Sink)?;
        }

        Ok(StreamSummary {
            output_tokens: text_len / 4,
            cancelled: false,
        })
    }
}
