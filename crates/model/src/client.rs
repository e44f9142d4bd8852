use crate::error::Result;
use ask_protocol::{CancelSignal, Turn};
use async_trait::async_trait;

/// Receives each streamed chunk with the running output token count.
///
/// An error stops the stream and is returned as `ModelError::Sink`.
pub type ChunkSink<'a> = dyn FnMut(&str, usize) -> anyhow::Result<()> + Send + 'a;

/// How a streamed reply ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamSummary {
    pub output_tokens: usize,
    /// The cancel signal stopped the stream before the model finished.
    pub cancelled: bool,
}

/// A hosted model that continues a conversation.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Full id of the model requests are sent to.
    fn model_id(&self) -> &str;

    /// Send the history and wait for the complete reply.
    async fn send_history(&self, turns: &[Turn]) -> Result<String>;

    /// Send the history and hand each reply chunk to `on_chunk` as it arrives.
    ///
    /// `cancel` is polled between reads; once raised no further chunks are
    /// delivered and the summary reports `cancelled`.
    async fn stream_history(
        &self,
        turns: &[Turn],
        cancel: &CancelSignal,
        on_chunk: &mut ChunkSink<'_>,
    ) -> Result<StreamSummary>;
}
