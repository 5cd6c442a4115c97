//! Language model boundary.
//!
//! The pipeline sees the model as an opaque function from a message list to
//! text. Two calling modes exist:
//! 1. Blocking: await the complete response
//! 2. Streaming: fragments flow through a channel and a [`TokenSink`] sees
//!    each one as it arrives; their concatenation is the response
//!
//! Errors from the model are never retried here.

pub mod mock;
#[cfg(any(feature = "openai", feature = "anthropic"))]
pub mod providers;

use crate::error::LlmError;
use crate::Message;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Capacity of the fragment channel between model and consumer.
const FRAGMENT_BUFFER: usize = 64;

/// Trait for language model providers
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate the complete response for `messages`.
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// Produce the response as fragments on `tx`.
    ///
    /// The default sends the blocking response as a single fragment.
    /// Returning drops `tx`, closing the stream.
    async fn stream(&self, messages: &[Message], tx: mpsc::Sender<String>) -> Result<(), LlmError> {
        let text = self.complete(messages).await?;
        // A closed receiver means the consumer gave up; its error wins.
        let _ = tx.send(text).await;
        Ok(())
    }

    fn name(&self) -> String {
        "unknown".to_string()
    }
}

/// Receives streamed fragments, one call per fragment.
#[async_trait]
pub trait TokenSink: Send {
    async fn on_token(&mut self, fragment: &str) -> Result<(), LlmError>;
}

/// Discards fragments.
pub struct NoopSink;

#[async_trait]
impl TokenSink for NoopSink {
    async fn on_token(&mut self, _fragment: &str) -> Result<(), LlmError> {
        Ok(())
    }
}

/// Forwards fragments into an mpsc channel, e.g. towards a websocket task.
pub struct ChannelSink(pub mpsc::Sender<String>);

#[async_trait]
impl TokenSink for ChannelSink {
    async fn on_token(&mut self, fragment: &str) -> Result<(), LlmError> {
        self.0
            .send(fragment.to_string())
            .await
            .map_err(|_| LlmError::Sink("token receiver dropped".to_string()))
    }
}

/// Collects fragments in order.
#[derive(Debug, Default)]
pub struct CollectSink {
    pub fragments: Vec<String>,
}

#[async_trait]
impl TokenSink for CollectSink {
    async fn on_token(&mut self, fragment: &str) -> Result<(), LlmError> {
        self.fragments.push(fragment.to_string());
        Ok(())
    }
}

/// Thin adapter that calls the model for a built prompt.
pub struct QueryGenerator<'a> {
    model: &'a dyn LanguageModel,
}

impl<'a> QueryGenerator<'a> {
    pub fn new(model: &'a dyn LanguageModel) -> Self {
        Self { model }
    }

    pub async fn generate(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.model.complete(messages).await
    }

    /// Stream the response through `sink` and return the concatenation.
    ///
    /// Producer and consumer run concurrently on the current task. If the sink
    /// fails, the receiver is dropped, the producer's sends start failing and
    /// the sink's error is returned.
    pub async fn generate_streaming(
        &self,
        messages: &[Message],
        sink: &mut dyn TokenSink,
    ) -> Result<String, LlmError> {
        let (tx, mut rx) = mpsc::channel::<String>(FRAGMENT_BUFFER);

        let producer = self.model.stream(messages, tx);
        let consumer = async move {
            let mut full = String::new();
            while let Some(fragment) = rx.recv().await {
                sink.on_token(&fragment).await?;
                full.push_str(&fragment);
            }
            Ok::<String, LlmError>(full)
        };

        let (produced, consumed) = tokio::join!(producer, consumer);
        let full = consumed?;
        produced?;
        Ok(full)
    }
}
