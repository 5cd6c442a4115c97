//! Scripted model for tests and offline demos.

use super::LanguageModel;
use crate::error::LlmError;
use crate::Message;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Replays canned responses in order; the last one repeats once the queue is
/// drained. Every prompt it receives is recorded.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<String, String>>>,
    last: Mutex<Option<Result<String, String>>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<Vec<Message>>>,
    chunk_size: Option<usize>,
}

impl ScriptedModel {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_results(responses.into_iter().map(|r| Ok(r.into())))
    }

    pub fn always(response: &str) -> Self {
        Self::new([response])
    }

    /// Every call fails with `LlmError::Api(message)`.
    pub fn failing(message: &str) -> Self {
        Self::from_results([Err(message.to_string())])
    }

    fn from_results(results: impl IntoIterator<Item = Result<String, String>>) -> Self {
        Self {
            responses: Mutex::new(results.into_iter().collect()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            chunk_size: None,
        }
    }

    /// Stream responses in fragments of `chars` characters.
    pub fn with_chunk_size(mut self, chars: usize) -> Self {
        self.chunk_size = Some(chars.max(1));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Message lists received so far, oldest first.
    pub fn prompts(&self) -> Vec<Vec<Message>> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn next_response(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(messages.to_vec());
        }

        let popped = self.responses.lock().ok().and_then(|mut q| q.pop_front());
        let mut last = self
            .last
            .lock()
            .map_err(|_| LlmError::Api("scripted model poisoned".to_string()))?;
        if let Some(next) = popped {
            *last = Some(next);
        }

        match last.clone() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(LlmError::Api(message)),
            None => Err(LlmError::Api("scripted model has no responses".to_string())),
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.next_response(messages)
    }

    async fn stream(&self, messages: &[Message], tx: mpsc::Sender<String>) -> Result<(), LlmError> {
        let text = self.next_response(messages)?;
        let size = self.chunk_size.unwrap_or(usize::MAX);

        let chars: Vec<char> = text.chars().collect();
        for chunk in chars.chunks(size) {
            if tx.send(chunk.iter().collect()).await.is_err() {
                break;
            }
        }
        Ok(())
    }

    fn name(&self) -> String {
        "scripted".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_then_repeats_last() {
        let model = ScriptedModel::new(["first", "second"]);
        let msgs = [Message::user("q")];

        assert_eq!(model.complete(&msgs).await.unwrap(), "first");
        assert_eq!(model.complete(&msgs).await.unwrap(), "second");
        assert_eq!(model.complete(&msgs).await.unwrap(), "second");
        assert_eq!(model.calls(), 3);
        assert_eq!(model.prompts().len(), 3);
    }
}
