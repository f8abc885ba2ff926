//! The language-model collaborator behind a narrow trait.
//!
//! The model call itself is external to this system: anything that can turn
//! a prompt into text can drive the swarm. Production composition roots
//! inject a real API-backed client; tests inject [`CannedClient`]. No
//! implementation is ever selected by environment sniffing.

use crate::error::HivekitResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// A language-model client: one prompt in, one text completion out.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Issues a single completion call.
    async fn call(&self, prompt: &str) -> HivekitResult<String>;
}

/// A scripted model client for tests and offline runs.
///
/// Returns queued responses in order, then the fallback string once the
/// queue is exhausted. Records every prompt it receives.
pub struct CannedClient {
    responses: Mutex<VecDeque<String>>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
}

impl CannedClient {
    /// Creates a client that replays `responses` in order.
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            fallback: String::from("(no response)"),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Creates a client that always answers with `text`.
    pub fn always(text: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: text.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Sets the response used once the scripted queue is exhausted.
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = text.into();
        self
    }

    /// All prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Number of calls made against this client.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl ModelClient for CannedClient {
    async fn call(&self, prompt: &str) -> HivekitResult<String> {
        self.prompts.lock().push(prompt.to_string());
        let next = self.responses.lock().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_canned_client_replays_in_order() {
        let client = CannedClient::new(vec!["one".into(), "two".into()]);
        assert_eq!(client.call("a").await.unwrap(), "one");
        assert_eq!(client.call("b").await.unwrap(), "two");
        assert_eq!(client.call("c").await.unwrap(), "(no response)");
    }

    #[tokio::test]
    async fn test_canned_client_records_prompts() {
        let client = CannedClient::always("ok");
        client.call("first prompt").await.unwrap();
        client.call("second prompt").await.unwrap();
        assert_eq!(client.call_count(), 2);
        assert_eq!(client.prompts()[0], "first prompt");
    }
}
