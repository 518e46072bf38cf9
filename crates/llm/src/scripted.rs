//! Scripted client that replays canned completions.
//!
//! Used by tests across the workspace to drive translation, routing and
//! synthesis without a model server.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use async_trait::async_trait;
use cityq_core::{AppError, AppResult};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Replays completions in order and records every request it receives.
///
/// Once the script is exhausted every call fails with [`AppError::Llm`].
#[derive(Debug, Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Append another reply to the script.
    pub fn push_reply(&self, reply: impl Into<String>) {
        lock(&self.replies).push_back(reply.into());
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<LlmRequest> {
        lock(&self.requests).clone()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.replies).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl LlmClient for ScriptedClient {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        lock(&self.requests).push(request.clone());

        let content = lock(&self.replies)
            .pop_front()
            .ok_or_else(|| AppError::Llm("Scripted client has no replies left".to_string()))?;

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_then_fails() {
        let client = ScriptedClient::new(["first", "second"]);
        let request = LlmRequest::new("q", "m");

        assert_eq!(client.complete(&request).await.unwrap().content, "first");
        assert_eq!(client.complete(&request).await.unwrap().content, "second");
        assert!(matches!(
            client.complete(&request).await,
            Err(AppError::Llm(_))
        ));
        assert_eq!(client.requests().len(), 3);
    }
}
