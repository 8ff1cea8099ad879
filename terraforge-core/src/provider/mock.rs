//! Scripted provider for unit tests

use super::*;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays queued results and records every request it receives.
#[derive(Default)]
pub(crate) struct MockProvider {
    replies: Mutex<VecDeque<Result<CompletionResponse, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    pub(crate) fn replying(content: Option<&str>) -> Self {
        let provider = Self::default();
        provider.push_reply(content);
        provider
    }

    pub(crate) fn failing(err: ProviderError) -> Self {
        let provider = Self::default();
        provider.replies.lock().unwrap().push_back(Err(err));
        provider
    }

    pub(crate) fn push_reply(&self, content: Option<&str>) {
        self.replies.lock().unwrap().push_back(Ok(CompletionResponse {
            model: DEFAULT_MODEL.into(),
            content: content.map(str::to_string),
            finish_reason: FinishReason::Stop,
            usage: Usage::default(),
        }));
    }

    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Other("no scripted reply".into())))
    }
}
