//! Scripted model gateway shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use llm_techniques::{FileInput, GenerationRequest, GenerationResult, ModelGateway, Usage};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const MOCK_MODEL: &str = "mock-model";

/// One recorded gateway call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: GenerationRequest,
    pub files: Vec<FileInput>,
}

/// Replays canned responses in order. Once the script runs out every call
/// gets the fallback text.
#[derive(Clone)]
pub struct MockGateway {
    responses: Arc<Mutex<VecDeque<String>>>,
    fallback: String,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    usage: Option<Usage>,
}

impl MockGateway {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().map(Into::into).collect())),
            fallback: String::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            usage: None,
        }
    }

    /// A gateway answering every call with `text`.
    pub fn repeating(text: impl Into<String>) -> Self {
        Self::new(Vec::<String>::new()).with_fallback(text)
    }

    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = text.into();
        self
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    async fn respond(&self, request: &GenerationRequest, files: &[FileInput]) -> GenerationResult {
        self.calls.lock().await.push(RecordedCall {
            request: request.clone(),
            files: files.to_vec(),
        });
        let text = self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        let result = GenerationResult::from_text(text);
        match self.usage {
            Some(usage) => result.with_usage(usage),
            None => result,
        }
    }
}

#[async_trait]
impl ModelGateway for MockGateway {
    fn model_name(&self) -> &str {
        MOCK_MODEL
    }

    async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        self.respond(request, &[]).await
    }

    async fn generate_with_files(
        &self,
        request: &GenerationRequest,
        files: &[FileInput],
    ) -> GenerationResult {
        self.respond(request, files).await
    }
}
