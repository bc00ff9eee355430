//! The model gateway: one text-generation call, never failing.
//!
//! Two wire shapes are understood, normalised into [`GenerationResult`]:
//!
//! - candidates: `candidates[].content.parts[].text` (see [`candidates`])
//! - choices: `choices[].message.content` or `choices[].text` (see [`choices`])
//!
//! Every transport or provider failure comes back as a result whose text
//! starts with [`LLM_ERROR_PREFIX`], so technique parsers always see text.

pub mod candidates;
pub mod choices;
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::HttpGateway;

use crate::error::GatewayError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::PathBuf;

/// Prefix of every synthesized failure text.
pub const LLM_ERROR_PREFIX: &str = "LLM_ERROR: ";

/// A single generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f32,
    /// 0 leaves the cap to the gateway's configured default.
    pub max_output_tokens: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, temperature: f32, max_output_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            temperature,
            max_output_tokens,
        }
    }
}

/// A file handed to the model for direct analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInput {
    pub path: PathBuf,
    pub mime_type: String,
}

impl FileInput {
    pub fn new(path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// Token counters, accepted in either provider's spelling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(default, alias = "promptTokenCount", alias = "prompt_tokens")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, alias = "candidatesTokenCount", alias = "completion_tokens")]
    pub completion_tokens: Option<u64>,
    #[serde(default, alias = "totalTokenCount", alias = "total_tokens")]
    pub total_tokens: Option<u64>,
}

impl Usage {
    /// Reads usage from a raw provider payload (`usageMetadata` or `usage`).
    pub fn from_payload(raw: &Value) -> Option<Self> {
        let usage = raw.get("usageMetadata").or_else(|| raw.get("usage"))?;
        serde_json::from_value(usage.clone()).ok()
    }

    /// Adds two counters, keeping a side that is present when the other is not.
    pub fn merge(self, other: Usage) -> Usage {
        fn add(a: Option<u64>, b: Option<u64>) -> Option<u64> {
            match (a, b) {
                (Some(a), Some(b)) => Some(a + b),
                (a, b) => a.or(b),
            }
        }
        Usage {
            prompt_tokens: add(self.prompt_tokens, other.prompt_tokens),
            completion_tokens: add(self.completion_tokens, other.completion_tokens),
            total_tokens: add(self.total_tokens, other.total_tokens),
        }
    }

    /// Sums optional usages across several calls.
    pub fn sum<I: IntoIterator<Item = Option<Usage>>>(usages: I) -> Option<Usage> {
        usages
            .into_iter()
            .flatten()
            .reduce(|acc, usage| acc.merge(usage))
    }
}

/// Normalised outcome of a generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    /// Extracted text. Always present; failures carry [`LLM_ERROR_PREFIX`].
    pub text: String,
    /// The provider payload, or the error payload on failure.
    pub raw: Value,
    pub usage: Option<Usage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
}

impl GenerationResult {
    /// A successful result with only text, as scripted gateways produce.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            raw: Value::Null,
            usage: None,
            model_version: None,
            response_id: None,
        }
    }

    /// The empty result returned for an empty prompt.
    pub fn empty() -> Self {
        Self::from_text("")
    }

    /// Renders a gateway failure as `LLM_ERROR: <message>`.
    pub fn from_error(error: &GatewayError, raw: Option<Value>) -> Self {
        Self {
            text: format!("{LLM_ERROR_PREFIX}{error}"),
            raw: raw.unwrap_or_else(|| json!({ "error": error.to_string() })),
            usage: None,
            model_version: None,
            response_id: None,
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn is_error(&self) -> bool {
        self.text.starts_with(LLM_ERROR_PREFIX)
    }
}

/// A text-generation back end.
///
/// Implementations must not panic or return errors: every failure is
/// reported through [`GenerationResult::from_error`].
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Model identifier attached to technique results.
    fn model_name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> GenerationResult;

    /// Generation with files attached for direct analysis.
    ///
    /// Back ends without multimodal input ignore the files.
    async fn generate_with_files(
        &self,
        request: &GenerationRequest,
        _files: &[FileInput],
    ) -> GenerationResult {
        self.generate(request).await
    }
}

/// Text parts are joined with no separator and trimmed, as providers split
/// one answer over several parts.
pub(crate) fn join_text_parts<'a, I: IntoIterator<Item = &'a str>>(parts: I) -> String {
    parts.into_iter().collect::<String>().trim().to_string()
}
