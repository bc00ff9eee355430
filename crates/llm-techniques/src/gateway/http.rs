//! reqwest-backed [`ModelGateway`].
//!
//! # Example
//!
//! ```rust,no_run
//! use llm_techniques::gateway::{GenerationRequest, HttpGateway, ModelGateway};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // LLM_API_KEY, LLM_PROVIDER, LLM_MODEL, LLM_API_URL
//! let gateway = HttpGateway::from_env()?;
//! let result = gateway
//!     .generate(&GenerationRequest::new("Say hello", 0.0, 30))
//!     .await;
//! println!("{}", result.text);
//! # Ok(())
//! # }
//! ```

use super::{FileInput, GenerationRequest, GenerationResult, ModelGateway, candidates, choices};
use crate::config::{GatewayConfig, WireShape};
use crate::error::GatewayError;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use tracing::{debug, instrument, warn};

/// Gateway calling a remote provider over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    config: GatewayConfig,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| GatewayError::Http(err.to_string()))?;
        Ok(Self { client, config })
    }

    /// Builds a gateway from `LLM_*` environment variables.
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::new(GatewayConfig::from_env()?)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Fills in the configured token cap for requests that leave it at 0.
    fn resolve<'a>(&self, request: &'a GenerationRequest) -> Cow<'a, GenerationRequest> {
        let max_output_tokens = self.config.max_output_tokens(request.max_output_tokens);
        if max_output_tokens == request.max_output_tokens {
            Cow::Borrowed(request)
        } else {
            Cow::Owned(GenerationRequest {
                max_output_tokens,
                ..request.clone()
            })
        }
    }

    async fn load_attachments(files: &[FileInput]) -> Result<Vec<(String, String)>, GatewayError> {
        let mut encoded = Vec::with_capacity(files.len());
        for file in files {
            let bytes = tokio::fs::read(&file.path)
                .await
                .map_err(|err| GatewayError::Attachment {
                    path: file.path.display().to_string(),
                    reason: err.to_string(),
                })?;
            encoded.push((file.mime_type.clone(), BASE64_STANDARD.encode(bytes)));
        }
        Ok(encoded)
    }

    async fn post<B: Serialize + Sync>(&self, body: &B) -> Result<Value, (GatewayError, Option<Value>)> {
        let endpoint = self.config.endpoint();
        let builder = match self.config.provider {
            WireShape::Candidates => self
                .client
                .post(&endpoint)
                .query(&[("key", self.config.api_key.as_str())]),
            WireShape::Choices => self.client.post(&endpoint).bearer_auth(&self.config.api_key),
        };

        let response = builder
            .json(body)
            .send()
            .await
            .map_err(|err| (GatewayError::Http(err.to_string()), None))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|err| (GatewayError::Http(err.to_string()), None))?;

        if !status.is_success() {
            let payload = serde_json::from_str::<Value>(&body_text).ok();
            let message = payload
                .as_ref()
                .and_then(|p| p.pointer("/error/message"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));
            let raw = payload.unwrap_or(Value::String(body_text));
            return Err((
                GatewayError::Api {
                    status: status.as_u16(),
                    message,
                },
                Some(raw),
            ));
        }

        serde_json::from_str(&body_text)
            .map_err(|err| (GatewayError::MalformedResponse(err.to_string()), None))
    }

    async fn call(&self, request: &GenerationRequest, files: &[FileInput]) -> GenerationResult {
        if request.prompt.trim().is_empty() {
            return GenerationResult::empty();
        }

        let resolved = self.resolve(request);
        let request = &*resolved;

        let attachments = match Self::load_attachments(files).await {
            Ok(attachments) => attachments,
            Err(err) => {
                warn!(target: "llm_techniques::gateway", error = %err, "Attachment load failed");
                return GenerationResult::from_error(&err, None);
            }
        };

        let outcome = match self.config.provider {
            WireShape::Candidates => {
                let inline = attachments
                    .into_iter()
                    .map(|(mime_type, data)| candidates::InlineDataPayload { mime_type, data })
                    .collect();
                self.post(&candidates::build_request(request, inline))
                    .await
                    .map(candidates::parse_response)
            }
            WireShape::Choices => {
                self.post(&choices::build_request(&self.config.model, request, attachments))
                    .await
                    .map(choices::parse_response)
            }
        };

        match outcome {
            Ok(result) => {
                debug!(
                    target: "llm_techniques::gateway",
                    chars = result.text.len(),
                    usage = ?result.usage,
                    "Generation completed"
                );
                result
            }
            Err((err, raw)) => {
                warn!(target: "llm_techniques::gateway", error = %err, "Generation failed");
                GenerationResult::from_error(&err, raw)
            }
        }
    }
}

#[async_trait]
impl ModelGateway for HttpGateway {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip(self, request), fields(model = %self.config.model, max_tokens = request.max_output_tokens))]
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        self.call(request, &[]).await
    }

    #[instrument(skip(self, request, files), fields(model = %self.config.model, files = files.len()))]
    async fn generate_with_files(
        &self,
        request: &GenerationRequest,
        files: &[FileInput],
    ) -> GenerationResult {
        self.call(request, files).await
    }
}
