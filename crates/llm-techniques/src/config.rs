//! Gateway configuration.
//!
//! Configuration can be built directly or loaded from the environment:
//!
//! - `LLM_PROVIDER` (optional, `google` selects the candidates wire shape,
//!   anything else the choices wire shape; defaults to `google`)
//! - `LLM_API_URL` (optional, a provider default is used when empty)
//! - `LLM_API_KEY` (required)
//! - `LLM_MODEL` (optional, defaults to `gemini-2.0-flash`)

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Per-request network timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Token cap used when a request does not set one.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 300;

const CANDIDATES_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const CHOICES_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

/// The two response layouts the gateway understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireShape {
    /// `candidates[].content.parts[].text` responses (Google style).
    #[default]
    Candidates,
    /// `choices[].message.content` / `choices[].text` responses (OpenAI style).
    Choices,
}

impl WireShape {
    /// Maps an `LLM_PROVIDER` value to a wire shape.
    pub fn from_provider(provider: &str) -> Self {
        if provider.trim().eq_ignore_ascii_case("google") {
            Self::Candidates
        } else {
            Self::Choices
        }
    }
}

/// Connection settings for the HTTP model gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GatewayConfig {
    pub provider: WireShape,
    /// Full endpoint URL. Empty means "use the provider default".
    pub api_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub model: String,
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    pub default_max_output_tokens: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            provider: WireShape::default(),
            api_url: String::new(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            default_max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

impl GatewayConfig {
    /// Creates a configuration for the given wire shape, key and model.
    pub fn new(provider: WireShape, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Loads configuration from `LLM_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("LLM_API_KEY").map_err(|_| ConfigError::MissingVar("LLM_API_KEY"))?;
        let provider = env::var("LLM_PROVIDER")
            .map(|p| WireShape::from_provider(&p))
            .unwrap_or_default();
        let model = env::var("LLM_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_url = env::var("LLM_API_URL").unwrap_or_default();

        let config = Self {
            provider,
            api_url,
            api_key,
            model,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Overrides the endpoint URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Overrides the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Token cap to send: `requested`, or the configured default when it is 0.
    pub fn max_output_tokens(&self, requested: u32) -> u32 {
        if requested == 0 {
            self.default_max_output_tokens
        } else {
            requested
        }
    }

    /// Checks that a custom endpoint, if any, is a valid absolute URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.trim().is_empty() {
            return Ok(());
        }
        url::Url::parse(self.api_url.trim())
            .map(|_| ())
            .map_err(|err| ConfigError::InvalidValue {
                name: "LLM_API_URL",
                reason: err.to_string(),
            })
    }

    /// Returns the endpoint to call, without credentials.
    pub fn endpoint(&self) -> String {
        let custom = self.api_url.trim();
        if !custom.is_empty() {
            return custom.to_string();
        }
        match self.provider {
            WireShape::Candidates => {
                format!("{CANDIDATES_BASE_URL}/{}:generateContent", self.model)
            }
            WireShape::Choices => CHOICES_BASE_URL.to_string(),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
