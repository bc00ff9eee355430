//! The choices wire shape (OpenAI-compatible chat completions).

use super::{GenerationRequest, GenerationResult, Usage, join_text_parts};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<MessageContent>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// `data:` URL for an inline attachment.
pub fn data_url(mime_type: &str, base64_data: &str) -> String {
    format!("data:{mime_type};base64,{base64_data}")
}

/// Only images can travel as `image_url` parts.
pub fn is_image(mime_type: &str) -> bool {
    mime_type.trim().to_ascii_lowercase().starts_with("image/")
}

/// Builds the request body. `attachments` are `(mime type, base64 data)`
/// pairs; non-image attachments are dropped with a warning.
pub fn build_request(
    model: &str,
    request: &GenerationRequest,
    attachments: Vec<(String, String)>,
) -> ChatCompletionRequest {
    let mut content = vec![MessageContent::Text {
        text: request.prompt.clone(),
    }];
    for (mime_type, data) in attachments {
        if !is_image(&mime_type) {
            warn!(
                target: "llm_techniques::gateway",
                mime_type = %mime_type,
                "Skipping non-image attachment for chat completions"
            );
            continue;
        }
        content.push(MessageContent::ImageUrl {
            image_url: ImageUrl {
                url: data_url(&mime_type, &data),
            },
        });
    }
    ChatCompletionRequest {
        model: model.to_string(),
        messages: vec![ChatMessage {
            role: "user".to_string(),
            content,
        }],
        temperature: request.temperature,
        max_tokens: request.max_output_tokens,
    }
}

/// Extracts `choices[0].text`, then `choices[0].message.content` (string or
/// part list), then falls back to the serialized payload.
pub fn extract_text(data: &Value) -> String {
    let choice = data.pointer("/choices/0");
    let legacy = choice
        .and_then(|c| c.get("text"))
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let message = || {
        let content = choice?.pointer("/message/content")?;
        let text = match content {
            Value::String(text) => text.clone(),
            Value::Array(parts) => join_text_parts(
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(Value::as_str)),
            ),
            _ => String::new(),
        };
        (!text.is_empty()).then_some(text)
    };

    legacy
        .or_else(message)
        .unwrap_or_else(|| data.to_string())
}

pub fn parse_response(data: Value) -> GenerationResult {
    GenerationResult {
        text: extract_text(&data),
        usage: Usage::from_payload(&data),
        model_version: data.get("model").and_then(Value::as_str).map(str::to_string),
        response_id: data.get("id").and_then(Value::as_str).map(str::to_string),
        raw: data,
    }
}
