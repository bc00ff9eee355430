//! The candidates/parts wire shape (Google generative language API).

use super::{GenerationRequest, GenerationResult, Usage, join_text_parts};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataPayload,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineDataPayload {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Builds the request body. `attachments` are already base64 encoded.
pub fn build_request(
    request: &GenerationRequest,
    attachments: Vec<InlineDataPayload>,
) -> GenerateContentRequest {
    let mut parts = vec![Part::Text {
        text: request.prompt.clone(),
    }];
    parts.extend(
        attachments
            .into_iter()
            .map(|inline_data| Part::InlineData { inline_data }),
    );
    GenerateContentRequest {
        contents: vec![Content { parts }],
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_output_tokens,
        },
    }
}

fn part_texts(part: &Value) -> Vec<&str> {
    if let Some(text) = part.as_str() {
        return vec![text];
    }
    if let Some(text) = part.get("text").and_then(Value::as_str).filter(|t| !t.is_empty()) {
        return vec![text];
    }
    if let Some(nested) = part.pointer("/message/content/parts").and_then(Value::as_array) {
        return nested
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect();
    }
    Vec::new()
}

/// Text of a `content` value: its `parts`, a bare part array, or a string.
fn content_text(content: &Value) -> String {
    let parts = content
        .get("parts")
        .and_then(Value::as_array)
        .or_else(|| content.as_array());
    match parts {
        Some(parts) if !parts.is_empty() => join_text_parts(parts.iter().flat_map(part_texts)),
        _ => content.as_str().unwrap_or_default().to_string(),
    }
}

fn message_content_text(candidate: &Value) -> String {
    match candidate.pointer("/message/content") {
        Some(content) => match content.get("parts").and_then(Value::as_array) {
            Some(parts) => join_text_parts(
                parts
                    .iter()
                    .map(|p| p.get("text").and_then(Value::as_str).unwrap_or_default()),
            ),
            None => content.as_str().unwrap_or_default().to_string(),
        },
        None => String::new(),
    }
}

/// Extracts the answer text, trying progressively looser layouts.
///
/// Falls back to the serialized payload so the caller can still inspect it.
pub fn extract_text(data: &Value) -> String {
    let first_candidate = data
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first());

    let text = match first_candidate {
        Some(candidate) => {
            let content = candidate
                .get("content")
                .or_else(|| candidate.pointer("/message/content"));
            let mut text = content.map(content_text).unwrap_or_default();
            if text.is_empty() {
                text = match candidate.get("display") {
                    Some(Value::String(display)) => display.clone(),
                    Some(Value::Null) | None => message_content_text(candidate),
                    Some(other) => other.to_string(),
                };
            }
            text
        }
        None => ["output", "text"]
            .iter()
            .find_map(|key| data.get(*key).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string(),
    };

    if text.is_empty() {
        data.to_string()
    } else {
        text
    }
}

/// Normalises a 2xx payload.
pub fn parse_response(data: Value) -> GenerationResult {
    GenerationResult {
        text: extract_text(&data),
        usage: Usage::from_payload(&data),
        model_version: data
            .get("modelVersion")
            .and_then(Value::as_str)
            .map(str::to_string),
        response_id: data
            .get("responseId")
            .and_then(Value::as_str)
            .map(str::to_string),
        raw: data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let request = GenerationRequest::new("Hello", 0.7, 500);
        let body = build_request(
            &request,
            vec![InlineDataPayload {
                mime_type: "image/png".to_string(),
                data: "AAAA".to_string(),
            }],
        );
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Hello");
        assert_eq!(json["contents"][0]["parts"][1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 500);
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_standard_payload() {
        let data = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hello " }, { "text": "world" }] } }],
            "usageMetadata": { "promptTokenCount": 3, "candidatesTokenCount": 2, "totalTokenCount": 5 },
            "modelVersion": "gemini-2.0-flash",
            "responseId": "abc"
        });
        let result = parse_response(data);
        assert_eq!(result.text, "Hello world");
        assert_eq!(result.usage.unwrap().total_tokens, Some(5));
        assert_eq!(result.model_version.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(result.response_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_string_parts_and_nested_message_parts() {
        let data = json!({
            "candidates": [{ "content": { "parts": [
                "plain ",
                { "message": { "content": { "parts": [{ "text": "nested" }] } } }
            ] } }]
        });
        assert_eq!(extract_text(&data), "plain nested");
    }

    #[test]
    fn test_display_and_message_fallbacks() {
        let display = json!({ "candidates": [{ "content": { "parts": [] }, "display": "shown" }] });
        assert_eq!(extract_text(&display), "shown");

        let message = json!({ "candidates": [{ "message": { "content": "from message" } }] });
        assert_eq!(extract_text(&message), "from message");
    }

    #[test]
    fn test_top_level_output_and_raw_fallback() {
        assert_eq!(extract_text(&json!({ "output": "out" })), "out");
        assert_eq!(extract_text(&json!({ "text": "txt" })), "txt");

        let odd = json!({ "candidates": [] });
        assert_eq!(extract_text(&odd), r#"{"candidates":[]}"#);
    }
}
