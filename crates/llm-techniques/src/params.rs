//! The per-invocation configuration bag.
//!
//! Every technique reads the options it recognises and ignores the rest.
//! Keys are camelCase so a JSON request body can be passed straight through.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A worked example for the few-shot technique.
///
/// An example with a `label` renders as a classification pair, one with a
/// `summary` as a summarisation pair, and one with neither as an empty output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FewShotExample {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl FewShotExample {
    pub fn labelled(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: Some(label.into()),
            summary: None,
        }
    }

    pub fn summarised(text: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: None,
            summary: Some(summary.into()),
        }
    }
}

/// Options recognised by the technique executors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TechniqueParams {
    /// Replaces the technique's default instruction line.
    pub instruction: Option<String>,
    /// Sampling temperature; accepts a number or a numeric string.
    #[serde(deserialize_with = "lenient_f32")]
    pub temperature: Option<f32>,
    /// Output token cap for each model call.
    pub max_tokens: Option<u32>,
    /// Closed label set for zero-shot and few-shot classification.
    pub allowed_labels: Option<Vec<String>>,
    /// Worked examples for few-shot (at most three are used).
    pub examples: Vec<FewShotExample>,
    /// ReAct loop bound.
    pub max_iterations: Option<usize>,
    /// ReAct tool catalogue description.
    pub tool_spec: Option<String>,
    /// Reflection budget announced to the model by Reflexion.
    pub max_reflections: Option<u32>,
    /// Retrieval result cap.
    pub max_documents: Option<usize>,
    /// Informational retrieval method label.
    pub retrieval_method: Option<String>,
    /// Whether retrieval searches uploaded documents.
    pub use_uploaded_docs: Option<bool>,
    /// Whether retrieval attaches uploaded files for direct analysis.
    pub use_files_directly: Option<bool>,
    /// Reasoning style announced in the retrieval prompt.
    pub reasoning_style: Option<String>,
}

impl TechniqueParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds params from an arbitrary JSON value.
    ///
    /// A bag that does not deserialize (wrong types, not an object) degrades
    /// to the defaults rather than failing the invocation.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Self::default(),
            other => serde_json::from_value(other).unwrap_or_else(|err| {
                tracing::warn!(
                    target: "llm_techniques::params",
                    error = %err,
                    "Ignoring malformed technique params"
                );
                Self::default()
            }),
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_allowed_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_examples(mut self, examples: Vec<FewShotExample>) -> Self {
        self.examples = examples;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_max_documents(mut self, max_documents: usize) -> Self {
        self.max_documents = Some(max_documents);
        self
    }

    pub fn with_files_directly(mut self, enabled: bool) -> Self {
        self.use_files_directly = Some(enabled);
        self
    }

    /// The trimmed, non-empty allowed labels, or `None` when no usable label was given.
    pub fn allowed_labels(&self) -> Option<Vec<String>> {
        let labels: Vec<String> = self
            .allowed_labels
            .as_ref()?
            .iter()
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
            .collect();
        (!labels.is_empty()).then_some(labels)
    }

    /// The caller's instruction, unless blank.
    pub fn instruction(&self) -> Option<&str> {
        self.instruction
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn temperature_or(&self, default: f32) -> f32 {
        self.temperature.unwrap_or(default)
    }

    pub fn max_tokens_or(&self, default: u32) -> u32 {
        self.max_tokens.unwrap_or(default)
    }
}

fn lenient_f32<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64().map(|v| v as f32),
        Some(Value::String(s)) => s.trim().parse::<f32>().ok(),
        _ => None,
    })
}
