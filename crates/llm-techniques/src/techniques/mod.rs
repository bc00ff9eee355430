//! Technique executors and the uniform result envelope.
//!
//! Every executor implements [`Technique`]. `run` never fails: model errors
//! flow through as `LLM_ERROR:` text, parse misses resolve to sentinel
//! answers, and an internal failure (a prompt that does not render) is folded
//! into a [`OutputDetails::Failure`] record.

pub mod chain_of_thought;
pub mod directional_stimulus;
pub mod few_shot;
pub mod program_aided;
pub mod react;
pub mod reflexion;
pub mod retrieval_augmented;
pub mod self_consistency;
pub mod zero_shot;

pub use chain_of_thought::ChainOfThought;
pub use directional_stimulus::DirectionalStimulus;
pub use few_shot::FewShot;
pub use program_aided::ProgramAided;
pub use react::{ReAct, ReActStep};
pub use reflexion::{Reflexion, ReflexionStep, ReflexionStepKind};
pub use retrieval_augmented::{RagStep, RagStepKind, RetrievalAugmented};
pub use self_consistency::SelfConsistency;
pub use zero_shot::ZeroShot;

use crate::documents::RetrievedDocument;
use crate::error::TechniqueError;
use crate::extract::UNKNOWN_LABEL;
use crate::gateway::{GenerationRequest, GenerationResult, ModelGateway, Usage};
use crate::params::TechniqueParams;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::debug;

/// The closed set of technique identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechniqueId {
    ZeroShot,
    FewShot,
    #[serde(alias = "cot")]
    ChainOfThought,
    SelfConsistency,
    Pal,
    DirectionalStimulus,
    React,
    #[serde(alias = "reflextion")]
    Reflexion,
    Rag,
}

impl TechniqueId {
    pub const ALL: [TechniqueId; 9] = [
        Self::ZeroShot,
        Self::FewShot,
        Self::ChainOfThought,
        Self::SelfConsistency,
        Self::Pal,
        Self::DirectionalStimulus,
        Self::React,
        Self::Reflexion,
        Self::Rag,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ZeroShot => "zero_shot",
            Self::FewShot => "few_shot",
            Self::ChainOfThought => "chain_of_thought",
            Self::SelfConsistency => "self_consistency",
            Self::Pal => "pal",
            Self::DirectionalStimulus => "directional_stimulus",
            Self::React => "react",
            Self::Reflexion => "reflexion",
            Self::Rag => "rag",
        }
    }
}

impl fmt::Display for TechniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TechniqueId {
    type Err = TechniqueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cot" => Ok(Self::ChainOfThought),
            "reflextion" => Ok(Self::Reflexion),
            other => Self::ALL
                .into_iter()
                .find(|id| id.as_str() == other)
                .ok_or_else(|| TechniqueError::UnsupportedTechnique(other.to_string())),
        }
    }
}

/// Fields specific to one technique, flattened into the output record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum OutputDetails {
    /// Zero-shot and few-shot carry nothing beyond the common fields.
    Label {},
    ChainOfThought {
        reasoning: String,
    },
    SelfConsistency {
        reasoning_paths: Vec<String>,
    },
    ProgramAided {
        code: String,
        execution_error: Option<String>,
    },
    DirectionalStimulus {
        stimuli: String,
        justification: String,
    },
    React {
        steps: Vec<ReActStep>,
        completed: bool,
        iterations: usize,
        reasoning: String,
    },
    Reflexion {
        steps: Vec<ReflexionStep>,
        reflection_count: usize,
        reasoning: String,
    },
    Rag {
        steps: Vec<RagStep>,
        retrieved_documents: Vec<RetrievedDocument>,
        processed_files: Vec<String>,
        reasoning: String,
    },
    /// The technique could not run; `error` says why.
    Failure {
        error: String,
    },
}

/// One output record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechniqueOutput {
    pub final_answer: String,
    pub raw_text: String,
    pub raw: Value,
    pub usage: Option<Usage>,
    pub latency_ms: u64,
    #[serde(flatten)]
    pub details: OutputDetails,
}

impl TechniqueOutput {
    /// An output built from a single generation call.
    pub fn from_generation(
        final_answer: impl Into<String>,
        raw_text: impl Into<String>,
        generation: GenerationResult,
        started: Instant,
        details: OutputDetails,
    ) -> Self {
        Self {
            final_answer: final_answer.into(),
            raw_text: raw_text.into(),
            raw: generation.raw,
            usage: generation.usage,
            latency_ms: elapsed_ms(started),
            details,
        }
    }
}

/// The envelope every technique returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechniqueResult {
    pub technique: TechniqueId,
    /// Model identity, attached by the dispatcher.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// The prompt sent, or a labelled log of every prompt for multi-call techniques.
    pub prompt: String,
    pub outputs: Vec<TechniqueOutput>,
}

impl TechniqueResult {
    pub fn single(technique: TechniqueId, prompt: impl Into<String>, output: TechniqueOutput) -> Self {
        Self {
            technique,
            model: None,
            prompt: prompt.into(),
            outputs: vec![output],
        }
    }

    /// The sentinel record returned when a technique could not run.
    pub fn failed(technique: TechniqueId, error: &TechniqueError, started: Instant) -> Self {
        let output = TechniqueOutput {
            final_answer: UNKNOWN_LABEL.to_string(),
            raw_text: String::new(),
            raw: Value::Null,
            usage: None,
            latency_ms: elapsed_ms(started),
            details: OutputDetails::Failure {
                error: error.to_string(),
            },
        };
        Self::single(technique, String::new(), output)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// The first output record. Present on every result this crate builds.
    pub fn output(&self) -> Option<&TechniqueOutput> {
        self.outputs.first()
    }

    pub fn final_answer(&self) -> Option<&str> {
        self.output().map(|output| output.final_answer.as_str())
    }
}

/// A prompting technique.
#[async_trait]
pub trait Technique: Send + Sync {
    fn id(&self) -> TechniqueId;

    /// Runs the technique against `input`. Never fails.
    async fn run(&self, input: &str, params: &TechniqueParams) -> TechniqueResult;
}

/// Folds an internal failure into the sentinel result.
pub(crate) fn recover(
    technique: TechniqueId,
    started: Instant,
    outcome: Result<TechniqueResult, TechniqueError>,
) -> TechniqueResult {
    outcome.unwrap_or_else(|err| {
        tracing::warn!(
            target: "llm_techniques::techniques",
            technique = %technique,
            error = %err,
            "Technique failed before completing"
        );
        TechniqueResult::failed(technique, &err, started)
    })
}

/// One gateway call with the text trimmed.
pub(crate) async fn generate(
    gateway: &dyn ModelGateway,
    prompt: &str,
    temperature: f32,
    max_output_tokens: u32,
) -> (String, GenerationResult) {
    let request = GenerationRequest::new(prompt, temperature, max_output_tokens);
    let result = gateway.generate(&request).await;
    debug!(
        target: "llm_techniques::techniques",
        temperature,
        max_output_tokens,
        chars = result.text.len(),
        error = result.is_error(),
        "Model call returned"
    );
    (result.text.trim().to_string(), result)
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
