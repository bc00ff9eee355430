use super::{OutputDetails, Technique, TechniqueId, TechniqueOutput, TechniqueResult, elapsed_ms, generate, recover};
use crate::error::TechniqueError;
use crate::extract::labeled_field;
use crate::gateway::{ModelGateway, Usage};
use crate::params::TechniqueParams;
use crate::prompt;
use crate::tools::ToolExecutor;
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 800;
pub const DEFAULT_MAX_ITERATIONS: usize = 5;
/// Upper bound on a caller-supplied iteration budget.
pub const MAX_ITERATIONS_CEILING: usize = 20;
/// Action that ends the loop; its input is the answer.
const FINISH_ACTION: &str = "finish";
pub const UNDETERMINED_ANSWER: &str = "Unable to determine answer";

/// One Thought / Action / Observation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReActStep {
    pub thought: String,
    pub action: String,
    pub action_input: String,
    pub observation: String,
}

impl ReActStep {
    pub fn is_finish(&self) -> bool {
        self.action.eq_ignore_ascii_case(FINISH_ACTION)
    }
}

/// Parses one model turn. `None` when neither a thought nor an action is present.
///
/// The prompt ends with `Thought:`, so a turn usually opens with the thought
/// text itself; whatever precedes `Action:` is taken as the thought when no
/// explicit label is found.
pub(crate) fn parse_step(response: &str) -> Option<ReActStep> {
    let thought = labeled_field(response, "Thought", &["Action:"])
        .or_else(|| {
            let action_at = Regex::new(r"(?i)\bAction:").ok()?.find(response)?.start();
            let before = response[..action_at].trim();
            (!before.is_empty()).then(|| before.to_string())
        })
        .unwrap_or_default();
    let action = labeled_field(response, "Action", &["Action Input:"]).unwrap_or_default();
    let action_input =
        labeled_field(response, "Action Input", &["Observation:"]).unwrap_or_default();

    if thought.is_empty() && action.is_empty() {
        return None;
    }
    Some(ReActStep {
        thought,
        action,
        action_input,
        observation: String::new(),
    })
}

fn format_reasoning(steps: &[ReActStep]) -> String {
    steps
        .iter()
        .enumerate()
        .map(|(index, step)| {
            let mut block = format!(
                "Step {}:\nThought: {}\nAction: {} - {}\n",
                index + 1,
                step.thought,
                step.action,
                step.action_input
            );
            if !step.observation.is_empty() {
                block.push_str(&format!("Result: {}", step.observation));
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Reason-and-act loop over a [`ToolExecutor`].
pub struct ReAct {
    gateway: Arc<dyn ModelGateway>,
    tools: Arc<dyn ToolExecutor>,
}

impl ReAct {
    pub fn new(gateway: Arc<dyn ModelGateway>, tools: Arc<dyn ToolExecutor>) -> Self {
        Self { gateway, tools }
    }

    async fn execute(
        &self,
        input: &str,
        params: &TechniqueParams,
        started: Instant,
    ) -> Result<TechniqueResult, TechniqueError> {
        let prompt = prompt::react(input, params.tool_spec.as_deref())?;
        let max_iterations = params
            .max_iterations
            .unwrap_or(DEFAULT_MAX_ITERATIONS)
            .min(MAX_ITERATIONS_CEILING);
        let temperature = params.temperature_or(TEMPERATURE);
        let max_tokens = params.max_tokens_or(MAX_TOKENS);

        let mut transcript = prompt.clone();
        let mut steps: Vec<ReActStep> = Vec::new();
        let mut responses = Vec::new();
        let mut payloads = Vec::new();
        let mut usages = Vec::new();
        let mut final_answer = String::new();
        let mut completed = false;

        for iteration in 0..max_iterations {
            let (response, generation) =
                generate(self.gateway.as_ref(), &transcript, temperature, max_tokens).await;
            usages.push(generation.usage);
            payloads.push(generation.raw);
            responses.push(response.clone());

            let Some(mut step) = parse_step(&response) else {
                debug!(target: "llm_techniques::techniques", iteration, "Unstructured turn taken as the answer");
                final_answer = response;
                break;
            };

            step.observation = self.tools.execute(&step.action, &step.action_input).await;
            debug!(
                target: "llm_techniques::techniques",
                iteration,
                action = %step.action,
                "ReAct step"
            );

            if step.is_finish() {
                final_answer = step.action_input.clone();
                completed = true;
                steps.push(step);
                break;
            }

            transcript.push_str(&format!(
                "\n\nThought: {}\nAction: {}\nAction Input: {}\nObservation: {}\n\nThought:",
                step.thought, step.action, step.action_input, step.observation
            ));
            steps.push(step);
        }

        if final_answer.is_empty() {
            final_answer = steps
                .last()
                .and_then(|last| {
                    [&last.observation, &last.action_input]
                        .into_iter()
                        .find(|value| !value.is_empty())
                        .cloned()
                })
                .unwrap_or_else(|| UNDETERMINED_ANSWER.to_string());
        }

        info!(
            target: "llm_techniques::techniques",
            iterations = steps.len(),
            completed,
            "ReAct loop finished"
        );

        let output = TechniqueOutput {
            final_answer,
            raw_text: responses.join("\n\n"),
            raw: Value::Array(payloads),
            usage: Usage::sum(usages),
            latency_ms: elapsed_ms(started),
            details: OutputDetails::React {
                reasoning: format_reasoning(&steps),
                iterations: steps.len(),
                completed,
                steps,
            },
        };
        Ok(TechniqueResult::single(self.id(), prompt, output))
    }
}

#[async_trait]
impl Technique for ReAct {
    fn id(&self) -> TechniqueId {
        TechniqueId::React
    }

    #[instrument(name = "react", skip_all, fields(max_iterations = params.max_iterations))]
    async fn run(&self, input: &str, params: &TechniqueParams) -> TechniqueResult {
        let started = Instant::now();
        recover(self.id(), started, self.execute(input, params, started).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labelled_step() {
        let step = parse_step(
            "Thought: I need the product.\nAction: calculate\nAction Input: 6 * 7\nObservation: 42",
        )
        .unwrap();
        assert_eq!(step.thought, "I need the product.");
        assert_eq!(step.action, "calculate");
        assert_eq!(step.action_input, "6 * 7");
        assert!(step.observation.is_empty());
    }

    #[test]
    fn test_parse_continuation_without_thought_label() {
        let step = parse_step("I know it now.\nAction: Finish\nAction Input: 42").unwrap();
        assert_eq!(step.thought, "I know it now.");
        assert!(step.is_finish());
        assert_eq!(step.action_input, "42");
    }

    #[test]
    fn test_unstructured_turn() {
        assert_eq!(parse_step("The answer is 42."), None);
        assert_eq!(parse_step(""), None);
    }

    #[test]
    fn test_reasoning_format() {
        let steps = vec![
            ReActStep {
                thought: "look it up".into(),
                action: "search".into(),
                action_input: "rust".into(),
                observation: "found".into(),
            },
            ReActStep {
                thought: "done".into(),
                action: "finish".into(),
                action_input: "Rust".into(),
                observation: String::new(),
            },
        ];
        assert_eq!(
            format_reasoning(&steps),
            "Step 1:\nThought: look it up\nAction: search - rust\nResult: found\n\nStep 2:\nThought: done\nAction: finish - Rust\n"
        );
    }
}
