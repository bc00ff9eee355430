use super::{OutputDetails, Technique, TechniqueId, TechniqueOutput, TechniqueResult, elapsed_ms, generate, recover};
use crate::error::TechniqueError;
use crate::extract::{UNKNOWN_LABEL, labeled_field};
use crate::gateway::{ModelGateway, Usage};
use crate::params::TechniqueParams;
use crate::prompt;
use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

const GENERATOR_TEMPERATURE: f32 = 0.7;
const SOLVER_TEMPERATURE: f32 = 0.0;
const MAX_TOKENS: u32 = 500;

/// Two calls: one model writes hints, a second solves guided by them.
pub struct DirectionalStimulus {
    gateway: Arc<dyn ModelGateway>,
}

/// Everything after `Directional Stimuli:`, or the whole generator output.
pub(crate) fn parse_stimuli(text: &str) -> String {
    Regex::new(r"(?i)Directional Stimuli:\s*")
        .ok()
        .and_then(|re| re.find(text))
        .map(|m| text[m.end()..].trim().to_string())
        .unwrap_or_else(|| text.to_string())
}

/// `Answer:` up to `Justification:`, and the justification, which falls back
/// to the whole solver output.
pub(crate) fn parse_solution(text: &str) -> (String, String) {
    let answer = labeled_field(text, "Answer", &["Justification:"])
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
    let justification =
        labeled_field(text, "Justification", &[]).unwrap_or_else(|| text.to_string());
    (answer, justification)
}

impl DirectionalStimulus {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }

    async fn execute(
        &self,
        input: &str,
        started: Instant,
    ) -> Result<TechniqueResult, TechniqueError> {
        let generator_prompt = prompt::directional_generator(input)?;
        let (generator_text, generator) = generate(
            self.gateway.as_ref(),
            &generator_prompt,
            GENERATOR_TEMPERATURE,
            MAX_TOKENS,
        )
        .await;
        let stimuli = parse_stimuli(&generator_text);

        let solver_prompt = prompt::directional_solver(input, &stimuli)?;
        let (solver_text, solver) = generate(
            self.gateway.as_ref(),
            &solver_prompt,
            SOLVER_TEMPERATURE,
            MAX_TOKENS,
        )
        .await;
        let (answer, justification) = parse_solution(&solver_text);

        let output = TechniqueOutput {
            final_answer: answer,
            raw_text: format!(
                "[Generator Output]:\n{generator_text}\n\n[Solver Output]:\n{solver_text}"
            ),
            raw: json!({ "generator": generator.raw, "solver": solver.raw }),
            usage: Usage::sum([generator.usage, solver.usage]),
            latency_ms: elapsed_ms(started),
            details: OutputDetails::DirectionalStimulus {
                stimuli,
                justification,
            },
        };
        let prompt_log =
            format!("[Generator Prompt]:\n{generator_prompt}\n\n[Solver Prompt]:\n{solver_prompt}");
        Ok(TechniqueResult::single(self.id(), prompt_log, output))
    }
}

#[async_trait]
impl Technique for DirectionalStimulus {
    fn id(&self) -> TechniqueId {
        TechniqueId::DirectionalStimulus
    }

    /// Temperatures and token caps are fixed per phase; params are not consulted.
    #[instrument(name = "directional_stimulus", skip_all)]
    async fn run(&self, input: &str, _params: &TechniqueParams) -> TechniqueResult {
        let started = Instant::now();
        recover(self.id(), started, self.execute(input, started).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stimuli_marker() {
        let text = "Sure.\nDirectional Stimuli:\n- speed\n- distance";
        assert_eq!(parse_stimuli(text), "- speed\n- distance");
        assert_eq!(parse_stimuli("- just hints"), "- just hints");
    }

    #[test]
    fn test_answer_and_justification() {
        let (answer, justification) =
            parse_solution("Answer: 60 km/h\nJustification: distance over time");
        assert_eq!(answer, "60 km/h");
        assert_eq!(justification, "distance over time");
    }

    #[test]
    fn test_solution_fallbacks() {
        let (answer, justification) = parse_solution("It is probably 60.");
        assert_eq!(answer, "Unknown");
        assert_eq!(justification, "It is probably 60.");
    }
}
