use super::{OutputDetails, Technique, TechniqueId, TechniqueOutput, TechniqueResult, generate, recover};
use crate::error::TechniqueError;
use crate::extract::parse_section;
use crate::gateway::ModelGateway;
use crate::params::TechniqueParams;
use crate::prompt;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 1500;
pub const DEFAULT_MAX_REFLECTIONS: u32 = 3;
/// Reflection cycles looked for in the output, whatever the budget.
pub const MAX_PARSED_CYCLES: u32 = 5;
pub const UNDETERMINED_FINAL_ANSWER: &str = "Unable to determine final answer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflexionStepKind {
    Initial,
    Reflection,
    Revision,
}

/// A parsed section. `step_number` is 0 for the initial attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflexionStep {
    #[serde(rename = "type")]
    pub kind: ReflexionStepKind,
    pub step_number: u32,
    pub content: String,
}

impl ReflexionStep {
    fn new(kind: ReflexionStepKind, step_number: u32, content: String) -> Self {
        Self {
            kind,
            step_number,
            content,
        }
    }

    fn label(&self) -> String {
        match self.kind {
            ReflexionStepKind::Initial => "🎯 Initial Attempt:".to_string(),
            ReflexionStepKind::Reflection => format!("🤔 Reflexion {}:", self.step_number),
            ReflexionStepKind::Revision => format!("📝 Revised Solution {}:", self.step_number),
        }
    }
}

/// The initial attempt, then reflection/revision pairs until the first cycle
/// with neither section.
pub(crate) fn parse_steps(text: &str) -> Vec<ReflexionStep> {
    let mut steps = Vec::new();
    if let Some(initial) = parse_section(text, "INITIAL_ATTEMPT") {
        steps.push(ReflexionStep::new(ReflexionStepKind::Initial, 0, initial));
    }

    for cycle in 1..=MAX_PARSED_CYCLES {
        let reflection = parse_section(text, &format!("REFLECTION_{cycle}"));
        let revision = parse_section(text, &format!("REVISED_SOLUTION_{cycle}"));
        if reflection.is_none() && revision.is_none() {
            break;
        }
        if let Some(content) = reflection {
            steps.push(ReflexionStep::new(ReflexionStepKind::Reflection, cycle, content));
        }
        if let Some(content) = revision {
            steps.push(ReflexionStep::new(ReflexionStepKind::Revision, cycle, content));
        }
    }
    steps
}

/// `FINAL_ANSWER`, else the latest revision, else the initial attempt.
pub(crate) fn final_answer(text: &str, steps: &[ReflexionStep]) -> String {
    parse_section(text, "FINAL_ANSWER")
        .or_else(|| {
            steps
                .iter()
                .rev()
                .find(|step| step.kind == ReflexionStepKind::Revision)
                .or_else(|| steps.iter().find(|step| step.kind == ReflexionStepKind::Initial))
                .map(|step| step.content.clone())
        })
        .unwrap_or_else(|| UNDETERMINED_FINAL_ANSWER.to_string())
}

fn format_reasoning(steps: &[ReflexionStep]) -> String {
    steps
        .iter()
        .map(|step| format!("{}\n{}", step.label(), step.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Self-critique in a single call: attempt, reflect, revise.
pub struct Reflexion {
    gateway: Arc<dyn ModelGateway>,
}

impl Reflexion {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }

    async fn execute(
        &self,
        input: &str,
        params: &TechniqueParams,
        started: Instant,
    ) -> Result<TechniqueResult, TechniqueError> {
        let max_reflections = params.max_reflections.unwrap_or(DEFAULT_MAX_REFLECTIONS);
        let prompt = prompt::reflexion(input, max_reflections)?;
        let (raw_text, generation) = generate(
            self.gateway.as_ref(),
            &prompt,
            params.temperature_or(TEMPERATURE),
            params.max_tokens_or(MAX_TOKENS),
        )
        .await;

        let steps = parse_steps(&raw_text);
        let answer = final_answer(&raw_text, &steps);
        let reflection_count = steps
            .iter()
            .filter(|step| step.kind == ReflexionStepKind::Reflection)
            .count();

        let output = TechniqueOutput::from_generation(
            answer,
            raw_text,
            generation,
            started,
            OutputDetails::Reflexion {
                reasoning: format_reasoning(&steps),
                reflection_count,
                steps,
            },
        );
        Ok(TechniqueResult::single(self.id(), prompt, output))
    }
}

#[async_trait]
impl Technique for Reflexion {
    fn id(&self) -> TechniqueId {
        TechniqueId::Reflexion
    }

    #[instrument(name = "reflexion", skip_all)]
    async fn run(&self, input: &str, params: &TechniqueParams) -> TechniqueResult {
        let started = Instant::now();
        recover(self.id(), started, self.execute(input, params, started).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_CYCLE: &str = "INITIAL_ATTEMPT:\n2 + 2 = 5\n\nREFLECTION_1:\nThe sum is wrong.\n\nREVISED_SOLUTION_1:\n2 + 2 = 4";

    #[test]
    fn test_one_cycle_yields_three_steps() {
        let steps = parse_steps(ONE_CYCLE);
        let kinds: Vec<_> = steps.iter().map(|s| (s.kind, s.step_number)).collect();
        assert_eq!(
            kinds,
            vec![
                (ReflexionStepKind::Initial, 0),
                (ReflexionStepKind::Reflection, 1),
                (ReflexionStepKind::Revision, 1),
            ]
        );
        assert_eq!(final_answer(ONE_CYCLE, &steps), "2 + 2 = 4");
    }

    #[test]
    fn test_explicit_final_answer_wins() {
        let text = format!("{ONE_CYCLE}\n\nFINAL_ANSWER: 4");
        let steps = parse_steps(&text);
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[2].content, "2 + 2 = 4");
        assert_eq!(final_answer(&text, &steps), "4");
    }

    #[test]
    fn test_parsing_stops_at_first_missing_cycle() {
        let text = "INITIAL_ATTEMPT: a\nREFLECTION_1: b\nREVISED_SOLUTION_1: c\nREFLECTION_3: skipped";
        let steps = parse_steps(text);
        assert_eq!(steps.len(), 3);
    }

    #[test]
    fn test_fallbacks() {
        let initial_only = "INITIAL_ATTEMPT:\nParis";
        let steps = parse_steps(initial_only);
        assert_eq!(final_answer(initial_only, &steps), "Paris");
        assert_eq!(final_answer("free text", &[]), "Unable to determine final answer");
    }

    #[test]
    fn test_reasoning_labels() {
        let steps = parse_steps(ONE_CYCLE);
        let reasoning = format_reasoning(&steps);
        assert!(reasoning.starts_with("🎯 Initial Attempt:\n2 + 2 = 5\n\n🤔 Reflexion 1:"));
        assert!(reasoning.ends_with("📝 Revised Solution 1:\n2 + 2 = 4"));
    }

    #[test]
    fn test_step_serialization() {
        let step = ReflexionStep::new(ReflexionStepKind::Revision, 2, "x".into());
        let json = serde_json::to_value(step).unwrap();
        assert_eq!(json["type"], "revision");
        assert_eq!(json["stepNumber"], 2);
    }
}
