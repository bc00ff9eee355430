use super::{OutputDetails, Technique, TechniqueId, TechniqueOutput, TechniqueResult, generate, recover};
use crate::error::TechniqueError;
use crate::extract::{UNKNOWN_LABEL, split_numbered};
use crate::gateway::ModelGateway;
use crate::params::TechniqueParams;
use crate::prompt;
use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Diverse paths need sampling.
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 1000;

/// Several independent reasoning paths in one call, then a majority answer.
pub struct SelfConsistency {
    gateway: Arc<dyn ModelGateway>,
}

fn find_offset(pattern: &str, text: &str) -> Option<(usize, usize)> {
    Regex::new(pattern).ok()?.find(text).map(|m| (m.start(), m.end()))
}

/// The enumerated paths and the final answer.
///
/// The paths block runs from `Reasoning Paths:` to `Final Answer:` (or the
/// end) and is split on numbered-list markers. The answer is everything
/// after the first `Final Answer:`.
pub(crate) fn parse_self_consistency(text: &str) -> (Vec<String>, String) {
    let block = find_offset(r"(?i)Reasoning Paths:\s*", text)
        .map(|(_, body_start)| {
            let rest = &text[body_start..];
            let end = find_offset(r"(?i)Final Answer:", rest)
                .map(|(start, _)| start)
                .unwrap_or(rest.len());
            rest[..end].trim()
        })
        .unwrap_or_default();

    let answer = find_offset(r"(?i)Final Answer:\s*", text)
        .map(|(_, body_start)| text[body_start..].trim())
        .filter(|answer| !answer.is_empty())
        .unwrap_or(UNKNOWN_LABEL);

    (split_numbered(block), answer.to_string())
}

impl SelfConsistency {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }

    async fn execute(
        &self,
        input: &str,
        params: &TechniqueParams,
        started: Instant,
    ) -> Result<TechniqueResult, TechniqueError> {
        let prompt = prompt::self_consistency(input, params.instruction())?;
        let (raw_text, generation) = generate(
            self.gateway.as_ref(),
            &prompt,
            params.temperature_or(TEMPERATURE),
            params.max_tokens_or(MAX_TOKENS),
        )
        .await;

        let (reasoning_paths, answer) = parse_self_consistency(&raw_text);
        let output = TechniqueOutput::from_generation(
            answer,
            raw_text,
            generation,
            started,
            OutputDetails::SelfConsistency { reasoning_paths },
        );
        Ok(TechniqueResult::single(self.id(), prompt, output))
    }
}

#[async_trait]
impl Technique for SelfConsistency {
    fn id(&self) -> TechniqueId {
        TechniqueId::SelfConsistency
    }

    #[instrument(name = "self_consistency", skip_all)]
    async fn run(&self, input: &str, params: &TechniqueParams) -> TechniqueResult {
        let started = Instant::now();
        recover(self.id(), started, self.execute(input, params, started).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_and_answer() {
        let text = "Reasoning Paths:\n1. 2+2 is 4\n2. Two pairs make 4\n3. Count: 4\nFinal Answer: 4";
        let (paths, answer) = parse_self_consistency(text);
        assert_eq!(paths, vec!["1. 2+2 is 4", "Two pairs make 4", "Count: 4"]);
        assert_eq!(answer, "4");
    }

    #[test]
    fn test_unsplittable_block_is_single_path() {
        let text = "reasoning paths: all agree on blue\nfinal answer: Blue";
        let (paths, answer) = parse_self_consistency(text);
        assert_eq!(paths, vec!["all agree on blue"]);
        assert_eq!(answer, "Blue");
    }

    #[test]
    fn test_missing_markers() {
        let (paths, answer) = parse_self_consistency("just some text");
        assert_eq!(paths, vec![""]);
        assert_eq!(answer, "Unknown");
    }
}
