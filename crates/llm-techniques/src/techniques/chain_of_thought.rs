use super::{OutputDetails, Technique, TechniqueId, TechniqueOutput, TechniqueResult, generate, recover};
use crate::error::TechniqueError;
use crate::extract::{UNKNOWN_LABEL, last_paragraph, parse_section};
use crate::gateway::ModelGateway;
use crate::params::TechniqueParams;
use crate::prompt;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

const TEMPERATURE: f32 = 0.0;
const MAX_TOKENS: u32 = 500;

/// Step-by-step reasoning followed by a concise answer.
pub struct ChainOfThought {
    gateway: Arc<dyn ModelGateway>,
}

/// `REASONING` (empty when absent) and the answer: `FINAL_ANSWER`, else the
/// last paragraph, else `Unknown`.
pub(crate) fn parse_chain_of_thought(text: &str) -> (String, String) {
    let reasoning = parse_section(text, "REASONING").unwrap_or_default();
    let answer = parse_section(text, "FINAL_ANSWER")
        .or_else(|| last_paragraph(text))
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
    (reasoning, answer)
}

impl ChainOfThought {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }

    async fn execute(
        &self,
        input: &str,
        params: &TechniqueParams,
        started: Instant,
    ) -> Result<TechniqueResult, TechniqueError> {
        let prompt = prompt::chain_of_thought(input, params.instruction())?;
        let (raw_text, generation) = generate(
            self.gateway.as_ref(),
            &prompt,
            params.temperature_or(TEMPERATURE),
            params.max_tokens_or(MAX_TOKENS),
        )
        .await;

        let (reasoning, answer) = parse_chain_of_thought(&raw_text);
        let output = TechniqueOutput::from_generation(
            answer,
            raw_text,
            generation,
            started,
            OutputDetails::ChainOfThought { reasoning },
        );
        Ok(TechniqueResult::single(self.id(), prompt, output))
    }
}

#[async_trait]
impl Technique for ChainOfThought {
    fn id(&self) -> TechniqueId {
        TechniqueId::ChainOfThought
    }

    #[instrument(name = "chain_of_thought", skip_all)]
    async fn run(&self, input: &str, params: &TechniqueParams) -> TechniqueResult {
        let started = Instant::now();
        recover(self.id(), started, self.execute(input, params, started).await)
    }
}
