use super::{OutputDetails, Technique, TechniqueId, TechniqueOutput, TechniqueResult, generate, recover};
use crate::error::TechniqueError;
use crate::extract::zero_shot_label;
use crate::gateway::ModelGateway;
use crate::params::TechniqueParams;
use crate::prompt;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Deterministic, always zero.
const TEMPERATURE: f32 = 0.0;
/// A single label needs only a few tokens.
const MAX_TOKENS: u32 = 30;

/// Single-call classification or short answer, normalised to one label.
pub struct ZeroShot {
    gateway: Arc<dyn ModelGateway>,
}

impl ZeroShot {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }

    async fn execute(
        &self,
        input: &str,
        params: &TechniqueParams,
        started: Instant,
    ) -> Result<TechniqueResult, TechniqueError> {
        let allowed = params.allowed_labels();
        let prompt = prompt::zero_shot(input, params.instruction(), allowed.as_deref())?;

        let (raw_text, generation) = generate(
            self.gateway.as_ref(),
            &prompt,
            TEMPERATURE,
            params.max_tokens_or(MAX_TOKENS),
        )
        .await;
        let label = zero_shot_label(&raw_text, allowed.as_deref());

        let output =
            TechniqueOutput::from_generation(label, raw_text, generation, started, OutputDetails::Label {});
        Ok(TechniqueResult::single(self.id(), prompt, output))
    }
}

#[async_trait]
impl Technique for ZeroShot {
    fn id(&self) -> TechniqueId {
        TechniqueId::ZeroShot
    }

    #[instrument(name = "zero_shot", skip_all)]
    async fn run(&self, input: &str, params: &TechniqueParams) -> TechniqueResult {
        let started = Instant::now();
        recover(self.id(), started, self.execute(input, params, started).await)
    }
}
