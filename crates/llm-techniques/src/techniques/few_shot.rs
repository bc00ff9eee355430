use super::{OutputDetails, Technique, TechniqueId, TechniqueOutput, TechniqueResult, generate, recover};
use crate::error::TechniqueError;
use crate::extract::few_shot_answer;
use crate::gateway::ModelGateway;
use crate::params::TechniqueParams;
use crate::prompt;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

const TEMPERATURE: f32 = 0.0;
const MAX_TOKENS: u32 = 24;

/// Single call primed with up to three worked examples.
///
/// Unlike zero-shot, a multi-word final line is kept verbatim so the
/// technique also serves short generative tasks such as titling.
pub struct FewShot {
    gateway: Arc<dyn ModelGateway>,
}

impl FewShot {
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
        let prompt = prompt::few_shot(
            input,
            &params.examples,
            params.instruction(),
            allowed.as_deref(),
        )?;

        let (raw_text, generation) = generate(
            self.gateway.as_ref(),
            &prompt,
            TEMPERATURE,
            params.max_tokens_or(MAX_TOKENS),
        )
        .await;
        let answer = few_shot_answer(&raw_text, allowed.as_deref());

        let output =
            TechniqueOutput::from_generation(answer, raw_text, generation, started, OutputDetails::Label {});
        Ok(TechniqueResult::single(self.id(), prompt, output))
    }
}

#[async_trait]
impl Technique for FewShot {
    fn id(&self) -> TechniqueId {
        TechniqueId::FewShot
    }

    #[instrument(name = "few_shot", skip_all, fields(examples = params.examples.len()))]
    async fn run(&self, input: &str, params: &TechniqueParams) -> TechniqueResult {
        let started = Instant::now();
        recover(self.id(), started, self.execute(input, params, started).await)
    }
}
