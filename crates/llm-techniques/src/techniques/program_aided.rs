use super::{OutputDetails, Technique, TechniqueId, TechniqueOutput, TechniqueResult, generate, recover};
use crate::error::TechniqueError;
use crate::extract::{parse_first_section, strip_code_fence};
use crate::gateway::ModelGateway;
use crate::params::TechniqueParams;
use crate::prompt;
use crate::sandbox::Sandbox;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

const TEMPERATURE: f32 = 0.0;
const MAX_TOKENS: u32 = 1000;

/// Answer used when the model produced no program.
pub const NO_CODE_ANSWER: &str = "No code generated";

/// Headers that may introduce the program, in preference order.
const CODE_HEADERS: [&str; 3] = ["PROGRAM_CODE", "JAVASCRIPT_CODE", "CODE"];

/// Program-aided reasoning: the model writes a program, the sandbox runs it.
pub struct ProgramAided {
    gateway: Arc<dyn ModelGateway>,
    sandbox: Sandbox,
}

/// The program text: a labelled section, else any fenced block.
pub(crate) fn extract_program(text: &str) -> String {
    if let Some((header, body)) = parse_first_section(text, &CODE_HEADERS) {
        debug!(target: "llm_techniques::techniques", header, "Program section found");
        return strip_code_fence(&body);
    }
    if text.contains("```") {
        return strip_code_fence(text);
    }
    String::new()
}

impl ProgramAided {
    pub fn new(gateway: Arc<dyn ModelGateway>, sandbox: Sandbox) -> Self {
        Self { gateway, sandbox }
    }

    async fn execute(
        &self,
        input: &str,
        params: &TechniqueParams,
        started: Instant,
    ) -> Result<TechniqueResult, TechniqueError> {
        let prompt = prompt::program_aided(input, params.instruction())?;
        let (raw_text, generation) = generate(
            self.gateway.as_ref(),
            &prompt,
            params.temperature_or(TEMPERATURE),
            params.max_tokens_or(MAX_TOKENS),
        )
        .await;

        let code = extract_program(&raw_text);
        let (answer, execution_error) = if code.is_empty() {
            (NO_CODE_ANSWER.to_string(), None)
        } else {
            match self.sandbox.run_solution(&code).await {
                Ok(value) => (value, None),
                Err(err) => (format!("Error: {err}"), Some(err.to_string())),
            }
        };

        let output = TechniqueOutput::from_generation(
            answer,
            raw_text,
            generation,
            started,
            OutputDetails::ProgramAided {
                code,
                execution_error,
            },
        );
        Ok(TechniqueResult::single(self.id(), prompt, output))
    }
}

#[async_trait]
impl Technique for ProgramAided {
    fn id(&self) -> TechniqueId {
        TechniqueId::Pal
    }

    #[instrument(name = "program_aided", skip_all)]
    async fn run(&self, input: &str, params: &TechniqueParams) -> TechniqueResult {
        let started = Instant::now();
        recover(self.id(), started, self.execute(input, params, started).await)
    }
}
