//! Tool execution for the ReAct loop.

use crate::sandbox::Sandbox;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Inputs made only of numbers, operators and grouping.
static ARITHMETIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\s+\-*/().,]+$").expect("arithmetic regex"));

/// Executes a named ReAct action and returns the observation text.
///
/// Implementations never fail: an unusable input yields an explanatory
/// observation instead.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, action: &str, input: &str) -> String;
}

/// Deterministic stand-in for real tools.
///
/// `calculate` evaluates plain arithmetic in the [`Sandbox`]; every other
/// action returns a canned observation mentioning its input.
#[derive(Debug, Clone, Default)]
pub struct SimulatedTools {
    sandbox: Sandbox,
}

impl SimulatedTools {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }

    async fn calculate(&self, input: &str) -> String {
        if ARITHMETIC_RE.is_match(input) {
            match self.sandbox.evaluate_arithmetic(input).await {
                Ok(result) => return format!("Calculation result: {input} = {result}"),
                Err(err) => debug!(target: "llm_techniques::tools", error = %err, "Calculation failed"),
            }
        }
        format!(
            "Calculation for \"{input}\": Mathematical computation completed with relevant numerical result."
        )
    }
}

#[async_trait]
impl ToolExecutor for SimulatedTools {
    async fn execute(&self, action: &str, input: &str) -> String {
        match action.to_lowercase().as_str() {
            "search" => format!(
                "Search results for \"{input}\": Found relevant information about {input}. This appears to be related to the query and provides context for analysis."
            ),
            "calculate" => self.calculate(input).await,
            "lookup" => format!(
                "Lookup result for \"{input}\": Found definition and relevant information that helps understand the context."
            ),
            "analyze" => format!(
                "Analysis of \"{input}\": Examined the data/information and identified key patterns, relationships, and insights relevant to the question."
            ),
            "finish" => format!("Task completed with final answer: {input}"),
            _ => format!(
                "Executed {action} with input \"{input}\": Operation completed successfully with relevant results."
            ),
        }
    }
}
