//! Runs one prompting technique against a live model and prints the result.
//!
//! Gateway settings come from the environment (`LLM_API_KEY`, and optionally
//! `LLM_PROVIDER`, `LLM_MODEL`, `LLM_API_URL`).
//!
//! Usage:
//!   cargo run --example run_technique --features observability -- <technique> "<input>" ['<params json>']
//!
//! Example:
//!   cargo run --example run_technique --features observability -- zero_shot "I love this product!" \
//!     '{"allowedLabels": ["Positive", "Neutral", "Negative"]}'

use anyhow::{Context, bail};
use llm_techniques::observability::{self, ObservabilityConfig};
use llm_techniques::{HttpGateway, TechniqueDispatcher, TechniqueId, TechniqueParams};
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Set RUST_LOG=llm_techniques=debug for per-call detail.
    observability::init(ObservabilityConfig::default())
        .map_err(|err| anyhow::anyhow!("failed to initialise tracing: {err}"))?;

    let mut args = std::env::args().skip(1);
    let (Some(technique), Some(input)) = (args.next(), args.next()) else {
        let known: Vec<&str> = TechniqueId::ALL.iter().map(|id| id.as_str()).collect();
        bail!(
            "usage: run_technique <technique> <input> [params json]\ntechniques: {}",
            known.join(", ")
        );
    };
    let params = match args.next() {
        Some(raw) => TechniqueParams::from_value(
            serde_json::from_str(&raw).context("params must be a JSON object")?,
        ),
        None => TechniqueParams::default(),
    };

    let gateway = HttpGateway::from_env().context("gateway configuration")?;
    eprintln!("🔌 {} via {}", gateway.config().model, gateway.config().endpoint());
    let dispatcher = TechniqueDispatcher::new(Arc::new(gateway));

    let result = dispatcher.run(&technique, &input, &params).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
