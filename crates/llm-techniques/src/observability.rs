//! # Observability
//!
//! One-call initialisation of a `tracing` subscriber for the crate's
//! diagnostics. Every module logs under an `llm_techniques::*` target, so the
//! filter below captures gateway calls, sandbox runs and technique progress
//! without touching other crates' output.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Configuration for [`init`].
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// The maximum level captured for `llm_techniques` targets.
    pub level: Level,
    pub target: LogTarget,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            target: LogTarget::default(),
        }
    }
}

/// Where formatted events go.
#[derive(Debug, Clone, Default)]
pub enum LogTarget {
    /// Standard error, leaving stdout free for results.
    #[default]
    Console,
    File(String),
}

/// Installs the global subscriber. `RUST_LOG` directives are honoured in
/// addition to the configured level.
///
/// Fails if the filter directive does not parse, the log file cannot be
/// created, or a global subscriber is already set.
pub fn init(config: ObservabilityConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("llm_techniques={}", config.level).parse()?);

    let subscriber = tracing_subscriber::registry().with(filter);

    match config.target {
        LogTarget::Console => {
            let layer = fmt::layer().with_writer(std::io::stderr);
            subscriber.with(layer).try_init()?;
        }
        LogTarget::File(path) => {
            let file = std::fs::File::create(path)?;
            let layer = fmt::layer().with_ansi(false).with_writer(file);
            subscriber.with(layer).try_init()?;
        }
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails_instead_of_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("techniques.log");
        let config = ObservabilityConfig {
            level: Level::DEBUG,
            target: LogTarget::File(path.to_string_lossy().into_owned()),
        };
        let _ = init(config.clone());
        assert!(init(config).is_err());
    }
}
