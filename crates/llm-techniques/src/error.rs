//! Error types for the technique framework.
//!
//! Only [`TechniqueError::UnsupportedTechnique`] ever reaches a caller of the
//! dispatcher. Every other variant is produced inside an executor and folded
//! into a sentinel output record before the executor returns.

use thiserror::Error;

/// Errors raised while executing a technique.
#[derive(Debug, Error)]
pub enum TechniqueError {
    /// The requested technique identifier is not one of the registered ones.
    #[error("Unsupported technique: {0}")]
    UnsupportedTechnique(String),

    /// A prompt template failed to render.
    #[error("Prompt rendering failed: {0}")]
    Prompt(#[from] PromptError),
}

/// Errors raised by the prompt builders.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

/// Failures inside a model gateway.
///
/// Gateways never return these to techniques: they are rendered into an
/// `LLM_ERROR:` text by [`crate::gateway::GenerationResult::from_error`].
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request could not be sent or the body could not be read.
    #[error("{0}")]
    Http(String),

    /// The provider answered with a non-success status.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The provider answered 2xx with a body that is not JSON.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// An attached file could not be read.
    #[error("Failed to read attachment {path}: {reason}")]
    Attachment { path: String, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised by the sandboxed evaluator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SandboxError {
    /// The program did not parse.
    #[error("{0}")]
    Compile(String),

    /// The program raised an error while running.
    #[error("{0}")]
    Runtime(String),

    /// The program exceeded its wall-clock budget and was preempted.
    #[error("Script execution timed out after {limit_ms}ms")]
    Timeout { limit_ms: u64 },

    /// The program does not define a zero-argument `solution` function.
    #[error("solution is not defined")]
    MissingEntryPoint,

    /// The evaluation thread could not be joined.
    #[error("evaluation task failed: {0}")]
    Join(String),
}

/// Errors raised by the document store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("File appears to be empty or unreadable.")]
    Empty,

    #[error("File content too large ({len} characters). Please upload files with less than {}KB of text content.", .max / 1000)]
    TooLarge { len: usize, max: usize },

    #[error("Could not process file {filename}: {reason}")]
    Unreadable { filename: String, reason: String },

    #[error("Document not found: {0}")]
    NotFound(String),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    MissingVar(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}
