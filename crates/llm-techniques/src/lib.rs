//! 'llm-techniques' - Prompting techniques over a text-generation back end.
//!
//! The crate runs nine prompting techniques (zero-shot, few-shot,
//! chain-of-thought, self-consistency, program-aided reasoning, directional
//! stimulus, ReAct, Reflexion and retrieval augmentation) against any
//! [`ModelGateway`] and returns a uniform [`TechniqueResult`].
//!
//! Model output is free text. Every field a technique reports is pulled out by
//! an ordered chain of extraction strategies that ends in a sentinel answer,
//! so a run never fails once the technique identifier has been accepted.
//!
//! ```rust,no_run
//! use llm_techniques::{HttpGateway, TechniqueDispatcher, TechniqueParams};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = Arc::new(HttpGateway::from_env()?);
//! let dispatcher = TechniqueDispatcher::new(gateway);
//! let params = TechniqueParams::new().with_allowed_labels(["Positive", "Neutral", "Negative"]);
//! let result = dispatcher.run("zero_shot", "I love this product!", &params).await?;
//! println!("{:?}", result.final_answer());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod documents;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod params;
pub mod prompt;
pub mod sandbox;
pub mod techniques;
pub mod tools;

#[cfg(feature = "observability")]
pub mod observability;

pub use config::{GatewayConfig, WireShape};
pub use dispatcher::{TechniqueDispatcher, TechniqueDispatcherBuilder};
pub use documents::{
    DocumentSource, FileType, InMemoryDocumentStore, KnowledgeSource, RetrievedDocument,
    StaticKnowledgeBase, UploadedDocument,
};
pub use error::{ConfigError, DocumentError, GatewayError, PromptError, SandboxError, TechniqueError};
pub use gateway::{FileInput, GenerationRequest, GenerationResult, ModelGateway, Usage};
pub use params::{FewShotExample, TechniqueParams};
pub use sandbox::{Sandbox, SandboxLimits};
pub use techniques::{OutputDetails, Technique, TechniqueId, TechniqueOutput, TechniqueResult};
pub use tools::{SimulatedTools, ToolExecutor};

#[cfg(feature = "http")]
pub use gateway::HttpGateway;
