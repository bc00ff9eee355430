//! Technique dispatch.
//!
//! [`TechniqueDispatcher`] owns one executor per [`TechniqueId`], built once
//! from the injected collaborators. Dispatch is a table lookup: an unknown
//! identifier is rejected before any model call is made.

use crate::documents::{DocumentSource, InMemoryDocumentStore, KnowledgeSource, StaticKnowledgeBase};
use crate::error::TechniqueError;
use crate::gateway::ModelGateway;
use crate::params::TechniqueParams;
use crate::sandbox::Sandbox;
use crate::techniques::{
    ChainOfThought, DirectionalStimulus, FewShot, ProgramAided, ReAct, Reflexion, RetrievalAugmented,
    SelfConsistency, Technique, TechniqueId, TechniqueResult, ZeroShot,
};
use crate::tools::{SimulatedTools, ToolExecutor};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Maps technique identifiers to executors and stamps results with the model name.
pub struct TechniqueDispatcher {
    gateway: Arc<dyn ModelGateway>,
    techniques: HashMap<TechniqueId, Box<dyn Technique>>,
}

impl TechniqueDispatcher {
    /// A dispatcher with default collaborators: an empty document store, the
    /// static knowledge base, simulated tools and the default sandbox.
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self::builder(gateway).build()
    }

    pub fn builder(gateway: Arc<dyn ModelGateway>) -> TechniqueDispatcherBuilder {
        TechniqueDispatcherBuilder::new(gateway)
    }

    /// Model name attached to every result.
    pub fn model_name(&self) -> &str {
        self.gateway.model_name()
    }

    /// Identifiers with a registered executor.
    pub fn techniques(&self) -> Vec<TechniqueId> {
        TechniqueId::ALL
            .into_iter()
            .filter(|id| self.techniques.contains_key(id))
            .collect()
    }

    /// Runs the technique named by `technique`.
    ///
    /// Accepts the canonical identifiers plus the `cot` and `reflextion`
    /// aliases. The only error is [`TechniqueError::UnsupportedTechnique`].
    pub async fn run(
        &self,
        technique: &str,
        input: &str,
        params: &TechniqueParams,
    ) -> Result<TechniqueResult, TechniqueError> {
        let id = technique.parse::<TechniqueId>().inspect_err(|err| {
            warn!(target: "llm_techniques::dispatcher", error = %err, "Rejected technique");
        })?;
        self.run_id(id, input, params).await
    }

    #[instrument(name = "dispatch", skip_all, fields(technique = %id))]
    pub async fn run_id(
        &self,
        id: TechniqueId,
        input: &str,
        params: &TechniqueParams,
    ) -> Result<TechniqueResult, TechniqueError> {
        let technique = self
            .techniques
            .get(&id)
            .ok_or_else(|| TechniqueError::UnsupportedTechnique(id.to_string()))?;

        let result = technique.run(input, params).await;
        info!(
            target: "llm_techniques::dispatcher",
            technique = %id,
            model = self.model_name(),
            outputs = result.outputs.len(),
            "Technique finished"
        );
        Ok(result.with_model(self.model_name()))
    }
}

/// Builder for [`TechniqueDispatcher`]. Unset collaborators take their defaults.
pub struct TechniqueDispatcherBuilder {
    gateway: Arc<dyn ModelGateway>,
    documents: Option<Arc<dyn DocumentSource>>,
    knowledge: Option<Arc<dyn KnowledgeSource>>,
    tools: Option<Arc<dyn ToolExecutor>>,
    sandbox: Option<Sandbox>,
}

impl TechniqueDispatcherBuilder {
    fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self {
            gateway,
            documents: None,
            knowledge: None,
            tools: None,
            sandbox: None,
        }
    }

    /// Uploaded documents searched and attached by retrieval augmentation.
    pub fn with_documents(mut self, documents: Arc<dyn DocumentSource>) -> Self {
        self.documents = Some(documents);
        self
    }

    pub fn with_knowledge(mut self, knowledge: Arc<dyn KnowledgeSource>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    /// Tools available to the ReAct loop.
    pub fn with_tools(mut self, tools: Arc<dyn ToolExecutor>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Sandbox for program-aided reasoning, and for the simulated
    /// `calculate` tool when no tools are supplied.
    pub fn with_sandbox(mut self, sandbox: Sandbox) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    pub fn build(self) -> TechniqueDispatcher {
        let gateway = self.gateway;
        let sandbox = self.sandbox.unwrap_or_default();
        let documents = self
            .documents
            .unwrap_or_else(|| Arc::new(InMemoryDocumentStore::new()));
        let knowledge = self
            .knowledge
            .unwrap_or_else(|| Arc::new(StaticKnowledgeBase::default()));
        let tools = self
            .tools
            .unwrap_or_else(|| Arc::new(SimulatedTools::new(sandbox.clone())));

        let executors: Vec<Box<dyn Technique>> = vec![
            Box::new(ZeroShot::new(gateway.clone())),
            Box::new(FewShot::new(gateway.clone())),
            Box::new(ChainOfThought::new(gateway.clone())),
            Box::new(SelfConsistency::new(gateway.clone())),
            Box::new(ProgramAided::new(gateway.clone(), sandbox)),
            Box::new(DirectionalStimulus::new(gateway.clone())),
            Box::new(ReAct::new(gateway.clone(), tools)),
            Box::new(Reflexion::new(gateway.clone())),
            Box::new(RetrievalAugmented::new(gateway.clone(), documents, knowledge)),
        ];
        let techniques = executors
            .into_iter()
            .map(|technique| (technique.id(), technique))
            .collect();

        TechniqueDispatcher { gateway, techniques }
    }
}
