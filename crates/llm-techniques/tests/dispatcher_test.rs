//! Dispatch by identifier, collaborator injection and the result envelope.

mod common;

use async_trait::async_trait;
use common::{MOCK_MODEL, MockGateway};
use llm_techniques::{
    OutputDetails, Sandbox, SandboxLimits, TechniqueDispatcher, TechniqueError, TechniqueId,
    TechniqueParams, ToolExecutor,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[tokio::test]
async fn test_unsupported_technique_makes_no_model_call() {
    let gateway = MockGateway::repeating("anything");
    let dispatcher = TechniqueDispatcher::new(Arc::new(gateway.clone()));

    let err = dispatcher
        .run("tree_of_thought", "What is 2 + 2?", &TechniqueParams::default())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Unsupported technique: tree_of_thought");
    assert!(matches!(err, TechniqueError::UnsupportedTechnique(_)));
    assert_eq!(gateway.call_count().await, 0);
}

#[tokio::test]
async fn test_every_identifier_returns_a_well_formed_result() {
    let gateway = MockGateway::repeating("Positive");
    let dispatcher = TechniqueDispatcher::new(Arc::new(gateway));
    let params = TechniqueParams::new().with_max_iterations(2);

    for id in TechniqueId::ALL {
        let result = dispatcher
            .run(id.as_str(), "I love this product!", &params)
            .await
            .unwrap();
        assert_eq!(result.technique, id);
        assert_eq!(result.model.as_deref(), Some(MOCK_MODEL));
        assert!(!result.outputs.is_empty(), "{id} returned no outputs");
        assert!(!result.prompt.is_empty(), "{id} returned no prompt");

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["model"], MOCK_MODEL);
        assert!(json["outputs"][0]["finalAnswer"].is_string());
    }
}

#[tokio::test]
async fn test_legacy_aliases() {
    let gateway = MockGateway::repeating("REASONING:\nok\nFINAL_ANSWER: 4");
    let dispatcher = TechniqueDispatcher::new(Arc::new(gateway));

    let result = dispatcher
        .run("cot", "2 + 2", &TechniqueParams::default())
        .await
        .unwrap();
    assert_eq!(result.technique, TechniqueId::ChainOfThought);
    assert_eq!(result.final_answer(), Some("4"));

    let result = dispatcher
        .run("reflextion", "2 + 2", &TechniqueParams::default())
        .await
        .unwrap();
    assert_eq!(result.technique, TechniqueId::Reflexion);
    assert_eq!(result.final_answer(), Some("4"));
}

#[tokio::test]
async fn test_zero_shot_example_from_json_params() {
    let gateway = MockGateway::new(["Neutral"]);
    let dispatcher = TechniqueDispatcher::new(Arc::new(gateway));
    let params = TechniqueParams::from_value(serde_json::json!({
        "allowedLabels": ["Positive", "Neutral", "Negative"],
        "unknownKey": true
    }));

    let result = dispatcher
        .run("zero_shot", "I love this product!", &params)
        .await
        .unwrap();

    assert_eq!(result.final_answer(), Some("Neutral"));
    assert!(matches!(result.output().unwrap().details, OutputDetails::Label {}));
}

/// Records the actions it was asked to run.
#[derive(Default)]
struct RecordingTools {
    actions: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ToolExecutor for RecordingTools {
    async fn execute(&self, action: &str, input: &str) -> String {
        self.actions
            .lock()
            .await
            .push((action.to_string(), input.to_string()));
        format!("looked up {input}")
    }
}

#[tokio::test]
async fn test_injected_tools_and_sandbox() {
    let tools = Arc::new(RecordingTools::default());
    let gateway = MockGateway::new([
        "Thought: find it\nAction: lookup\nAction Input: borrow checker",
        "Thought: done\nAction: finish\nAction Input: ownership rules",
        "PROGRAM_CODE:\n```\nfn solution() { loop {} }\n```",
    ]);
    let sandbox = Sandbox::new(SandboxLimits::default().with_timeout(Duration::from_millis(100)));
    let dispatcher = TechniqueDispatcher::builder(Arc::new(gateway))
        .with_tools(tools.clone())
        .with_sandbox(sandbox)
        .build();

    let result = dispatcher
        .run("react", "What enforces ownership?", &TechniqueParams::default())
        .await
        .unwrap();
    assert_eq!(result.final_answer(), Some("ownership rules"));
    let actions = tools.actions.lock().await.clone();
    assert_eq!(actions[0], ("lookup".to_string(), "borrow checker".to_string()));

    let result = dispatcher
        .run("pal", "Spin", &TechniqueParams::default())
        .await
        .unwrap();
    assert_eq!(
        result.final_answer(),
        Some("Error: Script execution timed out after 100ms")
    );
}
