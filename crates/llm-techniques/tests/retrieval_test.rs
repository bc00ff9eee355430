//! Retrieval augmentation over uploaded documents and the knowledge base.

mod common;

use common::MockGateway;
use llm_techniques::techniques::{RagStepKind, RetrievalAugmented};
use llm_techniques::{
    InMemoryDocumentStore, OutputDetails, StaticKnowledgeBase, Technique, TechniqueParams,
};
use std::io::Write;
use std::sync::Arc;

const STRUCTURED_ANSWER: &str = "DOCUMENT ANALYSIS:\nDocument 1 explains solar panels.\n\nREASONING:\nSunlight becomes electricity.\n\nANSWER:\nSolar panels convert sunlight.\n\nFinal Answer: Solar panels turn sunlight into electricity.";

fn technique(gateway: &MockGateway, store: Arc<InMemoryDocumentStore>) -> RetrievalAugmented {
    RetrievalAugmented::new(
        Arc::new(gateway.clone()),
        store,
        Arc::new(StaticKnowledgeBase::default()),
    )
}

#[tokio::test]
async fn test_uploads_rank_first_and_binary_files_are_attached() {
    let dir = tempfile::tempdir().unwrap();
    let png_path = dir.path().join("diagram.png");
    let mut png = std::fs::File::create(&png_path).unwrap();
    png.write_all(&[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a]).unwrap();

    let store = Arc::new(InMemoryDocumentStore::new());
    store
        .insert_text(
            "solar_notes.txt",
            "Solar panels convert sunlight into electricity. Solar energy is renewable.",
        )
        .unwrap();
    store
        .insert_upload(
            "diagram.png",
            Some("image/png"),
            &[0x89, 0x50, 0x4e, 0x47],
            Some(png_path.clone()),
        )
        .unwrap();

    let gateway = MockGateway::new([STRUCTURED_ANSWER]);
    let result = technique(&gateway, store)
        .run("How does solar energy work?", &TechniqueParams::default())
        .await;

    let output = result.output().unwrap();
    assert_eq!(output.final_answer, "Solar panels turn sunlight into electricity.");

    let OutputDetails::Rag {
        steps,
        retrieved_documents,
        processed_files,
        reasoning,
    } = &output.details
    else {
        panic!("unexpected details: {:?}", output.details);
    };

    assert!(retrieved_documents.len() <= 5);
    assert!(
        retrieved_documents
            .windows(2)
            .all(|pair| pair[0].relevance_score >= pair[1].relevance_score)
    );
    assert!(retrieved_documents[0].source.starts_with("📎 "));
    assert!(
        retrieved_documents
            .iter()
            .any(|doc| doc.source == "📎 solar_notes.txt")
    );

    // Only the image has a backing file on disk.
    assert_eq!(processed_files, &vec!["diagram.png".to_string()]);

    let kinds: Vec<RagStepKind> = steps.iter().map(|step| step.kind).collect();
    assert_eq!(
        kinds,
        vec![RagStepKind::Retrieval, RagStepKind::Reasoning, RagStepKind::Generation]
    );
    assert!(steps[0].content.contains("and processed 1 uploaded files: diagram.png"));
    assert!(steps[0].sources.contains(&"diagram.png".to_string()));
    assert!(steps[1].content.starts_with("DOCUMENT ANALYSIS:"));
    assert!(reasoning.starts_with("🔍 Document Retrieval:"));

    let calls = gateway.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].files.len(), 1);
    assert_eq!(calls[0].files[0].path, png_path);
    assert_eq!(calls[0].files[0].mime_type, "image/png");
    assert_eq!(calls[0].request.max_output_tokens, 1500);
    assert!(calls[0].request.prompt.contains("Files included: diagram.png"));
}

#[tokio::test]
async fn test_knowledge_base_only() {
    let gateway = MockGateway::new(["Machine learning lets computers learn.\n\nIt is a part of AI."]);
    let result = technique(&gateway, Arc::new(InMemoryDocumentStore::new()))
        .run("What is machine learning?", &TechniqueParams::default())
        .await;

    let output = result.output().unwrap();
    assert_eq!(output.final_answer, "It is a part of AI.");

    let OutputDetails::Rag {
        steps,
        retrieved_documents,
        processed_files,
        ..
    } = &output.details
    else {
        panic!("unexpected details: {:?}", output.details);
    };
    assert!(processed_files.is_empty());
    assert!(
        retrieved_documents
            .iter()
            .any(|doc| doc.source == "Machine Learning Textbook")
    );
    // No analysis markers, so no reasoning step.
    assert_eq!(steps.len(), 2);
    assert_eq!(
        steps[0].content,
        format!(
            "Retrieved {} relevant documents from knowledge base",
            retrieved_documents.len()
        )
    );

    let calls = gateway.calls().await;
    assert!(calls[0].files.is_empty());
    assert_eq!(calls[0].request.max_output_tokens, 1200);
    assert!(calls[0].request.prompt.contains("Machine Learning Textbook"));
}

#[tokio::test]
async fn test_unmatched_query_falls_back_to_general_passages() {
    let gateway = MockGateway::new(["Nothing relevant.\n\nConclusion: unknown."]);
    let result = technique(&gateway, Arc::new(InMemoryDocumentStore::new()))
        .run("zzz qqq", &TechniqueParams::new().with_max_documents(2))
        .await;

    let output = result.output().unwrap();
    assert_eq!(output.final_answer, "unknown.");
    let OutputDetails::Rag {
        retrieved_documents,
        ..
    } = &output.details
    else {
        panic!("unexpected details: {:?}", output.details);
    };
    assert_eq!(retrieved_documents.len(), 2);
    assert!(retrieved_documents.iter().all(|doc| doc.relevance_score == 0.1));
}

#[tokio::test]
async fn test_uploaded_documents_can_be_disabled() {
    let store = Arc::new(InMemoryDocumentStore::new());
    store
        .insert_text("solar_notes.txt", "Solar panels convert sunlight into electricity.")
        .unwrap();

    let gateway = MockGateway::new(["Final Answer: sunlight"]);
    let params = TechniqueParams::from_value(serde_json::json!({
        "useUploadedDocs": false,
        "useFilesDirectly": false
    }));
    let result = technique(&gateway, store).run("How does solar power work?", &params).await;

    let output = result.output().unwrap();
    assert_eq!(output.final_answer, "sunlight");
    let OutputDetails::Rag {
        retrieved_documents,
        ..
    } = &output.details
    else {
        panic!("unexpected details: {:?}", output.details);
    };
    assert!(
        retrieved_documents
            .iter()
            .all(|doc| !doc.source.starts_with("📎 "))
    );
}

#[tokio::test]
async fn test_direct_file_analysis_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let png_path = dir.path().join("solar_diagram.png");
    std::fs::write(&png_path, [0x89, 0x50, 0x4e, 0x47]).unwrap();

    let store = Arc::new(InMemoryDocumentStore::new());
    store
        .insert_upload(
            "solar_diagram.png",
            Some("image/png"),
            &[0x89, 0x50, 0x4e, 0x47],
            Some(png_path),
        )
        .unwrap();

    let gateway = MockGateway::new(["Final Answer: sunlight"]);
    let params = TechniqueParams::new().with_files_directly(false);
    let result = technique(&gateway, store)
        .run("How does solar power work?", &params)
        .await;

    let OutputDetails::Rag {
        processed_files,
        retrieved_documents,
        ..
    } = &result.output().unwrap().details
    else {
        panic!("unexpected details");
    };
    assert!(processed_files.is_empty());
    // The upload still takes part in retrieval.
    assert!(
        retrieved_documents
            .iter()
            .any(|doc| doc.source == "📎 solar_diagram.png")
    );

    let calls = gateway.calls().await;
    assert!(calls[0].files.is_empty());
    assert_eq!(calls[0].request.max_output_tokens, 1200);
    assert!(!calls[0].request.prompt.contains("Files included"));
}
