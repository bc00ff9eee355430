//! Retrieval-augmented generation.
//!
//! Retrieval merges uploaded documents (lexically scored, boosted by one
//! point) with the knowledge source, highest score first. Separately, up to
//! three uploaded files are attached to the model call so binary content can
//! be analysed directly.

use super::{OutputDetails, Technique, TechniqueId, TechniqueOutput, TechniqueResult, recover};
use crate::documents::{DocumentSource, KnowledgeSource, RetrievedDocument};
use crate::error::TechniqueError;
use crate::gateway::{FileInput, GenerationRequest, ModelGateway};
use crate::params::TechniqueParams;
use crate::prompt;
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 1200;
/// Attached files need room for their analysis.
const MAX_TOKENS_WITH_FILES: u32 = 1500;
pub const DEFAULT_MAX_DOCUMENTS: usize = 5;
/// Passages returned when nothing scored.
const GENERAL_FALLBACK: usize = 3;
const MAX_ATTACHED_FILES: usize = 3;
/// Added to an uploaded document's score so user material ranks first.
const UPLOAD_BOOST: f64 = 1.0;

const GENERIC_FILE_TERMS: [&str; 7] = ["definition", "guide", "manual", "tutorial", "reference", "doc", "info"];
const HELP_WORDS: [&str; 6] = ["what", "how", "define", "explain", "guide", "help"];

/// Sentence openers that mark the model citing its sources.
const CITATION_PATTERNS: [&str; 4] = [
    r"(?i)Based on the retrieved information[^.]*\.",
    r"(?i)According to the documents[^.]*\.",
    r"(?i)The sources indicate[^.]*\.",
    r"(?i)From the context provided[^.]*\.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RagStepKind {
    Retrieval,
    Reasoning,
    Generation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RagStep {
    #[serde(rename = "type")]
    pub kind: RagStepKind,
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

impl RagStep {
    fn new(kind: RagStepKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            sources: Vec::new(),
        }
    }

    fn label(&self) -> &'static str {
        match self.kind {
            RagStepKind::Retrieval => "🔍 Document Retrieval:",
            RagStepKind::Reasoning => "🧠 Reasoning:",
            RagStepKind::Generation => "✍️ Generated Response:",
        }
    }
}

/// Whether an uploaded text file is worth attaching for `query`.
pub(crate) fn is_file_relevant(filename: &str, query: &str) -> bool {
    let filename = filename.to_lowercase();
    let query = query.to_lowercase();
    let words: Vec<&str> = query.split_whitespace().filter(|w| w.chars().count() > 2).collect();

    if words.iter().any(|word| filename.contains(word)) {
        return true;
    }
    GENERIC_FILE_TERMS.iter().any(|term| filename.contains(term))
        && words.iter().any(|word| HELP_WORDS.contains(word))
}

/// Every match of `start`, each running to the next `stop` or the end.
fn blocks_until<'a>(text: &'a str, start: &str, stop: &str) -> Vec<&'a str> {
    let (Ok(start_re), Ok(stop_re)) = (Regex::new(start), Regex::new(stop)) else {
        return Vec::new();
    };
    let mut blocks = Vec::new();
    let mut from = 0;
    while let Some(found) = start_re.find_at(text, from) {
        let end = stop_re
            .find_at(text, found.end())
            .map(|m| m.start())
            .unwrap_or(text.len());
        blocks.push(text[found.start()..end].trim());
        from = end.max(found.end());
    }
    blocks
}

/// Joins every citation sentence and analysis block found, in pattern order.
pub(crate) fn extract_reasoning(text: &str) -> String {
    let mut groups: Vec<String> = CITATION_PATTERNS
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .map(|re| re.find_iter(text).map(|m| m.as_str()).collect::<Vec<_>>().join(" "))
        .collect();
    groups.push(blocks_until(text, r"(?i)DOCUMENT ANALYSIS:?", r"(?i)REASONING|ANSWER").join(" "));
    groups.push(blocks_until(text, r"(?i)REASONING:?", r"(?i)ANSWER").join(" "));

    groups
        .into_iter()
        .filter(|group| !group.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Body after the first `marker`, up to a blank line. Empty bodies count as absent.
fn marked_answer(text: &str, marker: &str) -> Option<String> {
    let found = Regex::new(marker).ok()?.find(text)?;
    let rest = &text[found.end()..];
    let end = rest.find("\n\n").unwrap_or(rest.len());
    let body = rest[..end].trim();
    (!body.is_empty()).then(|| body.to_string())
}

/// `Final Answer:` / `Conclusion:` / `Summary:`, then "In conclusion" or
/// "To summarize", then the last paragraph.
pub(crate) fn extract_final_answer(text: &str) -> String {
    marked_answer(text, r"(?i)(?:Final Answer|Conclusion|Summary):\s*")
        .or_else(|| marked_answer(text, r"(?i)(?:In conclusion|To summarize)[\s,]*"))
        .or_else(|| {
            text.split("\n\n")
                .filter(|p| !p.trim().is_empty())
                .last()
                .map(|p| p.trim().to_string())
        })
        .unwrap_or_else(|| text.to_string())
}

fn format_reasoning(steps: &[RagStep]) -> String {
    steps
        .iter()
        .map(|step| format!("{}\n{}", step.label(), step.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Retrieval then grounded generation.
pub struct RetrievalAugmented {
    gateway: Arc<dyn ModelGateway>,
    documents: Arc<dyn DocumentSource>,
    knowledge: Arc<dyn KnowledgeSource>,
}

impl RetrievalAugmented {
    pub fn new(
        gateway: Arc<dyn ModelGateway>,
        documents: Arc<dyn DocumentSource>,
        knowledge: Arc<dyn KnowledgeSource>,
    ) -> Self {
        Self {
            gateway,
            documents,
            knowledge,
        }
    }

    /// Uploads and knowledge passages merged, sorted and truncated.
    pub fn retrieve(&self, query: &str, max_documents: usize, use_uploaded: bool) -> Vec<RetrievedDocument> {
        let mut candidates: Vec<RetrievedDocument> = Vec::new();
        if use_uploaded {
            candidates.extend(self.documents.search_documents(query).into_iter().map(|scored| {
                RetrievedDocument::new(
                    scored.document.content,
                    format!("📎 {}", scored.document.filename),
                    scored.relevance_score + UPLOAD_BOOST,
                )
            }));
        }
        let uploaded = candidates.len();
        candidates.extend(self.knowledge.search(query));

        candidates.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        candidates.truncate(max_documents);
        debug!(
            target: "llm_techniques::techniques",
            uploaded,
            kept = candidates.len(),
            "Retrieval merged"
        );

        if candidates.is_empty() {
            return self.knowledge.general(max_documents.min(GENERAL_FALLBACK));
        }
        candidates
    }

    /// Files to attach: non-text uploads and relevant text uploads, newest first.
    fn select_files(&self, query: &str) -> (Vec<FileInput>, Vec<String>) {
        let mut files = Vec::new();
        let mut names = Vec::new();
        let candidates = self
            .documents
            .all_documents()
            .into_iter()
            .filter(|doc| doc.file_type.is_binary() || is_file_relevant(&doc.filename, query))
            .take(MAX_ATTACHED_FILES);
        for doc in candidates {
            if let Some(file) = self.documents.file_for_ai(&doc.id) {
                files.push(file);
                names.push(doc.filename);
            }
        }
        (files, names)
    }

    async fn execute(
        &self,
        input: &str,
        params: &TechniqueParams,
        started: Instant,
    ) -> Result<TechniqueResult, TechniqueError> {
        let max_documents = params.max_documents.unwrap_or(DEFAULT_MAX_DOCUMENTS);
        let use_uploaded = params.use_uploaded_docs.unwrap_or(true);
        let use_files = params.use_files_directly.unwrap_or(true);
        info!(
            target: "llm_techniques::techniques",
            method = params.retrieval_method.as_deref().unwrap_or("lexical"),
            max_documents,
            use_uploaded,
            use_files,
            "Retrieval started"
        );

        let retrieved = self.retrieve(input, max_documents, use_uploaded);
        let (files, processed_files) = if use_files {
            self.select_files(input)
        } else {
            (Vec::new(), Vec::new())
        };

        let mut prompt =
            prompt::retrieval_augmented(input, &retrieved, params.reasoning_style.as_deref())?;
        let temperature = params.temperature_or(TEMPERATURE);
        let generation = if files.is_empty() {
            let request = GenerationRequest::new(prompt.clone(), temperature, params.max_tokens_or(MAX_TOKENS));
            self.gateway.generate(&request).await
        } else {
            prompt.push_str(&prompt::attached_files_note(&processed_files)?);
            let request = GenerationRequest::new(
                prompt.clone(),
                temperature,
                params.max_tokens_or(MAX_TOKENS_WITH_FILES),
            );
            self.gateway.generate_with_files(&request, &files).await
        };
        let raw_text = generation.text.trim().to_string();

        let mut retrieval_summary = format!(
            "Retrieved {} relevant documents from knowledge base",
            retrieved.len()
        );
        if !processed_files.is_empty() {
            retrieval_summary.push_str(&format!(
                " and processed {} uploaded files: {}",
                processed_files.len(),
                processed_files.join(", ")
            ));
        }
        let mut retrieval = RagStep::new(RagStepKind::Retrieval, retrieval_summary);
        retrieval.sources = retrieved
            .iter()
            .map(|doc| doc.source.clone())
            .chain(processed_files.iter().cloned())
            .collect();

        let mut steps = vec![retrieval];
        let reasoning = extract_reasoning(&raw_text);
        if !reasoning.is_empty() {
            steps.push(RagStep::new(RagStepKind::Reasoning, reasoning));
        }
        steps.push(RagStep::new(RagStepKind::Generation, raw_text.clone()));

        let answer = extract_final_answer(&raw_text);
        let output = TechniqueOutput::from_generation(
            answer,
            raw_text,
            generation,
            started,
            OutputDetails::Rag {
                reasoning: format_reasoning(&steps),
                steps,
                retrieved_documents: retrieved,
                processed_files,
            },
        );
        Ok(TechniqueResult::single(self.id(), prompt, output))
    }
}

#[async_trait]
impl Technique for RetrievalAugmented {
    fn id(&self) -> TechniqueId {
        TechniqueId::Rag
    }

    #[instrument(name = "retrieval_augmented", skip_all)]
    async fn run(&self, input: &str, params: &TechniqueParams) -> TechniqueResult {
        let started = Instant::now();
        recover(self.id(), started, self.execute(input, params, started).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_relevance() {
        assert!(is_file_relevant("Quarterly_Report.txt", "summarize the quarterly numbers"));
        assert!(is_file_relevant("rust-guide.md", "how do lifetimes work"));
        assert!(!is_file_relevant("rust-guide.md", "lifetimes in depth"));
        assert!(!is_file_relevant("notes.txt", "is it ok"));
    }

    #[test]
    fn test_final_answer_markers_in_order() {
        let text = "ANSWER:\nLong answer.\n\nFinal Answer: Short answer.\n\nExtra.";
        assert_eq!(extract_final_answer(text), "Short answer.");

        let text = "Discussion here.\n\nIn conclusion, solar is cheaper.";
        assert_eq!(extract_final_answer(text), "solar is cheaper.");

        let text = "First paragraph.\n\nLast paragraph.";
        assert_eq!(extract_final_answer(text), "Last paragraph.");
        assert_eq!(extract_final_answer(""), "");
    }

    #[test]
    fn test_empty_marker_body_moves_to_next_strategy() {
        let text = "To summarize, it works.\n\nSummary:";
        assert_eq!(extract_final_answer(text), "it works.");
    }

    #[test]
    fn test_reasoning_extraction() {
        let text = "DOCUMENT ANALYSIS:\nDoc 1 defines AI.\n\nREASONING:\nSo AI is simulation.\n\nANSWER:\nAI simulates intelligence.";
        let reasoning = extract_reasoning(text);
        assert_eq!(
            reasoning,
            "DOCUMENT ANALYSIS:\nDoc 1 defines AI. REASONING:\nSo AI is simulation."
        );

        let cited = "According to the documents, AI learns. Nothing else";
        assert_eq!(extract_reasoning(cited), "According to the documents, AI learns.");
        assert_eq!(extract_reasoning("plain"), "");
    }

    #[test]
    fn test_step_serialization() {
        let step = RagStep::new(RagStepKind::Generation, "text");
        let json = serde_json::to_value(step).unwrap();
        assert_eq!(json["type"], "generation");
        assert!(json.get("sources").is_none());
    }
}
