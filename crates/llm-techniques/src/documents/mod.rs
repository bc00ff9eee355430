//! Uploaded documents, lexical relevance scoring and the knowledge base.
//!
//! Retrieval uses lexical scoring only. The store keeps documents for the
//! lifetime of the process.

pub mod knowledge;
pub mod scoring;
pub mod store;

pub use knowledge::{KnowledgePassage, KnowledgeSource, StaticKnowledgeBase};
pub use scoring::{rank_documents, score_document};
pub use store::InMemoryDocumentStore;

use crate::gateway::FileInput;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Coarse category of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Text,
    Pdf,
    Image,
    Audio,
    Video,
    Document,
}

impl FileType {
    /// Classifies by declared MIME type first, then by file extension.
    pub fn classify(mime_type: Option<&str>, filename: &str) -> Self {
        let mime = mime_type.unwrap_or_default().to_ascii_lowercase();
        let ext = extension(filename);
        let ext = ext.as_str();

        if mime.starts_with("image/")
            || matches!(ext, "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg" | "webp")
        {
            Self::Image
        } else if mime.starts_with("audio/")
            || matches!(ext, "mp3" | "wav" | "ogg" | "m4a" | "aac" | "flac")
        {
            Self::Audio
        } else if mime.starts_with("video/")
            || matches!(ext, "mp4" | "avi" | "mov" | "wmv" | "flv" | "webm" | "mkv")
        {
            Self::Video
        } else if mime == "application/pdf" || ext == "pdf" {
            Self::Pdf
        } else if matches!(ext, "doc" | "docx") {
            Self::Document
        } else {
            Self::Text
        }
    }

    /// Whether the model has to read the original file to see its content.
    pub fn is_binary(self) -> bool {
        !matches!(self, Self::Text)
    }
}

/// Lower-cased extension of `filename`, empty when there is none.
pub(crate) fn extension(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// A document held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedDocument {
    pub id: String,
    pub filename: String,
    /// Extracted text, or a descriptive placeholder for binary files.
    pub content: String,
    /// Size of the uploaded bytes.
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub file_type: FileType,
    /// Milliseconds since the Unix epoch.
    pub uploaded_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_path: Option<PathBuf>,
}

impl UploadedDocument {
    pub fn is_pdf(&self) -> bool {
        self.filename.to_lowercase().ends_with(".pdf")
    }
}

/// An uploaded document paired with its lexical relevance score.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredDocument {
    pub document: UploadedDocument,
    pub relevance_score: f64,
}

/// A passage placed into a retrieval-augmented prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedDocument {
    pub content: String,
    pub source: String,
    pub relevance_score: f64,
}

impl RetrievedDocument {
    pub fn new(content: impl Into<String>, source: impl Into<String>, relevance_score: f64) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            relevance_score,
        }
    }
}

/// Read access to uploaded documents, as consumed by retrieval.
pub trait DocumentSource: Send + Sync {
    /// Every document, newest first.
    fn all_documents(&self) -> Vec<UploadedDocument>;

    /// Documents with a positive lexical score, highest first.
    fn search_documents(&self, query: &str) -> Vec<ScoredDocument>;

    /// The original file of a document, if it is still on disk.
    fn file_for_ai(&self, id: &str) -> Option<FileInput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_prefers_mime_type() {
        assert_eq!(FileType::classify(Some("image/png"), "scan.txt"), FileType::Image);
        assert_eq!(FileType::classify(Some("application/pdf"), "x"), FileType::Pdf);
        assert_eq!(FileType::classify(Some("AUDIO/MPEG"), "x"), FileType::Audio);
    }

    #[test]
    fn test_classify_falls_back_to_extension() {
        assert_eq!(FileType::classify(None, "clip.MKV"), FileType::Video);
        assert_eq!(FileType::classify(None, "report.docx"), FileType::Document);
        assert_eq!(FileType::classify(None, "paper.pdf"), FileType::Pdf);
        assert_eq!(FileType::classify(None, "notes.md"), FileType::Text);
        assert_eq!(FileType::classify(Some("text/plain"), "README"), FileType::Text);
    }

    #[test]
    fn test_retrieved_document_serializes_camel_case() {
        let doc = RetrievedDocument::new("c", "s", 1.5);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["relevanceScore"], 1.5);
    }
}
