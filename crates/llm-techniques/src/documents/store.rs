use super::scoring::rank_documents;
use super::{DocumentSource, FileType, ScoredDocument, UploadedDocument, extension};
use crate::error::DocumentError;
use crate::gateway::FileInput;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Content ceiling for plain text uploads, in characters.
pub const MAX_TEXT_CHARS: usize = 50_000;
/// Content ceiling for PDF and word-processor uploads, in characters.
pub const MAX_RICH_CHARS: usize = 500_000;

/// Process-lifetime document store.
///
/// One store-wide lock: searches and listings take a read snapshot, inserts
/// and deletes take the write lock. Callers never hold the lock across an
/// await point because every method is synchronous.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<Vec<UploadedDocument>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<UploadedDocument>> {
        self.documents.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<UploadedDocument>> {
        self.documents.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers an uploaded file.
    ///
    /// Text, markdown and JSON files keep their text. Binary kinds get a
    /// descriptive placeholder and are meant to be read by the model from
    /// `original_path`, which the caller has already written to disk.
    pub fn insert_upload(
        &self,
        filename: &str,
        mime_type: Option<&str>,
        bytes: &[u8],
        original_path: Option<PathBuf>,
    ) -> Result<UploadedDocument, DocumentError> {
        let file_type = FileType::classify(mime_type, filename);
        let content = extract_content(filename, mime_type, file_type, bytes)?;

        let max = match extension(filename).as_str() {
            "pdf" | "doc" | "docx" => MAX_RICH_CHARS,
            _ => MAX_TEXT_CHARS,
        };
        let len = content.chars().count();
        if len > max {
            return Err(DocumentError::TooLarge { len, max });
        }
        if content.trim().is_empty() {
            return Err(DocumentError::Empty);
        }

        let uploaded_at = now_millis();
        let document = UploadedDocument {
            id: format!("{uploaded_at:x}{:08x}", rand::random::<u32>()),
            filename: filename.to_string(),
            content: content.trim().to_string(),
            size: bytes.len(),
            mime_type: mime_type.map(str::to_string),
            file_type,
            uploaded_at,
            original_path,
        };

        info!(
            target: "llm_techniques::documents",
            id = %document.id,
            filename = %document.filename,
            file_type = ?document.file_type,
            chars = len,
            "Document stored"
        );
        self.write().push(document.clone());
        Ok(document)
    }

    /// Convenience for registering plain text without a backing file.
    pub fn insert_text(&self, filename: &str, text: &str) -> Result<UploadedDocument, DocumentError> {
        self.insert_upload(filename, Some("text/plain"), text.as_bytes(), None)
    }

    pub fn get(&self, id: &str) -> Option<UploadedDocument> {
        self.read().iter().find(|doc| doc.id == id).cloned()
    }

    /// Every document, newest first.
    pub fn all(&self) -> Vec<UploadedDocument> {
        let mut documents: Vec<UploadedDocument> = self.read().iter().rev().cloned().collect();
        documents.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        documents
    }

    /// Removes a document, returning whether it existed.
    pub fn delete(&self, id: &str) -> bool {
        let mut documents = self.write();
        let before = documents.len();
        documents.retain(|doc| doc.id != id);
        let removed = documents.len() != before;
        if removed {
            info!(target: "llm_techniques::documents", id, "Document deleted");
        }
        removed
    }

    pub fn search(&self, query: &str) -> Vec<ScoredDocument> {
        let documents = self.read();
        let results = rank_documents(query, documents.iter());
        debug!(
            target: "llm_techniques::documents",
            searched = documents.len(),
            matched = results.len(),
            "Document search"
        );
        results
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl DocumentSource for InMemoryDocumentStore {
    fn all_documents(&self) -> Vec<UploadedDocument> {
        self.all()
    }

    fn search_documents(&self, query: &str) -> Vec<ScoredDocument> {
        self.search(query)
    }

    fn file_for_ai(&self, id: &str) -> Option<FileInput> {
        let document = self.get(id)?;
        let path = document.original_path.filter(|path| path.exists())?;
        let mime_type = document.mime_type.unwrap_or_else(|| {
            mime_guess::from_path(&document.filename)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        });
        Some(FileInput::new(path, mime_type))
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

fn extract_content(
    filename: &str,
    mime_type: Option<&str>,
    file_type: FileType,
    bytes: &[u8],
) -> Result<String, DocumentError> {
    let kind = mime_type.unwrap_or("unknown type");
    let content = match file_type {
        FileType::Text if extension(filename) == "json" => {
            let value: serde_json::Value =
                serde_json::from_slice(bytes).map_err(|err| DocumentError::Unreadable {
                    filename: filename.to_string(),
                    reason: err.to_string(),
                })?;
            match value {
                serde_json::Value::String(text) => text,
                other => serde_json::to_string_pretty(&other).map_err(|err| {
                    DocumentError::Unreadable {
                        filename: filename.to_string(),
                        reason: err.to_string(),
                    }
                })?,
            }
        }
        FileType::Text => String::from_utf8_lossy(bytes).into_owned(),
        FileType::Pdf => format!(
            "[PDF Document: {filename}]\n\nThis PDF file has been uploaded and can be processed by the model directly for content analysis, summarization, and question answering.\n\nFile ready for AI processing."
        ),
        FileType::Document => format!(
            "[Word Document: {filename}]\n\nThis word-processor document has been uploaded and can be processed by the model directly for content analysis and question answering.\n\nFile ready for AI processing."
        ),
        FileType::Image => format!(
            "[Image: {filename}]\n\nThis image file ({kind}) has been uploaded and can be analyzed by the model for visual content analysis, object detection, text extraction (OCR), and image-based question answering.\n\nFile ready for AI vision processing."
        ),
        FileType::Audio => format!(
            "[Audio: {filename}]\n\nThis audio file ({kind}) has been uploaded and can be processed by the model for speech recognition, transcription, and audio-based question answering.\n\nFile ready for AI audio processing."
        ),
        FileType::Video => format!(
            "[Video: {filename}]\n\nThis video file ({kind}) has been uploaded and can be analyzed by the model for video content analysis and video-based question answering.\n\nFile ready for AI video processing."
        ),
    };
    Ok(content)
}
