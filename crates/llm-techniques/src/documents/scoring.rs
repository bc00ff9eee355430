//! Lexical relevance scoring of uploaded documents against a query.

use super::{ScoredDocument, UploadedDocument};

/// Terms that mark a document as explanatory material.
const RELEVANCE_TERMS: [&str; 9] = [
    "definition",
    "define",
    "meaning",
    "concept",
    "explanation",
    "what is",
    "prompt",
    "engineering",
    "guide",
];

/// Filename terms that suggest AI or ML material in a PDF.
const AI_FILENAME_TERMS: [&str; 8] = [
    "prompt",
    "ai",
    "engineering",
    "rag",
    "llm",
    "nlp",
    "machine",
    "learning",
];

const PHRASE_BONUS: f64 = 10.0;
const WORD_OCCURRENCE: f64 = 3.0;
const FILENAME_WORD: f64 = 5.0;
const PDF_FILENAME_WORD: f64 = 8.0;
const LOOSE_CONTENT: f64 = 2.0;
const LOOSE_FILENAME: f64 = 3.0;
const RELEVANCE_TERM: f64 = 1.0;
const PDF_FILENAME_RELEVANCE_TERM: f64 = 4.0;
const PDF_AI_TERM: f64 = 5.0;

/// True when the characters of `word` occur in order within a single line of `text`.
///
/// This lets acronyms such as `rag` match `retrieval augmented generation`.
fn loose_match(text: &str, word: &str) -> bool {
    text.lines().any(|line| {
        let mut chars = line.chars();
        word.chars().all(|wanted| chars.any(|c| c == wanted))
    })
}

/// Scores one document. Zero means "not relevant".
///
/// Scoring is monotonic in query-word occurrences: another occurrence of a
/// query word in the content never lowers the score.
pub fn score_document(query: &str, document: &UploadedDocument) -> f64 {
    let query = query.trim().to_lowercase();
    let content = document.content.to_lowercase();
    let filename = document.filename.to_lowercase();
    let is_pdf = document.is_pdf();

    let mut score = 0.0;

    if !query.is_empty() && content.contains(&query) {
        score += PHRASE_BONUS;
    }

    for word in query.split_whitespace().filter(|w| w.chars().count() > 1) {
        score += WORD_OCCURRENCE * content.matches(word).count() as f64;

        if filename.contains(word) {
            score += if is_pdf { PDF_FILENAME_WORD } else { FILENAME_WORD };
        }

        if word.chars().count() >= 3 {
            if loose_match(&content, word) {
                score += LOOSE_CONTENT;
            }
            if loose_match(&filename, word) {
                score += LOOSE_FILENAME;
            }
        }
    }

    for term in RELEVANCE_TERMS {
        let in_filename = filename.contains(term);
        if in_filename || content.contains(term) {
            score += if is_pdf && in_filename {
                PDF_FILENAME_RELEVANCE_TERM
            } else {
                RELEVANCE_TERM
            };
        }
    }

    if is_pdf {
        let hits = AI_FILENAME_TERMS
            .iter()
            .filter(|term| filename.contains(*term))
            .count();
        score += PDF_AI_TERM * hits as f64;
    }

    score
}

/// Scores documents in iteration order, drops zero scores and sorts the rest
/// by descending score. Ties keep their iteration order.
pub fn rank_documents<'a, I>(query: &str, documents: I) -> Vec<ScoredDocument>
where
    I: IntoIterator<Item = &'a UploadedDocument>,
{
    let mut ranked: Vec<ScoredDocument> = documents
        .into_iter()
        .filter_map(|document| {
            let relevance_score = score_document(query, document);
            (relevance_score > 0.0).then(|| ScoredDocument {
                document: document.clone(),
                relevance_score,
            })
        })
        .collect();
    ranked.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    ranked
}
