//! The general-knowledge side of retrieval.

use super::RetrievedDocument;

/// Score given to general passages returned when nothing matched.
pub const FALLBACK_SCORE: f64 = 0.1;
const TOPIC_HIT: f64 = 1.0;
const OPENING_HIT: f64 = 0.5;
/// Number of leading query characters looked up in a passage body.
const OPENING_CHARS: usize = 10;

/// A topic-tagged passage.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgePassage {
    pub content: String,
    pub source: String,
    pub topics: Vec<String>,
}

impl KnowledgePassage {
    pub fn new(content: &str, source: &str, topics: &[&str]) -> Self {
        Self {
            content: content.to_string(),
            source: source.to_string(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// One point per topic tag found in the lower-cased query, plus half a
    /// point when the query's first ten characters occur in the body.
    pub fn score(&self, query: &str) -> f64 {
        let query = query.to_lowercase();
        let topic_hits = self
            .topics
            .iter()
            .filter(|topic| query.contains(&topic.to_lowercase()))
            .count();

        let opening: String = query.chars().take(OPENING_CHARS).collect();
        let opening_hit = if !opening.trim().is_empty() && self.content.to_lowercase().contains(&opening) {
            OPENING_HIT
        } else {
            0.0
        };

        TOPIC_HIT * topic_hits as f64 + opening_hit
    }
}

/// A source of general passages for retrieval, searched alongside uploads.
///
/// The default implementation is a fixed in-process table. A real search
/// back end can be plugged in through this trait.
pub trait KnowledgeSource: Send + Sync {
    /// Passages with a positive score for `query`, in source order.
    fn search(&self, query: &str) -> Vec<RetrievedDocument>;

    /// Up to `limit` general passages for when no source matched.
    fn general(&self, limit: usize) -> Vec<RetrievedDocument>;
}

/// Fixed knowledge base of topic-tagged encyclopedia-style passages.
#[derive(Debug, Clone)]
pub struct StaticKnowledgeBase {
    passages: Vec<KnowledgePassage>,
}

impl StaticKnowledgeBase {
    pub fn new(passages: Vec<KnowledgePassage>) -> Self {
        Self { passages }
    }

    pub fn passages(&self) -> &[KnowledgePassage] {
        &self.passages
    }
}

impl Default for StaticKnowledgeBase {
    fn default() -> Self {
        Self::new(vec![
            KnowledgePassage::new(
                "Artificial Intelligence (AI) is the simulation of human intelligence in machines that are programmed to think and learn like humans. AI systems can perform tasks that typically require human intelligence, such as visual perception, speech recognition, decision-making, and language translation.",
                "AI Fundamentals Encyclopedia",
                &["artificial intelligence", "AI", "machine learning", "technology", "automation"],
            ),
            KnowledgePassage::new(
                "Climate change refers to long-term shifts and alterations in global or regional climate patterns. Since the mid-20th century, climate change has been largely attributed to increased levels of atmospheric carbon dioxide produced by the use of fossil fuels.",
                "Environmental Science Handbook",
                &["climate change", "environment", "global warming", "carbon dioxide", "fossil fuels"],
            ),
            KnowledgePassage::new(
                "Renewable energy comes from natural sources that are constantly replenished, such as sunlight, wind, rain, tides, waves, and geothermal heat. These energy sources are sustainable and have a much lower environmental impact compared to fossil fuels.",
                "Renewable Energy Guide",
                &["renewable energy", "solar", "wind", "environment", "sustainability", "green energy"],
            ),
            KnowledgePassage::new(
                "Machine learning is a subset of artificial intelligence that enables computers to learn and improve from experience without being explicitly programmed. It focuses on developing algorithms that can access data and use it to learn for themselves.",
                "Machine Learning Textbook",
                &["machine learning", "AI", "algorithms", "data science", "programming"],
            ),
            KnowledgePassage::new(
                "Quantum computing uses quantum-mechanical phenomena, such as superposition and entanglement, to perform operations on data. Quantum computers have the potential to solve certain computational problems much faster than classical computers.",
                "Quantum Physics Journal",
                &["quantum computing", "quantum mechanics", "superposition", "technology", "computing"],
            ),
            KnowledgePassage::new(
                "Sustainable transportation includes walking, cycling, public transit, electric vehicles, and other low-carbon modes of transport. These alternatives help reduce greenhouse gas emissions and air pollution while promoting healthier communities.",
                "Urban Planning Manual",
                &["transportation", "sustainability", "electric vehicles", "public transit", "environment"],
            ),
            KnowledgePassage::new(
                "Data science combines domain expertise, programming skills, and knowledge of mathematics and statistics to extract meaningful insights from data. It uses techniques from statistics, machine learning, and computer science.",
                "Data Science Fundamentals",
                &["data science", "statistics", "programming", "analysis", "big data"],
            ),
        ])
    }
}

impl KnowledgeSource for StaticKnowledgeBase {
    fn search(&self, query: &str) -> Vec<RetrievedDocument> {
        self.passages
            .iter()
            .filter_map(|passage| {
                let score = passage.score(query);
                (score > 0.0).then(|| {
                    RetrievedDocument::new(passage.content.clone(), passage.source.clone(), score)
                })
            })
            .collect()
    }

    fn general(&self, limit: usize) -> Vec<RetrievedDocument> {
        self.passages
            .iter()
            .take(limit)
            .map(|passage| {
                RetrievedDocument::new(passage.content.clone(), passage.source.clone(), FALLBACK_SCORE)
            })
            .collect()
    }
}
