//! Normalisation of single-answer model output into a label.

use log::debug;
use regex::Regex;

/// Returned when no label can be recovered.
pub const UNKNOWN_LABEL: &str = "Unknown";

const SENTIMENT_WORDS: [&str; 3] = ["positive", "neutral", "negative"];

/// Finds the first allowed label that occurs as a whole word (case-insensitive)
/// and returns it in the caller's spelling.
pub fn match_allowed_label(text: &str, allowed: &[String]) -> Option<String> {
    if allowed.is_empty() {
        return None;
    }
    let alternatives: Vec<String> = allowed.iter().map(|l| regex::escape(l)).collect();
    let re = Regex::new(&format!(r"(?i)\b({})\b", alternatives.join("|"))).ok()?;
    let matched = re.captures(text)?.get(1)?.as_str();

    let canonical = allowed
        .iter()
        .find(|label| label.to_lowercase() == matched.to_lowercase())
        .cloned()
        .unwrap_or_else(|| matched.to_string());
    Some(canonical)
}

fn replace_all(text: &str, pattern: &str, with: &str) -> String {
    match Regex::new(pattern) {
        Ok(re) => re.replace_all(text, with).into_owned(),
        Err(_) => text.to_string(),
    }
}

fn last_line(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .unwrap_or(text)
}

fn letters_digits_spaces(text: &str) -> String {
    replace_all(text, r"[^\p{L}\p{N}\s]", "").trim().to_string()
}

/// Capital first letter, lower-case tail.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Reduces zero-shot output to one label.
///
/// Bullets, quotes and backticks are stripped first. An allowed label wins
/// when one occurs; otherwise the last non-empty line is reduced to a single
/// word, preferring a sentiment word, and normalised to a capitalised form.
pub fn zero_shot_label(raw: &str, allowed: Option<&[String]>) -> String {
    let cleaned = replace_all(raw.trim(), r"^[*\-•]\s*", "");
    let cleaned = replace_all(&cleaned, r"[*\-•]", "");
    let cleaned = replace_all(&cleaned, r#"[`"']"#, "");
    let cleaned = cleaned.trim();

    if let Some(label) = allowed.and_then(|labels| match_allowed_label(cleaned, labels)) {
        return label;
    }

    let candidate = letters_digits_spaces(last_line(cleaned));
    let words: Vec<&str> = candidate.split_whitespace().collect();
    let word = match words.as_slice() {
        [] => None,
        [only] => Some(*only),
        many => many
            .iter()
            .find(|w| SENTIMENT_WORDS.contains(&w.to_lowercase().as_str()))
            .or_else(|| many.last())
            .copied(),
    };

    match word {
        Some(word) => capitalize(word),
        None => {
            debug!("No label recovered from zero-shot output");
            UNKNOWN_LABEL.to_string()
        }
    }
}

/// Reduces few-shot output to its final answer.
///
/// Like [`zero_shot_label`] but multi-word answers are kept whole and no
/// case normalisation is applied.
pub fn few_shot_answer(raw: &str, allowed: Option<&[String]>) -> String {
    let cleaned = replace_all(raw.trim(), r"(?m)^[ \t]*[*\-•]\s*", "");
    let cleaned = replace_all(&cleaned, r#"[`"']"#, "");
    let cleaned = cleaned.trim();

    if let Some(label) = allowed.and_then(|labels| match_allowed_label(cleaned, labels)) {
        return label;
    }

    let candidate = letters_digits_spaces(last_line(cleaned));
    if candidate.is_empty() {
        debug!("No answer recovered from few-shot output");
        UNKNOWN_LABEL.to_string()
    } else {
        candidate
    }
}
