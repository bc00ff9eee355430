//! `Label: value` extraction for the less structured technique outputs.

use log::debug;
use regex::Regex;

/// Extracts the value after `label:` up to the first line opening with one
/// of `stops` (each written with its trailing colon), or the end of text.
///
/// Matching is case-insensitive. An empty value is reported as absent.
pub fn labeled_field(text: &str, label: &str, stops: &[&str]) -> Option<String> {
    let label_re = Regex::new(&format!(r"(?i)\b{}:", regex::escape(label))).ok()?;
    let Some(found) = label_re.find(text) else {
        debug!("Field {} not found", label);
        return None;
    };
    let rest = &text[found.end()..];
    let end = stop_offset(rest, stops).unwrap_or(rest.len());

    let value = rest[..end].trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Byte offset of the earliest `\n<stop>` in `text`.
pub fn stop_offset(text: &str, stops: &[&str]) -> Option<usize> {
    if stops.is_empty() {
        return None;
    }
    let alternatives: Vec<String> = stops.iter().map(|s| regex::escape(s)).collect();
    let pattern = format!(r"(?i)\n(?:{})", alternatives.join("|"));
    Regex::new(&pattern).ok()?.find(text).map(|m| m.start())
}

/// The last non-empty paragraph, where paragraphs are separated by blank lines.
pub fn last_paragraph(text: &str) -> Option<String> {
    let splitter = Regex::new(r"\n\s*\n").ok()?;
    splitter
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .last()
        .map(str::to_string)
}

/// Splits a numbered list (`1. ...\n2. ...`) into its items.
///
/// The first item keeps any leading number marker it has, since only markers
/// that follow a newline are split on. Returns the whole block as the single
/// item when no split produces a non-empty piece.
pub fn split_numbered(block: &str) -> Vec<String> {
    let items: Vec<String> = Regex::new(r"\n\d+\.\s+")
        .map(|re| {
            re.split(block)
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if items.is_empty() {
        vec![block.trim().to_string()]
    } else {
        items
    }
}

/// Pulls the body out of a fenced code block, or strips stray fence markers.
pub fn strip_code_fence(code: &str) -> String {
    if let Ok(fenced) = Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*?)```")
        && let Some(captures) = fenced.captures(code)
        && let Some(body) = captures.get(1)
    {
        return body.as_str().trim().to_string();
    }

    let mut stripped = code.to_string();
    if let Ok(marker) = Regex::new(r"```[A-Za-z0-9_+-]*") {
        stripped = marker.replace_all(&stripped, "").into_owned();
    }
    stripped.trim().to_string()
}
