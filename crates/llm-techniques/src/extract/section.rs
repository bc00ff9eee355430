use log::debug;
use regex::Regex;

/// Section headers that close a structured reflexion-style block.
const KNOWN_TERMINATORS: &str = r"(?i)\n[ \t]*(?:\*\*)?(?:INITIAL_ATTEMPT|REFLECTION_\d+|REVISED_SOLUTION_\d+|FINAL_ANSWER)(?:\*\*)?:";

/// Any upper-case label at the start of a line.
const GENERIC_TERMINATOR: &str = r"\n[ \t]*(?:\*\*)?[A-Z][A-Z0-9_]+(?:\*\*)?:";

/// How a section header is located and where its body stops.
///
/// The strategies are tried in [`SECTION_STRATEGIES`] order and the first
/// non-empty body wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionStrategy {
    /// Header at the start of a line, body runs to the next known section
    /// header or the end of text.
    KnownHeaders,
    /// Header anywhere on a word boundary, body runs to the next line that
    /// opens with any upper-case label or the end of text.
    AnyUpperCaseLabel,
}

pub const SECTION_STRATEGIES: [SectionStrategy; 2] =
    [SectionStrategy::KnownHeaders, SectionStrategy::AnyUpperCaseLabel];

impl SectionStrategy {
    fn header_pattern(self, header: &str) -> String {
        let header = regex::escape(header);
        match self {
            Self::KnownHeaders => {
                format!(r"(?im)^[ \t]*(?:\*\*)?{header}(?:\*\*)?:[ \t]*(?:\*\*)?")
            }
            Self::AnyUpperCaseLabel => format!(r"(?i)\b{header}:"),
        }
    }

    fn terminator_pattern(self) -> &'static str {
        match self {
            Self::KnownHeaders => KNOWN_TERMINATORS,
            Self::AnyUpperCaseLabel => GENERIC_TERMINATOR,
        }
    }

    /// Applies this strategy, returning the trimmed body if it is non-empty.
    pub fn extract(self, text: &str, header: &str) -> Option<String> {
        let header_re = Regex::new(&self.header_pattern(header)).ok()?;
        let start = header_re.find(text)?.end();
        let rest = &text[start..];

        let end = Regex::new(self.terminator_pattern())
            .ok()
            .and_then(|re| re.find(rest))
            .map(|m| m.start())
            .unwrap_or(rest.len());

        clean_body(&rest[..end])
    }
}

fn clean_body(body: &str) -> Option<String> {
    let body = body.trim();
    let body = body.strip_prefix("**").unwrap_or(body).trim();
    (!body.is_empty()).then(|| body.to_string())
}

/// Extracts the body of an upper-case labelled section such as `FINAL_ANSWER:`.
///
/// Returns `None` when the header is missing or its body is empty; callers
/// treat that as a cue to try their next fallback, never as an error.
pub fn parse_section(text: &str, header: &str) -> Option<String> {
    if text.is_empty() || header.is_empty() {
        return None;
    }
    let found = SECTION_STRATEGIES
        .iter()
        .find_map(|strategy| strategy.extract(text, header));
    if found.is_none() {
        debug!("Section {} not found in model output", header);
    }
    found
}

/// Returns the first header from `headers` that has a section, with its body.
pub fn parse_first_section<'h>(text: &str, headers: &[&'h str]) -> Option<(&'h str, String)> {
    headers
        .iter()
        .find_map(|header| parse_section(text, header).map(|body| (*header, body)))
}
