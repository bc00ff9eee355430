//! Prompt builders for every technique family.
//!
//! Builders are pure: they sanitise the free text they embed, render a
//! minijinja template and return the prompt string.

pub mod templates;

use crate::documents::RetrievedDocument;
use crate::error::PromptError;
use crate::params::FewShotExample;
use minijinja::{Environment, context};
use regex::Regex;
use serde::Serialize;

/// Cap for the primary input text.
pub const MAX_INPUT_CHARS: usize = 4000;
/// Caps for embedded few-shot example fields.
pub const MAX_EXAMPLE_TEXT_CHARS: usize = 600;
pub const MAX_EXAMPLE_LABEL_CHARS: usize = 200;
pub const MAX_EXAMPLE_SUMMARY_CHARS: usize = 400;
/// Cap for each retrieved passage embedded in a retrieval prompt.
pub const MAX_PASSAGE_CHARS: usize = 2000;
/// At most this many few-shot examples are rendered.
pub const MAX_EXAMPLES: usize = 3;

pub const DEFAULT_ZERO_SHOT_INSTRUCTION: &str = "Answer the question from users within a single output (could be text, number,...) (no explanation, no bullets, no extra text, no code block)";
pub const DEFAULT_FEW_SHOT_INSTRUCTION: &str = "Perform the task as shown in the examples.";
pub const DEFAULT_COT_INSTRUCTION: &str = "Reason step-by-step, then give a concise final answer.";
pub const DEFAULT_SELF_CONSISTENCY_INSTRUCTION: &str =
    "You are solving this problem using self-consistency.";
pub const DEFAULT_PAL_INSTRUCTION: &str =
    "Write a Rhai function named `solution` that solves the problem and returns the answer.";
pub const DEFAULT_TOOL_SPEC: &str = "search, calculate, lookup, analyze";
pub const DEFAULT_REASONING_STYLE: &str = "analytical";

/// Renders a template string with a serializable context.
pub fn render_prompt<T: Serialize>(template: &str, context: T) -> Result<String, PromptError> {
    let mut env = Environment::new();
    env.add_template("prompt", template)?;
    let tmpl = env.get_template("prompt")?;
    Ok(tmpl.render(context)?)
}

/// Trims, collapses whitespace runs to one space and caps the length in characters.
///
/// Idempotent, and the result never exceeds `max_len` characters.
pub fn sanitize(text: &str, max_len: usize) -> String {
    let trimmed = text.trim();
    let collapsed = match Regex::new(r"\s{2,}") {
        Ok(re) => re.replace_all(trimmed, " ").into_owned(),
        Err(_) => trimmed.to_string(),
    };
    let truncated: String = collapsed.chars().take(max_len).collect();
    truncated.trim_end().to_string()
}

fn instruction_or<'a>(instruction: Option<&'a str>, default: &'a str) -> &'a str {
    instruction.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(default)
}

pub fn zero_shot(
    input: &str,
    instruction: Option<&str>,
    allowed_labels: Option<&[String]>,
) -> Result<String, PromptError> {
    render_prompt(
        templates::ZERO_SHOT,
        context! {
            instruction => instruction_or(instruction, DEFAULT_ZERO_SHOT_INSTRUCTION),
            input => sanitize(input, MAX_INPUT_CHARS),
            labels => allowed_labels,
        },
    )
}

#[derive(Serialize)]
struct ExampleView {
    text: String,
    label: Option<String>,
    summary: Option<String>,
}

impl ExampleView {
    fn from_example(example: &FewShotExample) -> Self {
        let non_empty = |value: &Option<String>, cap: usize| {
            value
                .as_deref()
                .map(|v| sanitize(v, cap))
                .filter(|v| !v.is_empty())
        };
        Self {
            text: sanitize(&example.text, MAX_EXAMPLE_TEXT_CHARS),
            label: non_empty(&example.label, MAX_EXAMPLE_LABEL_CHARS),
            summary: non_empty(&example.summary, MAX_EXAMPLE_SUMMARY_CHARS),
        }
    }
}

/// Few-shot prompt with up to [`MAX_EXAMPLES`] worked examples.
pub fn few_shot(
    input: &str,
    examples: &[FewShotExample],
    instruction: Option<&str>,
    allowed_labels: Option<&[String]>,
) -> Result<String, PromptError> {
    let examples: Vec<ExampleView> = examples
        .iter()
        .take(MAX_EXAMPLES)
        .map(ExampleView::from_example)
        .collect();
    render_prompt(
        templates::FEW_SHOT,
        context! {
            instruction => instruction_or(instruction, DEFAULT_FEW_SHOT_INSTRUCTION),
            examples => examples,
            input => sanitize(input, MAX_INPUT_CHARS),
            labels => allowed_labels,
        },
    )
}

pub fn chain_of_thought(input: &str, instruction: Option<&str>) -> Result<String, PromptError> {
    render_prompt(
        templates::CHAIN_OF_THOUGHT,
        context! {
            instruction => instruction_or(instruction, DEFAULT_COT_INSTRUCTION),
            input => sanitize(input, MAX_INPUT_CHARS),
        },
    )
}

pub fn self_consistency(input: &str, instruction: Option<&str>) -> Result<String, PromptError> {
    render_prompt(
        templates::SELF_CONSISTENCY,
        context! {
            instruction => instruction_or(instruction, DEFAULT_SELF_CONSISTENCY_INSTRUCTION),
            input => sanitize(input, MAX_INPUT_CHARS),
        },
    )
}

/// Program-aided prompt asking for a `solution` function in a `PROGRAM_CODE` section.
pub fn program_aided(input: &str, instruction: Option<&str>) -> Result<String, PromptError> {
    render_prompt(
        templates::PROGRAM_AIDED,
        context! {
            instruction => instruction_or(instruction, DEFAULT_PAL_INSTRUCTION),
            input => sanitize(input, MAX_INPUT_CHARS),
        },
    )
}

pub fn directional_generator(input: &str) -> Result<String, PromptError> {
    render_prompt(
        templates::DIRECTIONAL_GENERATOR,
        context! { input => sanitize(input, MAX_INPUT_CHARS) },
    )
}

/// The stimuli block is embedded as produced by the generator call, line
/// breaks included, and only capped in length.
pub fn directional_solver(input: &str, stimuli: &str) -> Result<String, PromptError> {
    let stimuli: String = stimuli.trim().chars().take(MAX_INPUT_CHARS).collect();
    render_prompt(
        templates::DIRECTIONAL_SOLVER,
        context! {
            input => sanitize(input, MAX_INPUT_CHARS),
            stimuli => stimuli,
        },
    )
}

pub fn react(input: &str, tool_spec: Option<&str>) -> Result<String, PromptError> {
    render_prompt(
        templates::REACT,
        context! {
            input => sanitize(input, MAX_INPUT_CHARS),
            tool_spec => instruction_or(tool_spec, DEFAULT_TOOL_SPEC),
        },
    )
}

pub fn reflexion(input: &str, max_reflections: u32) -> Result<String, PromptError> {
    render_prompt(
        templates::REFLEXION,
        context! {
            input => sanitize(input, MAX_INPUT_CHARS),
            max_reflections => max_reflections,
        },
    )
}

/// Retrieval-augmented prompt embedding the retrieved passages.
pub fn retrieval_augmented(
    input: &str,
    documents: &[RetrievedDocument],
    reasoning_style: Option<&str>,
) -> Result<String, PromptError> {
    let documents: Vec<RetrievedDocument> = documents
        .iter()
        .map(|doc| RetrievedDocument {
            content: sanitize(&doc.content, MAX_PASSAGE_CHARS),
            ..doc.clone()
        })
        .collect();
    render_prompt(
        templates::RETRIEVAL_AUGMENTED,
        context! {
            input => sanitize(input, MAX_INPUT_CHARS),
            documents => documents,
            reasoning_style => instruction_or(reasoning_style, DEFAULT_REASONING_STYLE),
        },
    )
}

/// Note appended to a retrieval prompt naming files attached for direct analysis.
pub fn attached_files_note(filenames: &[String]) -> Result<String, PromptError> {
    render_prompt(templates::ATTACHED_FILES_NOTE, context! { files => filenames })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_collapses_and_caps() {
        assert_eq!(sanitize("  hello    world \n\n again ", 4000), "hello world again");
        assert_eq!(sanitize("abcdef", 3), "abc");
        assert_eq!(sanitize("ab   cd", 3), "ab");
    }

    #[test]
    fn test_sanitize_is_idempotent_and_bounded() {
        let inputs = [
            "",
            "   ",
            "  lots   of\t\tspace  ",
            "line one\nline two",
            "ünïcödé   text that is longer than the cap",
            "x \n y",
        ];
        for input in inputs {
            for cap in [0, 1, 5, 12, 4000] {
                let once = sanitize(input, cap);
                assert_eq!(sanitize(&once, cap), once, "input {input:?} cap {cap}");
                assert!(once.chars().count() <= cap);
            }
        }
    }

    #[test]
    fn test_zero_shot_with_labels() {
        let labels = vec!["Positive".to_string(), "Negative".to_string()];
        let prompt = zero_shot("I love   this product!", None, Some(&labels)).unwrap();
        assert!(prompt.starts_with(DEFAULT_ZERO_SHOT_INSTRUCTION));
        assert!(prompt.contains("\"I love this product!\""));
        assert!(prompt.contains(
            "Return EXACTLY one of the following labels (case sensitive as written): Positive, Negative."
        ));
    }

    #[test]
    fn test_zero_shot_without_labels() {
        let prompt = zero_shot("2 + 2", Some("  Compute.  "), None).unwrap();
        assert!(prompt.starts_with("Compute."));
        assert!(prompt.contains("Return ONLY the final answer."));
    }

    #[test]
    fn test_few_shot_renders_at_most_three_examples() {
        let examples = vec![
            FewShotExample::labelled("Great!", "Positive"),
            FewShotExample::summarised("A long article", "Short"),
            FewShotExample {
                text: "Bare".to_string(),
                ..Default::default()
            },
            FewShotExample::labelled("Ignored", "Negative"),
        ];
        let prompt = few_shot("Meh.", &examples, None, None).unwrap();
        assert!(prompt.contains("Text: \"Great!\"\nAnswer: Positive\n--"));
        assert!(prompt.contains("Summary:\nShort\n--"));
        assert!(prompt.contains("Text: \"Bare\"\nOutput:\n\n--"));
        assert!(!prompt.contains("Ignored"));
        assert!(prompt.contains("\"Meh.\""));
    }

    #[test]
    fn test_few_shot_caps_example_fields() {
        let long = "x".repeat(1000);
        let examples = vec![FewShotExample::labelled(long.clone(), long)];
        let prompt = few_shot("in", &examples, None, None).unwrap();
        assert!(prompt.contains(&format!("\"{}\"", "x".repeat(MAX_EXAMPLE_TEXT_CHARS))));
        assert!(!prompt.contains(&"x".repeat(MAX_EXAMPLE_TEXT_CHARS + 1)));
    }

    #[test]
    fn test_structured_prompts_name_their_sections() {
        assert!(chain_of_thought("q", None).unwrap().contains("FINAL_ANSWER:"));
        assert!(self_consistency("q", None).unwrap().contains("Reasoning Paths:"));
        let pal = program_aided("What is 7 * 6?", None).unwrap();
        assert!(pal.contains("PROGRAM_CODE:"));
        assert!(pal.contains("fn solution()"));
        assert!(reflexion("q", 2).unwrap().contains("at most 2 reflection cycles"));
    }

    #[test]
    fn test_react_embeds_tool_spec() {
        let prompt = react("Who?", None).unwrap();
        assert!(prompt.contains("Available tools: search, calculate, lookup, analyze"));
        assert!(prompt.ends_with("Thought:"));

        let prompt = react("Who?", Some("wiki")).unwrap();
        assert!(prompt.contains("Available tools: wiki"));
    }

    #[test]
    fn test_directional_solver_keeps_stimuli_lines() {
        let prompt = directional_solver("q", "- hint one\n- hint two").unwrap();
        assert!(prompt.contains("Directional Stimuli:\n- hint one\n- hint two"));
    }

    #[test]
    fn test_retrieval_prompt_lists_documents() {
        let docs = vec![RetrievedDocument::new("Solar power is clean.", "Energy Guide", 2.0)];
        let prompt = retrieval_augmented("What is solar?", &docs, None).unwrap();
        assert!(prompt.contains("[Document 1] Source: Energy Guide"));
        assert!(prompt.contains("Solar power is clean."));
        assert!(prompt.contains("Reasoning style: analytical."));
    }

    #[test]
    fn test_attached_files_note() {
        let note = attached_files_note(&["chart.png".to_string(), "report.pdf".to_string()]).unwrap();
        assert!(note.starts_with("\n\nAdditionally"));
        assert!(note.contains("Files included: chart.png, report.pdf"));
    }
}
