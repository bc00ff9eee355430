//! Extraction of typed fields from free-form model output.
//!
//! Every extractor returns `Option` and composes left to right: the first
//! strategy that yields a non-empty value wins and each technique ends its
//! chain with a sentinel answer. Nothing in this module fails.
//!
//! ```rust
//! use llm_techniques::extract::parse_section;
//!
//! let text = "REASONING:\n2 + 2 = 4\nFINAL_ANSWER: 4";
//! assert_eq!(parse_section(text, "REASONING").as_deref(), Some("2 + 2 = 4"));
//! assert_eq!(parse_section(text, "FINAL_ANSWER").as_deref(), Some("4"));
//! ```

pub mod fields;
pub mod labels;
pub mod section;

pub use fields::{labeled_field, last_paragraph, split_numbered, stop_offset, strip_code_fence};
pub use labels::{UNKNOWN_LABEL, few_shot_answer, match_allowed_label, zero_shot_label};
pub use section::{SECTION_STRATEGIES, SectionStrategy, parse_first_section, parse_section};
