//! Content helpers for the Commentarium
//!
//! - Slug derivation
//! - Parsing of labelled LLM completions into post fields
//! - Prompt templates for the generation functions

pub mod completion;
pub mod prompts;
pub mod slug;

pub use completion::{parse_completion, ParsedCompletion};
pub use prompts::GenerationKind;
pub use slug::slugify;
