//! Tidymail Common - categorization core shared by the tidymail binary.
//!
//! Owns the category store, the bounded LLM categorization loop with its
//! tool-call protocol, and the static keyword-rule fallback. Mailbox I/O
//! lives in the binary crate.

pub mod categories;
pub mod categorizer;
pub mod config;
pub mod llm;
pub mod parsers;
pub mod prompts;
pub mod rules;
pub mod tools;

pub use categories::{Category, CategoryStore};
pub use categorizer::{
    CategorizationOutcome, CategorizeError, Categorizer, ConversationTurn, EmailRecord, Role,
    MAX_CATEGORIZATION_ROUNDS,
};
pub use config::{Config, Settings};
pub use llm::{LlmConfig, LlmError, ModelClient, OllamaClient, ScriptedModelClient};
pub use rules::RuleSet;
