//! Bounded LLM categorization loop.
//!
//! One run is a short conversation: the model may call tools to inspect or
//! extend the category store, and must eventually answer with a bare
//! category name. The loop is capped at a fixed number of model calls;
//! running out of budget is a normal outcome, not an error.

use tracing::{debug, info, warn};

use crate::categories::CategoryStore;
use crate::llm::{LlmError, ModelClient};
use crate::parsers::{parse_reply, ModelReply};
use crate::prompts::build_categorization_prompt;
use crate::tools;

/// Maximum number of model calls per categorization run.
pub const MAX_CATEGORIZATION_ROUNDS: usize = 5;

/// Corrective notice appended when the model's answer is not a category.
const INVALID_ANSWER_NOTICE: &str =
    "The response is not a valid category. Please provide ONLY the category name.";

/// One email to categorize. Body is pre-truncated by the caller.
#[derive(Debug, Clone)]
pub struct EmailRecord {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub date: String,
    pub body: String,
}

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Assistant,
    System,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Assistant => "Assistant",
            Self::System => "System",
        }
    }
}

/// One turn of the per-run conversation. Discarded when the run ends.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

/// How a categorization run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategorizationOutcome {
    /// The model answered with a valid category name.
    Decided(String),

    /// The iteration budget ran out without a decision. The caller picks
    /// the fallback.
    Exhausted,
}

/// Run-fatal categorization failure. Aborts this email only.
#[derive(Debug, thiserror::Error)]
pub enum CategorizeError {
    #[error("model call failed: {0}")]
    Model(#[from] LlmError),
}

/// Drives prompt building, model calls, reply parsing and tool dispatch.
pub struct Categorizer<M> {
    model: M,
    store: CategoryStore,
}

impl<M: ModelClient> Categorizer<M> {
    pub fn new(model: M, store: CategoryStore) -> Self {
        Self { model, store }
    }

    /// The category store backing this categorizer.
    pub fn store(&self) -> &CategoryStore {
        &self.store
    }

    /// Categorize one email.
    ///
    /// A terminal answer naming an unknown category registers it with an
    /// empty description before returning. The model's validated answer is
    /// authoritative; no disambiguation round is ever requested.
    pub fn categorize(&mut self, email: &EmailRecord) -> Result<CategorizationOutcome, CategorizeError> {
        let mut history: Vec<ConversationTurn> = Vec::new();
        let mut last_tool_result: Option<String> = None;

        for round in 0..MAX_CATEGORIZATION_ROUNDS {
            let prompt = build_categorization_prompt(
                email,
                &self.store.list(),
                &history,
                last_tool_result.as_deref(),
            );

            let reply = self.model.generate(&prompt)?;
            debug!("Round {}: model replied {:?}", round + 1, reply);

            history.push(ConversationTurn {
                role: Role::Assistant,
                content: reply.clone(),
            });

            match parse_reply(&reply) {
                ModelReply::ToolCall(invocation) => {
                    let result = tools::dispatch(&mut self.store, &invocation);
                    debug!("Tool {} -> {}", invocation.command, result);
                    history.push(ConversationTurn {
                        role: Role::System,
                        content: format!("Tool result: {}", result),
                    });
                    last_tool_result = Some(result);
                }
                ModelReply::Category(category) => {
                    if self.store.info(&category).is_none() {
                        self.store.add(&category, "");
                    }
                    info!("Email {} categorized as '{}'", email.id, category);
                    return Ok(CategorizationOutcome::Decided(category));
                }
                ModelReply::Invalid => {
                    history.push(ConversationTurn {
                        role: Role::System,
                        content: INVALID_ANSWER_NOTICE.to_string(),
                    });
                }
            }
        }

        warn!(
            "Email {}: no category decided within {} rounds",
            email.id, MAX_CATEGORIZATION_ROUNDS
        );
        Ok(CategorizationOutcome::Exhausted)
    }
}
