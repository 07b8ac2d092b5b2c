//! Static keyword-rule categorization - the non-AI strategy.
//!
//! Each rule maps a label to a keyword list; an email matches when any
//! keyword occurs (case-insensitively) in its subject, sender or body.

use std::collections::BTreeMap;

use crate::categorizer::EmailRecord;

/// Ordered rule set. Labels are kept in sorted order so first-match-wins is
/// deterministic across runs.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: BTreeMap<String, Vec<String>>,
}

impl RuleSet {
    pub fn new(rules: BTreeMap<String, Vec<String>>) -> Self {
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Configured labels, in match order.
    pub fn labels(&self) -> Vec<&str> {
        self.rules.keys().map(String::as_str).collect()
    }

    /// First label whose keyword list matches the email, if any.
    pub fn match_email(&self, email: &EmailRecord) -> Option<&str> {
        let content = format!(
            "{} {} {}",
            email.subject.to_lowercase(),
            email.sender.to_lowercase(),
            email.body.to_lowercase()
        );

        for (label, keywords) in &self.rules {
            if keywords.iter().any(|k| content.contains(&k.to_lowercase())) {
                return Some(label);
            }
        }
        None
    }
}
