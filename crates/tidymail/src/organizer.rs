//! Mailbox processing loop.
//!
//! Fetches unorganized messages, runs the selected categorization strategy
//! sequentially over them, and applies the resulting labels. Per-email
//! failures are logged and the run continues; already-applied labels are
//! never rolled back.

use std::collections::HashMap;

use anyhow::Result;
use tracing::{error, info};

use tidymail_common::categorizer::{CategorizationOutcome, Categorizer, EmailRecord};
use tidymail_common::config::Settings;
use tidymail_common::llm::ModelClient;
use tidymail_common::rules::RuleSet;

use crate::gmail::GmailClient;
use crate::progress::EmailProgress;

/// Label applied when a run ends without a decision.
pub const FALLBACK_CATEGORY: &str = "Other";

/// Outcome counters for one mailbox run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunStats {
    /// Emails put through a strategy
    pub processed: usize,
    /// Emails that received a label
    pub categorized: usize,
    /// Labeled with the fallback category (subset of `categorized`)
    pub fallback: usize,
    /// Left unlabeled (no rule matched)
    pub unmatched: usize,
    /// Label application failed
    pub failed: usize,
}

impl RunStats {
    /// Share of processed emails that ended up labeled, in percent.
    pub fn success_rate(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.categorized as f64 / self.processed as f64 * 100.0
        }
    }
}

/// Fetch the most recent messages, dropping ones that already carry a
/// custom label. Returns the records plus the skipped count.
pub fn fetch_unlabeled(
    gmail: &GmailClient,
    settings: &Settings,
) -> Result<(Vec<EmailRecord>, usize)> {
    let ids = gmail.list_messages(settings.max_emails_to_process)?;
    info!("Fetching details of {} emails", ids.len());

    let mut records = Vec::new();
    let mut skipped = 0;

    for id in &ids {
        let fetched = match gmail.fetch_message(id, settings.check_body, settings.body_extract_length)
        {
            Ok(fetched) => fetched,
            Err(e) => {
                error!("Skipping message {}: {}", id, e);
                continue;
            }
        };

        if fetched.is_labeled() {
            info!("Email {} already labeled, skipping", id);
            skipped += 1;
            continue;
        }

        records.push(fetched.record);
    }

    Ok((records, skipped))
}

/// Categorize with the LLM loop and label each email. Run-fatal
/// categorization failures fall back to the catch-all label.
pub fn organize_with_model<M: ModelClient>(
    gmail: &GmailClient,
    categorizer: &mut Categorizer<M>,
    emails: &[EmailRecord],
) -> Result<RunStats> {
    let mut labels = LabelCache::load(gmail)?;
    let mut stats = RunStats::default();
    let progress = EmailProgress::new(emails.len() as u64);

    for email in emails {
        stats.processed += 1;

        let (category, decided) = match categorizer.categorize(email) {
            Ok(CategorizationOutcome::Decided(category)) => (category, true),
            Ok(CategorizationOutcome::Exhausted) => {
                info!("Email {}: budget exhausted, using fallback", email.id);
                (FALLBACK_CATEGORY.to_string(), false)
            }
            Err(e) => {
                error!("Email {}: categorization failed: {}", email.id, e);
                (FALLBACK_CATEGORY.to_string(), false)
            }
        };

        match apply_label(gmail, &mut labels, &email.id, &category) {
            Ok(()) => {
                stats.categorized += 1;
                if !decided {
                    stats.fallback += 1;
                }
                progress.set_status(&format!("Categorized: {}", category));
            }
            Err(e) => {
                stats.failed += 1;
                error!("Email {}: cannot apply label '{}': {}", email.id, category, e);
                progress.set_status("Label failed");
            }
        }
        progress.inc();
    }

    progress.finish();
    log_stats(&stats);
    Ok(stats)
}

/// Categorize with keyword rules. Unmatched emails are left untouched.
pub fn organize_with_rules(
    gmail: &GmailClient,
    rules: &RuleSet,
    emails: &[EmailRecord],
) -> Result<RunStats> {
    if rules.is_empty() {
        info!("No rules configured, nothing to organize");
        return Ok(RunStats::default());
    }

    let mut labels = LabelCache::load(gmail)?;
    let mut stats = RunStats::default();
    let progress = EmailProgress::new(emails.len() as u64);

    for email in emails {
        stats.processed += 1;

        match rules.match_email(email) {
            Some(label) => match apply_label(gmail, &mut labels, &email.id, label) {
                Ok(()) => {
                    stats.categorized += 1;
                    info!("Email '{}' organized under '{}'", email.subject, label);
                    progress.set_status(&format!("Categorized: {}", label));
                }
                Err(e) => {
                    stats.failed += 1;
                    error!("Email {}: cannot apply label '{}': {}", email.id, label, e);
                    progress.set_status("Label failed");
                }
            },
            None => {
                stats.unmatched += 1;
                progress.set_status("No rule matched");
            }
        }
        progress.inc();
    }

    progress.finish();
    log_stats(&stats);
    Ok(stats)
}

fn log_stats(stats: &RunStats) {
    info!("Processing complete");
    info!("Emails labeled: {}/{}", stats.categorized, stats.processed);
    if stats.fallback > 0 {
        info!("Fallback '{}' applied: {}", FALLBACK_CATEGORY, stats.fallback);
    }
    if stats.unmatched > 0 {
        info!("No rule matched: {}", stats.unmatched);
    }
    if stats.failed > 0 {
        info!("Label failures: {}", stats.failed);
    }
    info!("Success rate: {:.1}%", stats.success_rate());
}

/// Mailbox label name -> id map, fetched once per run and extended as new
/// labels are created.
struct LabelCache {
    ids: HashMap<String, String>,
}

impl LabelCache {
    fn load(gmail: &GmailClient) -> Result<Self> {
        let ids = gmail
            .list_labels()?
            .into_iter()
            .map(|l| (l.name, l.id))
            .collect();
        Ok(Self { ids })
    }

    /// Label id for `name`, creating the label on first use.
    fn id_for(&mut self, gmail: &GmailClient, name: &str) -> Result<String> {
        if let Some(id) = self.ids.get(name) {
            return Ok(id.clone());
        }
        let id = gmail.create_label(name)?;
        self.ids.insert(name.to_string(), id.clone());
        Ok(id)
    }
}

fn apply_label(
    gmail: &GmailClient,
    labels: &mut LabelCache,
    email_id: &str,
    name: &str,
) -> Result<()> {
    let label_id = labels.id_for(gmail, name)?;
    gmail.modify_message(email_id, &[label_id])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let stats = RunStats {
            processed: 4,
            categorized: 3,
            ..Default::default()
        };
        assert!((stats.success_rate() - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_success_rate_empty_run_is_zero() {
        assert_eq!(RunStats::default().success_rate(), 0.0);
    }
}
