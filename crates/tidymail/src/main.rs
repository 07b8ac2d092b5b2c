//! Tidymail - sorts a Gmail inbox into labeled categories.
//!
//! One pass per invocation: fetch recent unlabeled mail, categorize each
//! message (LLM loop or keyword rules, per config), apply the labels.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tidymail::{auth, gmail, hardware, organizer};
use tidymail_common::{CategoryStore, Categorizer, Config, OllamaClient, RuleSet};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Tidymail v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::load();
    info!(
        "Settings: max {} emails, body {}, {} chars",
        config.settings.max_emails_to_process,
        if config.settings.check_body { "on" } else { "off" },
        config.settings.body_extract_length
    );

    let authenticator = auth::GmailAuthenticator::new()?;
    let gmail = gmail::GmailClient::new(authenticator.access_token()?)?;

    let (emails, skipped) = organizer::fetch_unlabeled(&gmail, &config.settings)?;
    if skipped > 0 {
        info!("Skipped {} already-labeled emails", skipped);
    }
    if emails.is_empty() {
        info!("No emails to process");
        return Ok(());
    }
    info!("Found {} emails to organize", emails.len());

    if config.llm.enabled {
        if !hardware::confirm_memory_for_model(&config.llm.model, config.llm.min_ram_gb) {
            info!("Run declined due to low memory");
            return Ok(());
        }

        let store = CategoryStore::load(&config.settings.categories_file);
        let model = OllamaClient::new(&config.llm)?;
        let mut categorizer = Categorizer::new(model, store);
        organizer::organize_with_model(&gmail, &mut categorizer, &emails)?;
    } else {
        let rules = RuleSet::new(config.rules.clone());
        info!("Configured rule labels: {}", rules.labels().join(", "));
        organizer::organize_with_rules(&gmail, &rules, &emails)?;
    }

    Ok(())
}
