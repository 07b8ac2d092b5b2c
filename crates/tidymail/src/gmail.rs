//! Gmail REST adapter.
//!
//! Thin blocking wrapper over the Gmail v1 API: message listing and
//! retrieval, label CRUD, and label application. Payload decoding (headers,
//! base64url bodies, truncation) happens here so the categorization core
//! only ever sees plain EmailRecords.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tidymail_common::EmailRecord;

const API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const HTTP_TIMEOUT_SECS: u64 = 30;

/// Labels Gmail manages itself; their presence does not make a message
/// "already organized".
pub const SYSTEM_LABELS: [&str; 13] = [
    "INBOX",
    "SENT",
    "DRAFT",
    "SPAM",
    "TRASH",
    "CATEGORY_PERSONAL",
    "CATEGORY_SOCIAL",
    "CATEGORY_PROMOTIONS",
    "CATEGORY_UPDATES",
    "CATEGORY_FORUMS",
    "STARRED",
    "IMPORTANT",
    "UNREAD",
];

/// A fetched message: decoded record plus its non-system labels.
#[derive(Debug, Clone)]
pub struct FetchedMessage {
    pub record: EmailRecord,
    pub custom_labels: Vec<String>,
}

impl FetchedMessage {
    /// Whether a previous run (or the user) already labeled this message.
    pub fn is_labeled(&self) -> bool {
        !self.custom_labels.is_empty()
    }
}

/// A mailbox label.
#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Message {
    id: String,
    #[serde(default, rename = "labelIds")]
    label_ids: Vec<String>,
    payload: Option<MessagePayload>,
}

#[derive(Debug, Default, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    parts: Vec<MessagePart>,
    body: Option<MessageBody>,
}

#[derive(Debug, Deserialize)]
struct MessagePart {
    #[serde(default, rename = "mimeType")]
    mime_type: String,
    body: Option<MessageBody>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LabelListResponse {
    #[serde(default)]
    labels: Vec<Label>,
}

#[derive(Debug, Serialize)]
struct CreateLabelRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateLabelResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct ModifyMessageRequest<'a> {
    #[serde(rename = "addLabelIds")]
    add_label_ids: &'a [String],
}

/// Blocking Gmail API client.
pub struct GmailClient {
    client: reqwest::blocking::Client,
    access_token: String,
}

impl GmailClient {
    pub fn new(access_token: String) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .context("cannot build HTTP client")?;
        Ok(Self {
            client,
            access_token,
        })
    }

    /// Ids of the most recent messages, newest first.
    pub fn list_messages(&self, max_results: usize) -> Result<Vec<String>> {
        let url = format!("{}/messages?maxResults={}", API_BASE, max_results);
        let response: MessageListResponse = self.get(&url).context("cannot list messages")?;
        Ok(response.messages.into_iter().map(|m| m.id).collect())
    }

    /// Fetch one message and decode it.
    ///
    /// The body is the first text/plain part (or the top-level body),
    /// base64url-decoded and truncated to `body_length` characters;
    /// `include_body = false` skips body decoding entirely.
    pub fn fetch_message(
        &self,
        id: &str,
        include_body: bool,
        body_length: usize,
    ) -> Result<FetchedMessage> {
        let url = format!("{}/messages/{}?format=full", API_BASE, id);
        let message: Message = self
            .get(&url)
            .with_context(|| format!("cannot fetch message {}", id))?;

        let payload = message.payload.unwrap_or_default();
        let subject = header_value(&payload.headers, "Subject").unwrap_or("No subject");
        let sender = header_value(&payload.headers, "From").unwrap_or("Unknown sender");
        let date = header_value(&payload.headers, "Date").unwrap_or("");

        let body = if include_body {
            truncate_chars(&extract_body(&payload), body_length)
        } else {
            String::new()
        };

        Ok(FetchedMessage {
            record: EmailRecord {
                id: message.id,
                subject: subject.to_string(),
                sender: sender.to_string(),
                date: date.to_string(),
                body,
            },
            custom_labels: custom_labels(&message.label_ids),
        })
    }

    /// All labels in the mailbox.
    pub fn list_labels(&self) -> Result<Vec<Label>> {
        let url = format!("{}/labels", API_BASE);
        let response: LabelListResponse = self.get(&url).context("cannot list labels")?;
        Ok(response.labels)
    }

    /// Create a label and return its id.
    pub fn create_label(&self, name: &str) -> Result<String> {
        let url = format!("{}/labels", API_BASE);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&CreateLabelRequest { name })
            .send()
            .with_context(|| format!("cannot create label '{}'", name))?;
        let response = check_status(response)?;
        let created: CreateLabelResponse = response.json().context("invalid label payload")?;
        debug!("Created label '{}' ({})", name, created.id);
        Ok(created.id)
    }

    /// Add labels to a message.
    pub fn modify_message(&self, id: &str, add_label_ids: &[String]) -> Result<()> {
        let url = format!("{}/messages/{}/modify", API_BASE, id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&ModifyMessageRequest { add_label_ids })
            .send()
            .with_context(|| format!("cannot modify message {}", id))?;
        check_status(response)?;
        Ok(())
    }

    fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()?;
        let response = check_status(response)?;
        Ok(response.json()?)
    }
}

fn check_status(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().unwrap_or_default();
        bail!("Gmail API error: HTTP {}: {}", status, body);
    }
    Ok(response)
}

/// First header with the given name, case-sensitively (Gmail normalizes
/// header casing).
fn header_value<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name == name)
        .map(|h| h.value.as_str())
}

/// Body text: first text/plain part, else the top-level body.
fn extract_body(payload: &MessagePayload) -> String {
    for part in &payload.parts {
        if part.mime_type == "text/plain" {
            if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) {
                if let Some(text) = decode_base64url(data) {
                    return text;
                }
            }
        }
    }

    payload
        .body
        .as_ref()
        .and_then(|b| b.data.as_deref())
        .and_then(decode_base64url)
        .unwrap_or_default()
}

/// Decode Gmail's base64url payloads (with or without padding).
fn decode_base64url(data: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Truncate to at most `max_chars` characters, respecting char boundaries.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Label ids minus Gmail's own system labels.
fn custom_labels(label_ids: &[String]) -> Vec<String> {
    label_ids
        .iter()
        .filter(|l| !SYSTEM_LABELS.contains(&l.as_str()))
        .cloned()
        .collect()
}
