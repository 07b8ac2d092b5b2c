//! Gmail OAuth credentials.
//!
//! Loads the OAuth client secret and a previously provisioned token, and
//! refreshes the access token when it is about to expire. Missing secret
//! material is process-fatal: without it no mailbox connection can exist.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Environment variable overriding the token directory
pub const TOKEN_DIR_ENV: &str = "TOKEN_DIR";

/// Environment variable overriding the client secret path
pub const CLIENT_SECRET_PATH_ENV: &str = "CLIENT_SECRET_PATH";

const DEFAULT_CLIENT_SECRET_PATH: &str = "google_credentials.json";
const TOKEN_FILE: &str = "token.json";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the recorded expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// OAuth client material from google_credentials.json.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
}

/// google_credentials.json wraps the secret under "installed" (desktop app)
/// or "web".
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

/// Persisted OAuth token (token.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredToken {
    /// Whether the access token is expired or inside the refresh margin.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        (self.expires_at - now).num_seconds() <= EXPIRY_MARGIN_SECS
    }
}

/// Response from the token endpoint.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: i64,
}

/// Manages the stored token for the mailbox connection.
pub struct GmailAuthenticator {
    token_path: PathBuf,
    secret: ClientSecret,
}

impl GmailAuthenticator {
    /// Load the client secret; fails if the secret file is absent or
    /// unreadable.
    pub fn new() -> Result<Self> {
        let secret_path = std::env::var(CLIENT_SECRET_PATH_ENV)
            .unwrap_or_else(|_| DEFAULT_CLIENT_SECRET_PATH.to_string());
        let token_dir = std::env::var(TOKEN_DIR_ENV).unwrap_or_else(|_| ".".to_string());

        let secret = load_client_secret(Path::new(&secret_path))?;

        Ok(Self {
            token_path: Path::new(&token_dir).join(TOKEN_FILE),
            secret,
        })
    }

    /// Return a valid access token, refreshing and persisting it if needed.
    ///
    /// A missing token file is fatal: the initial consent flow must have
    /// been run once to provision token.json.
    pub fn access_token(&self) -> Result<String> {
        let contents = fs::read_to_string(&self.token_path).with_context(|| {
            format!(
                "token file not found: {} - provision it with an OAuth consent flow first",
                self.token_path.display()
            )
        })?;
        let token: StoredToken = serde_json::from_str(&contents)
            .with_context(|| format!("invalid token file: {}", self.token_path.display()))?;

        if !token.needs_refresh(Utc::now()) {
            return Ok(token.access_token);
        }

        info!("Access token expired, refreshing");
        let refreshed = self.refresh(&token)?;
        self.persist(&refreshed)?;
        Ok(refreshed.access_token)
    }

    /// Exchange the refresh token for a fresh access token.
    fn refresh(&self, token: &StoredToken) -> Result<StoredToken> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("cannot build HTTP client")?;

        let params = [
            ("client_id", self.secret.client_id.as_str()),
            ("client_secret", self.secret.client_secret.as_str()),
            ("refresh_token", token.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = client
            .post(TOKEN_ENDPOINT)
            .form(&params)
            .send()
            .context("token refresh request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            bail!("token refresh rejected: HTTP {}: {}", status, body);
        }

        let refreshed: RefreshResponse = response
            .json()
            .context("invalid token refresh response")?;

        Ok(StoredToken {
            access_token: refreshed.access_token,
            refresh_token: token.refresh_token.clone(),
            expires_at: Utc::now() + chrono::Duration::seconds(refreshed.expires_in),
        })
    }

    fn persist(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.token_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(token)?;
        fs::write(&self.token_path, json)
            .with_context(|| format!("cannot write token file: {}", self.token_path.display()))
    }
}

fn load_client_secret(path: &Path) -> Result<ClientSecret> {
    let contents = fs::read_to_string(path).with_context(|| {
        format!("client secret file not found: {}", path.display())
    })?;
    let file: ClientSecretFile = serde_json::from_str(&contents)
        .with_context(|| format!("invalid client secret file: {}", path.display()))?;

    file.installed
        .or(file.web)
        .with_context(|| format!("no 'installed' or 'web' section in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_needs_refresh_when_expired() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let token = StoredToken {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: now - chrono::Duration::seconds(10),
        };
        assert!(token.needs_refresh(now));
    }

    #[test]
    fn test_needs_refresh_inside_margin() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let token = StoredToken {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: now + chrono::Duration::seconds(EXPIRY_MARGIN_SECS - 1),
        };
        assert!(token.needs_refresh(now));
    }

    #[test]
    fn test_fresh_token_is_kept() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let token = StoredToken {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: now + chrono::Duration::hours(1),
        };
        assert!(!token.needs_refresh(now));
    }

    #[test]
    fn test_load_client_secret_installed_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("google_credentials.json");
        fs::write(
            &path,
            r#"{"installed": {"client_id": "id-1", "client_secret": "s-1", "token_uri": "https://oauth2.googleapis.com/token"}}"#,
        )
        .unwrap();

        let secret = load_client_secret(&path).unwrap();
        assert_eq!(secret.client_id, "id-1");
        assert_eq!(secret.client_secret, "s-1");
    }

    #[test]
    fn test_load_client_secret_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_client_secret(&dir.path().join("nope.json")).is_err());
    }

    #[test]
    fn test_stored_token_round_trip() {
        let token = StoredToken {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        };
        let json = serde_json::to_string(&token).unwrap();
        let back: StoredToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back.access_token, "a");
        assert_eq!(back.expires_at, token.expires_at);
    }
}
