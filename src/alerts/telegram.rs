//! Telegram Bot API notifier.
//!
//! Sends one `sendMessage` per cycle. The bot token is held as a secret
//! and never appears in logs or error messages.

use anyhow::{Context, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{NotifyOutcome, ScanSummary};
use crate::config::AlertsConfig;

const USER_AGENT: &str = "TICKWATCH/0.1.0 (notifier)";

struct Credentials {
    token: SecretString,
    chat_id: String,
}

pub struct TelegramNotifier {
    http: Client,
    api_base: String,
    credentials: Option<Credentials>,
}

impl TelegramNotifier {
    /// Resolve the credential variables named in `cfg` through `lookup`.
    /// Either one missing or empty disables sending.
    pub fn from_config<F>(cfg: &AlertsConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client for Telegram")?;

        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let credentials = match (
            non_empty(&cfg.telegram_bot_token_env),
            non_empty(&cfg.telegram_chat_id_env),
        ) {
            (Some(token), Some(chat_id)) => Some(Credentials {
                token: SecretString::new(token),
                chat_id,
            }),
            _ => {
                info!("Telegram credentials not set, notifications disabled");
                None
            }
        };

        Ok(Self {
            http,
            api_base: cfg.telegram_api_base.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Send the summary. Never fails; the outcome says what happened.
    pub async fn notify(&self, summary: &ScanSummary) -> NotifyOutcome {
        let Some(creds) = &self.credentials else {
            return NotifyOutcome::Skipped;
        };
        match self.send(creds, &summary.message()).await {
            Ok(()) => {
                debug!("Telegram summary sent");
                NotifyOutcome::Sent
            }
            Err(e) => {
                warn!(error = %e, "Telegram notification failed");
                NotifyOutcome::Failed
            }
        }
    }

    async fn send(&self, creds: &Credentials, text: &str) -> Result<()> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_base,
            creds.token.expose_secret()
        );
        let resp = self
            .http
            .post(&url)
            .form(&[("chat_id", creds.chat_id.as_str()), ("text", text)])
            .send()
            .await
            // reqwest errors embed the URL, which carries the token.
            .map_err(|e| anyhow::anyhow!("Telegram request failed: {}", e.without_url()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Telegram API error {status}: {body}");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
