//! Best-effort webhook announcements of uploaded artifacts.
//!
//! Announcements run on their own task. Their outcome is logged and never
//! reaches the upload that triggered them.

use crate::error::{ReleaseError, Result};
use serde::Serialize;
use tokio::task::JoinHandle;
use url::Url;

/// Name the announcements are posted under.
pub const BOT_USERNAME: &str = "Edgehill Builds";

/// Slack-compatible webhook payload.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct WebhookMessage {
    /// Poster name
    pub username: String,
    /// Message text
    pub text: String,
}

impl WebhookMessage {
    /// Message announcing an uploaded artifact.
    pub fn asset_uploaded(key: &str, location: &str) -> Self {
        Self {
            username: BOT_USERNAME.to_string(),
            text: format!("N1 release asset uploaded: <{location}|{key}>"),
        }
    }
}

/// Posts announcements to a webhook, or does nothing when none is configured.
#[derive(Clone, Debug)]
pub struct Notifier {
    client: reqwest::Client,
    endpoint: Option<Url>,
}

impl Notifier {
    /// Creates a notifier for `endpoint`; `None` disables it.
    ///
    /// An unparsable URL disables notifications with a warning rather than
    /// failing the publish.
    pub fn new(endpoint: Option<&str>) -> Self {
        let endpoint = endpoint.and_then(|raw| match Url::parse(raw) {
            Ok(url) => Some(url),
            Err(e) => {
                log::warn!("Ignoring invalid webhook URL: {}", e);
                None
            }
        });
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    /// Returns true when a webhook is configured.
    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Posts `message` and waits for the response.
    pub async fn post(&self, message: &WebhookMessage) -> Result<()> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(());
        };
        let response = self
            .client
            .post(endpoint.clone())
            .json(message)
            .send()
            .await
            .map_err(|e| ReleaseError::Notification(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ReleaseError::Notification(format!(
                "webhook responded {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Announces an uploaded artifact on a background task.
    ///
    /// Returns `None` when notifications are disabled. A failure is logged by
    /// the task itself; the handle only reports that it finished.
    pub fn announce(&self, key: &str, location: &str) -> Option<JoinHandle<()>> {
        if !self.is_enabled() {
            return None;
        }
        let notifier = self.clone();
        let message = WebhookMessage::asset_uploaded(key, location);
        Some(tokio::spawn(async move {
            if let Err(e) = notifier.post(&message).await {
                log::warn!("{}", e);
            }
        }))
    }
}
