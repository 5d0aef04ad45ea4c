use crate::config::AppConfig;
use crate::error::{SyncError, ValidationError};
use crate::store::http_client::HttpClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Outbound mail. The body may carry simple HTML; rendering is up to the
/// receiving side.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SyncError>;
}

fn check_recipient(recipient: &str) -> Result<(), SyncError> {
    if recipient.trim().is_empty() {
        return Err(ValidationError::MissingField("recipient").into());
    }
    if !recipient.contains('@') {
        return Err(ValidationError::Invalid(format!("not an email address: {}", recipient)).into());
    }
    Ok(())
}

// ── Relay ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    action: &'static str,
    recipient: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// Sends mail through the same script endpoint that serves the record store.
pub struct RelayNotifier {
    client: HttpClient,
    endpoint: String,
}

impl RelayNotifier {
    pub fn new(config: &AppConfig, endpoint: &str) -> Result<Self> {
        url::Url::parse(endpoint).with_context(|| format!("Invalid relay url {:?}", endpoint))?;
        Ok(Self {
            client: HttpClient::new(&config.store)?,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for RelayNotifier {
    fn name(&self) -> &'static str {
        "relay"
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SyncError> {
        check_recipient(recipient)?;
        let request = MailRequest {
            action: "sendEmail",
            recipient,
            subject,
            body,
        };
        self.client
            .post_json(&self.endpoint, &request)
            .await
            .context("mail relay")
            .map_err(SyncError::Transport)?;
        info!("Sent {:?} to {}", subject, recipient);
        Ok(())
    }
}

// ── Log only ──────────────────────────────────────────────────────────────────

/// Local mode: nothing leaves the machine, the message is logged instead.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SyncError> {
        check_recipient(recipient)?;
        info!(
            "[local] mail to {} | {} | {} chars",
            recipient,
            subject,
            body.chars().count()
        );
        Ok(())
    }
}

pub fn connect(config: &AppConfig) -> Result<Arc<dyn Notifier>> {
    match config.relay_url() {
        Some(url) => Ok(Arc::new(RelayNotifier::new(config, url)?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}
