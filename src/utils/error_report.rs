//! Posts unexpected command errors to a webhook, one at a time.

use serde_json::json;
use serenity::all::{Http, WebhookId};
use serenity::utils::parse_webhook;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error};
use url::Url;

/// Pause between two webhook posts.
pub const REPORT_INTERVAL: Duration = Duration::from_secs(15);
/// Webhook message content is capped by Discord.
const CONTENT_LIMIT: usize = 2000;

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    pub command: String,
    pub guild: Option<String>,
    pub author: String,
    pub error: String,
}

impl ErrorReport {
    pub fn render(&self) -> String {
        let text = format!(
            "**Command:** `{}`\n**Server:** {}\n**Author:** {}\n```\n{}\n```",
            self.command,
            self.guild.as_deref().unwrap_or("DM"),
            self.author,
            self.error
        );
        if text.chars().count() <= CONTENT_LIMIT {
            return text;
        }
        // keep the closing fence
        let mut cut: String = text.chars().take(CONTENT_LIMIT - 5).collect();
        cut.push_str("\n```");
        cut
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ReportError {
    #[error("Invalid error report webhook address: {0}")]
    Url(#[from] url::ParseError),

    #[error("{0} is not a Discord webhook")]
    NotAWebhook(String),
}

/// Id and token of a `https://discord.com/api/webhooks/{id}/{token}` address.
pub fn parse_webhook_url(raw: &str) -> Result<(WebhookId, String), ReportError> {
    let url = Url::parse(raw)?;
    parse_webhook(&url)
        .map(|(id, token)| (id, token.to_string()))
        .ok_or_else(|| ReportError::NotAWebhook(raw.to_string()))
}

/// Handle to the background reporting task.
#[derive(Clone)]
pub struct ErrorReporter {
    tx: mpsc::UnboundedSender<ErrorReport>,
}

impl ErrorReporter {
    /// Starts the task posting reports to `webhook_url` through `http`.
    pub fn spawn(http: Arc<Http>, webhook_url: &str, interval: Duration) -> Result<Self, ReportError> {
        let (webhook_id, token) = parse_webhook_url(webhook_url)?;
        let (tx, mut rx) = mpsc::unbounded_channel::<ErrorReport>();

        tokio::spawn(async move {
            while let Some(report) = rx.recv().await {
                let body = json!({ "content": report.render() });
                match http
                    .execute_webhook(webhook_id, None, &token, false, vec![], &body)
                    .await
                {
                    Ok(_) => debug!("Reported error of command {}", report.command),
                    Err(e) => error!("Failed to send error report: {}", e),
                }
                tokio::time::sleep(interval).await;
            }
        });

        Ok(Self { tx })
    }

    pub fn report(&self, report: ErrorReport) {
        if self.tx.send(report).is_err() {
            error!("Error report task is gone");
        }
    }
}
