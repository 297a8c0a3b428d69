//! # Notification Sink
//!
//! Best-effort outbound messages for application events. Delivery runs in a
//! background task after the triggering state change has been committed; a
//! failed delivery is logged and counted, never surfaced to the caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, warn};
use url::Url;

use crate::config::MailConfig;

pub const APPLICATION_SUBMITTED_SUBJECT: &str = "Your application was sent successfully.";
pub const STATUS_CHANGED_SUBJECT: &str = "Status Changed";

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("failed to build mail relay client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("mail relay failed after {attempts} attempts: {reason}")]
    Delivery { attempts: u32, reason: String },
}

/// An outbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// Confirmation sent to a candidate right after applying.
    pub fn application_submitted(
        candidate_username: &str,
        candidate_email: &str,
        employer_email: &str,
        job_title: &str,
    ) -> Self {
        Self {
            from: employer_email.to_string(),
            to: vec![candidate_email.to_string()],
            subject: APPLICATION_SUBMITTED_SUBJECT.to_string(),
            body: format!(
                "Hi {candidate_username},\n\nYour application for \"{job_title}\" was received. \
                 The employer will review it and you will be notified when its status changes."
            ),
        }
    }

    /// Sent to a candidate whenever an employer sets a new status.
    pub fn status_changed(
        candidate_email: &str,
        employer_email: &str,
        job_title: &str,
        company_name: &str,
        status: &str,
    ) -> Self {
        Self {
            from: employer_email.to_string(),
            to: vec![candidate_email.to_string()],
            subject: STATUS_CHANGED_SUBJECT.to_string(),
            body: format!(
                "Your application for \"{job_title}\" at {company_name} is now {status}."
            ),
        }
    }
}

/// Destination for outbound messages.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Writes messages to the log; used when no relay is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationError> {
        info!(
            from = %notification.from,
            to = ?notification.to,
            subject = %notification.subject,
            "Mail relay not configured; notification logged only"
        );
        Ok(())
    }
}

/// Posts messages as JSON to an HTTP mail relay, retrying with backoff.
pub struct HttpMailRelay {
    client: Client,
    url: String,
    max_attempts: u32,
    retry_base: Duration,
}

impl HttpMailRelay {
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        max_attempts: u32,
    ) -> Result<Self, NotificationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(NotificationError::Client)?;

        Ok(Self {
            client,
            url: url.into(),
            max_attempts: max_attempts.max(1),
            retry_base: Duration::from_millis(500),
        })
    }

    /// Override the initial backoff delay.
    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    fn redacted_target(&self) -> String {
        Url::parse(&self.url)
            .ok()
            .map(|parsed| {
                format!(
                    "{}://{}",
                    parsed.scheme(),
                    parsed.host_str().unwrap_or("unknown")
                )
            })
            .unwrap_or_else(|| "[invalid-url]".to_string())
    }
}

#[async_trait]
impl NotificationSink for HttpMailRelay {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationError> {
        let mut delay = self.retry_base;
        let mut last_failure = String::new();

        for attempt in 1..=self.max_attempts {
            match self.client.post(&self.url).json(notification).send().await {
                Ok(response) if response.status().is_success() => {
                    info!(
                        target_host = %self.redacted_target(),
                        attempt,
                        "Notification delivered"
                    );
                    return Ok(());
                }
                Ok(response) => {
                    warn!(
                        target_host = %self.redacted_target(),
                        status = %response.status(),
                        attempt,
                        "Mail relay rejected notification"
                    );
                    last_failure = format!("status {}", response.status());
                }
                Err(e) => {
                    warn!(
                        target_host = %self.redacted_target(),
                        attempt,
                        error = %e,
                        "Mail relay request failed"
                    );
                    last_failure = e.to_string();
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }

        Err(NotificationError::Delivery {
            attempts: self.max_attempts,
            reason: last_failure,
        })
    }
}

/// Fire-and-forget front for a [`NotificationSink`].
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// Relay when configured, log otherwise.
    pub fn from_config(config: &MailConfig) -> Result<Self, NotificationError> {
        let sink: Arc<dyn NotificationSink> = match &config.relay_url {
            Some(url) => Arc::new(HttpMailRelay::new(
                url.clone(),
                Duration::from_secs(config.timeout_seconds),
                config.max_attempts,
            )?),
            None => Arc::new(LogSink),
        };
        Ok(Self::new(sink))
    }

    /// Deliver in the background. The returned handle may be ignored.
    pub fn dispatch(&self, notification: Notification) -> JoinHandle<()> {
        let sink = Arc::clone(&self.sink);
        let span = tracing::info_span!("notification", subject = %notification.subject);

        tokio::spawn(
            async move {
                match sink.deliver(&notification).await {
                    Ok(()) => {
                        metrics::counter!("notifications_total", "outcome" => "delivered")
                            .increment(1);
                    }
                    Err(e) => {
                        metrics::counter!("notifications_total", "outcome" => "failed")
                            .increment(1);
                        error!(error = %e, "Notification delivery failed");
                    }
                }
            }
            .instrument(span),
        )
    }
}
