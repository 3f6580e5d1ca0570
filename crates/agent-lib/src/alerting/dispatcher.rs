//! Alert delivery
//!
//! A dispatcher without credentials is a silent no-op apart from a
//! warning. Every delivery is bounded by the configured timeout, and
//! failures are reported to the caller once without retry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::{SmtpConfig, MAX_SMTP_TIMEOUT};
use crate::error::{MonitorError, MonitorResult};
use crate::models::AlertEvent;
use crate::observability::{MonitorMetrics, StructuredLogger};

/// Rendered notification for one alert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
}

impl AlertMessage {
    pub fn for_event(alert: &AlertEvent) -> Self {
        let name = alert.metric.display_name();
        Self {
            subject: format!("Alert: {} Threshold Exceeded", name),
            body: format!(
                "System Alert:\n\n\
                 Metric '{}' has exceeded the configured threshold of {:.1}.\n\
                 Current value: {:.2}\n\n\
                 Please check the system.",
                name, alert.threshold, alert.value
            ),
        }
    }
}

/// Delivers rendered alerts to an external channel
#[async_trait]
pub trait AlertTransport: Send + Sync {
    /// Transport name for logs
    fn name(&self) -> &str;

    async fn deliver(&self, message: &AlertMessage) -> MonitorResult<()>;
}

/// Email delivery over an authenticated STARTTLS relay
pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpTransport {
    /// Build a transport, or `None` when credentials are incomplete
    pub fn from_config(config: &SmtpConfig) -> MonitorResult<Option<Self>> {
        let Some((username, password, receiver)) = config.credentials() else {
            return Ok(None);
        };

        let from: Mailbox = username.parse().map_err(|e| MonitorError::Configuration {
            key: "GMAIL_USERNAME".to_string(),
            reason: format!("invalid sender address: {}", e),
        })?;
        let to: Mailbox = receiver.parse().map_err(|e| MonitorError::Configuration {
            key: "RECEIVER_EMAIL".to_string(),
            reason: format!("invalid receiver address: {}", e),
        })?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| MonitorError::Configuration {
                key: "SMTP_HOST".to_string(),
                reason: e.to_string(),
            })?
            .port(config.port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .timeout(Some(config.timeout.min(MAX_SMTP_TIMEOUT)))
            .build();

        Ok(Some(Self { mailer, from, to }))
    }
}

#[async_trait]
impl AlertTransport for SmtpTransport {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn deliver(&self, message: &AlertMessage) -> MonitorResult<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(message.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| MonitorError::Transport(format!("failed to build message: {}", e)))?;

        self.mailer
            .send(email)
            .await
            .map(|_| ())
            .map_err(|e| MonitorError::Transport(e.to_string()))
    }
}

/// Sends threshold alerts through an optional transport
#[derive(Clone)]
pub struct AlertDispatcher {
    transport: Option<Arc<dyn AlertTransport>>,
    timeout: Duration,
    logger: StructuredLogger,
    metrics: MonitorMetrics,
}

impl AlertDispatcher {
    /// SMTP dispatcher, disabled when credentials are missing
    pub fn from_config(config: &SmtpConfig, logger: StructuredLogger) -> MonitorResult<Self> {
        let transport = SmtpTransport::from_config(config)?
            .map(|t| Arc::new(t) as Arc<dyn AlertTransport>);

        Ok(Self {
            transport,
            timeout: config.timeout.min(MAX_SMTP_TIMEOUT),
            logger,
            metrics: MonitorMetrics::new(),
        })
    }

    pub fn with_transport(
        transport: Arc<dyn AlertTransport>,
        timeout: Duration,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            transport: Some(transport),
            timeout: timeout.min(MAX_SMTP_TIMEOUT),
            logger,
            metrics: MonitorMetrics::new(),
        }
    }

    /// Dispatcher that only logs a warning per alert
    pub fn disabled(logger: StructuredLogger) -> Self {
        Self {
            transport: None,
            timeout: MAX_SMTP_TIMEOUT,
            logger,
            metrics: MonitorMetrics::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    pub fn transport_name(&self) -> Option<&str> {
        self.transport.as_deref().map(|t| t.name())
    }

    pub async fn dispatch(&self, alert: &AlertEvent) -> MonitorResult<()> {
        let Some(transport) = self.transport.as_deref() else {
            self.logger
                .log_alert_skipped(alert, "email credentials not configured");
            return Ok(());
        };

        let message = AlertMessage::for_event(alert);
        let outcome = match tokio::time::timeout(self.timeout, transport.deliver(&message)).await {
            Ok(result) => result,
            Err(_) => Err(MonitorError::Transport(format!(
                "delivery timed out after {}ms",
                self.timeout.as_millis()
            ))),
        };

        match &outcome {
            Ok(()) => {
                self.metrics.inc_alerts_dispatched();
                self.logger.log_alert_sent(alert, transport.name());
            }
            Err(err) => {
                self.metrics.inc_alerts_failed();
                self.logger
                    .log_alert_failed(alert, transport.name(), &err.to_string());
            }
        }

        outcome
    }
}
