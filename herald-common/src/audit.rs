//! Audit logging for email delivery events
//!
//! Each reconcile that reaches a provider emits a `DeliveryAttempt`, followed
//! by either `DeliverySuccess` or `DeliveryFailure`. Events are plain tracing
//! events on the `herald::audit` target so they follow whatever format the
//! subscriber was configured with.
//!
//! ## PII Redaction
//!
//! Recipient addresses can be reduced to their domain with
//! `redact_recipients`. Subjects and bodies are never logged.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Audit logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable audit events for delivery attempts
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Redact recipient email addresses from audit events
    #[serde(default)]
    pub redact_recipients: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redact_recipients: false,
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Redact email address if redaction is enabled
#[must_use]
pub fn redact_email(email: &str, redact: bool) -> String {
    if redact {
        if let Some((_, domain)) = email.split_once('@') {
            format!("[REDACTED]@{domain}")
        } else {
            "[REDACTED]".to_string()
        }
    } else {
        email.to_string()
    }
}

/// Handle for emitting audit events, shared by every reconcile worker
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    config: Arc<AuditConfig>,
}

impl AuditLog {
    #[must_use]
    pub fn new(config: AuditConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    fn recipient(&self, recipient: &str) -> String {
        redact_email(recipient, self.config.redact_recipients)
    }

    /// Logged right before a provider is asked to send
    pub fn delivery_attempt(&self, email: &str, provider: &str, recipient: &str) {
        if !self.config.enabled {
            return;
        }

        tracing::event!(
            target: "herald::audit",
            tracing::Level::INFO,
            event = "DeliveryAttempt",
            email = %email,
            provider = %provider,
            recipient = %self.recipient(recipient),
            "Audit: Delivery attempt"
        );
    }

    /// Logged when a provider accepted the message
    pub fn delivery_success(
        &self,
        email: &str,
        provider: &str,
        recipient: &str,
        message_id: &str,
        duration_ms: u128,
    ) {
        if !self.config.enabled {
            return;
        }

        tracing::event!(
            target: "herald::audit",
            tracing::Level::INFO,
            event = "DeliverySuccess",
            email = %email,
            provider = %provider,
            recipient = %self.recipient(recipient),
            message_id = %message_id,
            duration_ms = duration_ms,
            "Audit: Delivery successful"
        );
    }

    /// Logged when a send could not be completed
    pub fn delivery_failure(&self, email: &str, provider: &str, error: &str, permanent: bool) {
        if !self.config.enabled {
            return;
        }

        tracing::event!(
            target: "herald::audit",
            tracing::Level::WARN,
            event = "DeliveryFailure",
            email = %email,
            provider = %provider,
            error = %error,
            permanent = permanent,
            "Audit: Delivery failed"
        );
    }
}
