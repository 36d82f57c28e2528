//! The `Email` resource: a declared request to send one message.

use serde::{Deserialize, Serialize};

use crate::resource::ObjectMeta;

/// Declared send request.
///
/// The spec is owned by whoever created the object; the status is owned by
/// the email reconciler and only ever written through a status write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailIntent {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: EmailSpec,
    #[serde(default)]
    pub status: EmailStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSpec {
    #[serde(default)]
    pub recipient_email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    /// Vendor selector; empty means "use the sender config's choice"
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,
    /// Name of an `EmailSenderConfig` in the same namespace
    #[serde(default)]
    pub sender_config_ref: String,
}

/// Delivery state as stored in `status.deliveryStatus`.
///
/// The unset value (`""`) is `Pending`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryStatus {
    #[default]
    #[serde(rename = "", alias = "Pending")]
    Pending,
    Sent,
    Failed,
}

impl DeliveryStatus {
    /// `Sent` is the only terminal state
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Sent)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "",
            Self::Sent => "Sent",
            Self::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("Pending"),
            other => f.write_str(other.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailStatus {
    #[serde(default)]
    pub delivery_status: DeliveryStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl EmailStatus {
    /// Status after a confirmed send; clears any earlier error
    pub fn sent(message_id: impl Into<String>) -> Self {
        Self {
            delivery_status: DeliveryStatus::Sent,
            message_id: message_id.into(),
            error: String::new(),
        }
    }

    /// Status after a failed attempt. The error is never left empty.
    pub fn failed(error: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "unknown delivery error".to_string();
        }

        Self {
            delivery_status: DeliveryStatus::Failed,
            message_id: String::new(),
            error,
        }
    }

    #[must_use]
    pub const fn is_sent(&self) -> bool {
        self.delivery_status.is_terminal()
    }
}

impl EmailIntent {
    #[must_use]
    pub fn new(metadata: ObjectMeta, spec: EmailSpec) -> Self {
        Self {
            metadata,
            spec,
            status: EmailStatus::default(),
        }
    }
}
