use serde::{Deserialize, Serialize};

use crate::ProviderError;

/// A named address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mailbox {
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

impl Mailbox {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }
}

/// The message handed to a provider.
///
/// Serializes to the JSON body MailerSend expects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub from: Mailbox,
    pub to: Vec<Mailbox>,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl OutboundMessage {
    /// Reject messages no vendor would accept
    ///
    /// # Errors
    /// `ProviderError::Rejected` naming the first problem found
    pub fn validate(&self) -> Result<(), ProviderError> {
        if !is_address(&self.from.email) {
            return Err(ProviderError::Rejected(format!(
                "invalid sender address '{}'",
                self.from.email
            )));
        }

        if self.to.is_empty() {
            return Err(ProviderError::Rejected("no recipients".to_string()));
        }

        if let Some(bad) = self.to.iter().find(|mailbox| !is_address(&mailbox.email)) {
            return Err(ProviderError::Rejected(format!(
                "invalid recipient address '{}'",
                bad.email
            )));
        }

        Ok(())
    }
}

fn is_address(address: &str) -> bool {
    address
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty())
}

/// Proof that a provider accepted a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub message_id: String,
    pub provider: &'static str,
}
