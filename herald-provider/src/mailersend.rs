//! MailerSend HTTP adapter.
//!
//! `POST {endpoint}` with the message as JSON and the credential's token as a
//! bearer token. A 2xx response carries the vendor's id in `X-Message-Id`.

use std::time::Duration;

use async_trait::async_trait;
use herald_common::{Credential, outgoing};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{DeliveryReceipt, OutboundMessage, ProviderAdapter, ProviderError};

pub const MESSAGE_ID_HEADER: &str = "X-Message-Id";

/// Longest response body kept in an error message
const MAX_ERROR_BODY: usize = 512;

mod defaults {
    pub fn endpoint() -> String {
        "https://api.mailersend.com/v1/email".to_string()
    }

    pub fn from_name() -> String {
        "MailerSend".to_string()
    }

    pub fn recipient_name() -> String {
        "Recipient".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailerSendConfig {
    #[serde(default = "defaults::endpoint")]
    pub endpoint: String,
    /// Sender display name when the sender config does not set one
    #[serde(default = "defaults::from_name")]
    pub from_name: String,
    /// Display name given to recipients without one
    #[serde(default = "defaults::recipient_name")]
    pub recipient_name: String,
}

impl Default for MailerSendConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::endpoint(),
            from_name: defaults::from_name(),
            recipient_name: defaults::recipient_name(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MailerSendProvider {
    config: MailerSendConfig,
    http_client: Client,
}

impl MailerSendProvider {
    /// Create an adapter sharing one connection pool across all sends
    ///
    /// # Errors
    /// If the HTTP client cannot be built (e.g. no TLS backend)
    pub fn new(config: MailerSendConfig) -> Result<Self, ProviderError> {
        let http_client = Client::builder()
            .user_agent(concat!("herald/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Fill in display names the caller left empty
    fn with_default_names(&self, message: &OutboundMessage) -> OutboundMessage {
        let mut message = message.clone();
        if message.from.name.is_empty() {
            message.from.name.clone_from(&self.config.from_name);
        }
        for recipient in &mut message.to {
            if recipient.name.is_empty() {
                recipient.name.clone_from(&self.config.recipient_name);
            }
        }
        message
    }
}

/// Map a non-success HTTP status to a classified error
fn classify_status(status: StatusCode, body: String) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::Authentication(format!("{status}: {body}")),
        400 | 422 => ProviderError::Rejected(format!("{status}: {body}")),
        408 | 429 | 500..=599 => ProviderError::Unavailable {
            status: status.as_u16(),
            message: body,
        },
        _ => ProviderError::Other(format!("{status}: {body}")),
    }
}

/// Map a transport failure to a classified error
fn classify_transport(error: &reqwest::Error, timeout: Duration) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout(timeout)
    } else if error.is_connect() || error.is_request() {
        ProviderError::Network(error.to_string())
    } else {
        ProviderError::Other(error.to_string())
    }
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}

#[async_trait]
impl ProviderAdapter for MailerSendProvider {
    async fn send(
        &self,
        message: &OutboundMessage,
        credential: &Credential,
        timeout: Duration,
    ) -> Result<DeliveryReceipt, ProviderError> {
        message.validate()?;
        let message = self.with_default_names(message);

        outgoing!(
            level = DEBUG,
            "POST {} for {} recipient(s)",
            self.config.endpoint,
            message.to.len()
        );

        let response = self
            .http_client
            .post(&self.config.endpoint)
            .bearer_auth(&credential.auth_token)
            .timeout(timeout)
            .json(&message)
            .send()
            .await
            .map_err(|e| classify_transport(&e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, truncate(body)));
        }

        let message_id = response
            .headers()
            .get(MESSAGE_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ProviderError::Other(format!("{status} without {MESSAGE_ID_HEADER} header"))
            })?
            .to_string();

        outgoing!(level = DEBUG, "MailerSend accepted message {message_id}");

        Ok(DeliveryReceipt {
            message_id,
            provider: self.name(),
        })
    }

    fn name(&self) -> &'static str {
        "mailersend"
    }
}
