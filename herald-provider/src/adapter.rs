use std::time::Duration;

use async_trait::async_trait;
use herald_common::Credential;

use crate::{DeliveryReceipt, OutboundMessage, ProviderError};

/// A vendor capable of sending one email per call.
///
/// Implementations make exactly one attempt; retrying is the caller's job.
#[async_trait]
pub trait ProviderAdapter: Send + Sync + std::fmt::Debug {
    /// Send a message, returning the vendor's identifier for it
    ///
    /// # Errors
    /// A classified [`ProviderError`] if the vendor did not accept the message
    async fn send(
        &self,
        message: &OutboundMessage,
        credential: &Credential,
        timeout: Duration,
    ) -> Result<DeliveryReceipt, ProviderError>;

    /// Name used in logs and audit events
    fn name(&self) -> &'static str;
}
