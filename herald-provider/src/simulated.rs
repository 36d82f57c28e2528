//! Deterministic in-process provider.
//!
//! Accepts every well-formed message and answers with a fixed id, without
//! touching the network. Failures can be scripted ahead of time.

use std::{
    collections::VecDeque,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use herald_common::{Credential, internal};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{DeliveryReceipt, OutboundMessage, ProviderAdapter, ProviderError};

fn default_message_id() -> String {
    "simulated-message-id".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedConfig {
    #[serde(default = "default_message_id")]
    pub message_id: String,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            message_id: default_message_id(),
        }
    }
}

#[derive(Debug)]
pub struct SimulatedProvider {
    message_id: String,
    latency: Option<Duration>,
    calls: AtomicUsize,
    script: Mutex<VecDeque<ProviderError>>,
    sent: Mutex<Vec<OutboundMessage>>,
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self {
            message_id: default_message_id(),
            latency: None,
            calls: AtomicUsize::new(0),
            script: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
        }
    }
}

impl SimulatedProvider {
    /// A blank `message_id` falls back to the fixed default
    pub fn new(config: &SimulatedConfig) -> Self {
        let message_id = config.message_id.trim();
        if message_id.is_empty() {
            return Self::default();
        }

        Self {
            message_id: message_id.to_string(),
            ..Default::default()
        }
    }

    /// Take `latency` to answer each call
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail the next unscripted call with `error`
    pub fn fail_next(&self, error: ProviderError) {
        self.script.lock().push_back(error);
    }

    /// Number of `send` calls, successful or not
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Messages that were accepted
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl ProviderAdapter for SimulatedProvider {
    async fn send(
        &self,
        message: &OutboundMessage,
        _credential: &Credential,
        timeout: Duration,
    ) -> Result<DeliveryReceipt, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        message.validate()?;

        if let Some(latency) = self.latency {
            if latency > timeout {
                tokio::time::sleep(timeout).await;
                return Err(ProviderError::Timeout(timeout));
            }
            tokio::time::sleep(latency).await;
        }

        if let Some(error) = self.script.lock().pop_front() {
            internal!(level = DEBUG, "Simulated provider failing with: {error}");
            return Err(error);
        }

        self.sent.lock().push(message.clone());

        Ok(DeliveryReceipt {
            message_id: self.message_id.clone(),
            provider: self.name(),
        })
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}
