use std::{collections::HashMap, fmt::Display, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    MailerSendConfig, MailerSendProvider, ProviderAdapter, ProviderError, SimulatedConfig,
    SimulatedProvider,
};

/// Supported vendors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    #[default]
    MailerSend,
    Simulated,
}

impl ProviderKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MailerSend => "mailersend",
            Self::Simulated => "simulated",
        }
    }
}

impl Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported email provider '{0}'")]
pub struct UnsupportedProvider(pub String);

impl FromStr for ProviderKind {
    type Err = UnsupportedProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mailersend" => Ok(Self::MailerSend),
            "simulated" => Ok(Self::Simulated),
            _ => Err(UnsupportedProvider(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Used when neither the email nor its sender config names a provider
    #[serde(default)]
    pub default: ProviderKind,
    #[serde(default)]
    pub mailersend: MailerSendConfig,
    #[serde(default)]
    pub simulated: SimulatedConfig,
}

/// The adapters available to the reconciler, keyed by kind
#[derive(Debug, Clone, Default)]
pub struct Providers {
    default: ProviderKind,
    adapters: HashMap<ProviderKind, Arc<dyn ProviderAdapter>>,
}

impl Providers {
    /// An empty registry falling back to `default`
    #[must_use]
    pub fn new(default: ProviderKind) -> Self {
        Self {
            default,
            adapters: HashMap::new(),
        }
    }

    /// Build every configured adapter
    ///
    /// # Errors
    /// If an adapter cannot be constructed
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, ProviderError> {
        Ok(Self::new(config.default)
            .with(
                ProviderKind::MailerSend,
                Arc::new(MailerSendProvider::new(config.mailersend.clone())?),
            )
            .with(
                ProviderKind::Simulated,
                Arc::new(SimulatedProvider::new(&config.simulated)),
            ))
    }

    #[must_use]
    pub fn with(mut self, kind: ProviderKind, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.insert(kind, adapter);
        self
    }

    #[must_use]
    pub const fn default_kind(&self) -> ProviderKind {
        self.default
    }

    /// Pick an adapter from the first non-empty selector, or the default
    ///
    /// # Errors
    /// If the chosen selector is unknown or has no adapter registered
    pub fn select(
        &self,
        selectors: &[&str],
    ) -> Result<(ProviderKind, Arc<dyn ProviderAdapter>), UnsupportedProvider> {
        let kind = selectors
            .iter()
            .find(|selector| !selector.trim().is_empty())
            .map_or(Ok(self.default), |selector| selector.parse())?;

        self.adapters
            .get(&kind)
            .map(|adapter| (kind, Arc::clone(adapter)))
            .ok_or_else(|| UnsupportedProvider(kind.to_string()))
    }
}
