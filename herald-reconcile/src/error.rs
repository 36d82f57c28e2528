//! Typed error handling for reconciliation.
//!
//! - [`ResolveError`]: the sender config or its credential could not be used
//! - [`DeliveryFailure`]: why an email ended up `Failed`; its message is what
//!   lands in `status.error`
//! - [`ReconcileError`]: failures handed back to the dispatcher instead of
//!   being recorded on the object

use herald_common::ResourceKey;
use herald_provider::{FailureClass, ProviderError, UnsupportedProvider};
use herald_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The referenced `EmailSenderConfig` does not exist.
    #[error("EmailSenderConfig not found")]
    SenderConfigNotFound(ResourceKey),

    /// The sender config does not name a credential.
    #[error("EmailSenderConfig {0} has no apiTokenSecretRef")]
    MissingSecretRef(ResourceKey),

    /// The credential object does not exist.
    #[error("Failed to get API token or from-email from secret: {0} not found")]
    CredentialNotFound(ResourceKey),

    /// A required credential field is absent or empty.
    #[error("Failed to get API token or from-email from secret: {secret} has no '{field}'")]
    MissingField {
        secret: ResourceKey,
        field: &'static str,
    },

    /// A credential field is not valid base64.
    #[error("Failed to get API token or from-email from secret: '{field}' is not valid base64: {source}")]
    Decode {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    /// A credential field decoded to something other than UTF-8 text.
    #[error("Failed to get API token or from-email from secret: '{field}' is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },

    /// The store failed for a reason other than a missing object.
    #[error("Store error: {0}")]
    Store(#[source] StoreError),
}

impl ResolveError {
    /// Returns `true` if the failure concerns the credential object itself.
    #[must_use]
    pub const fn is_credential(&self) -> bool {
        matches!(
            self,
            Self::MissingSecretRef(_)
                | Self::CredentialNotFound(_)
                | Self::MissingField { .. }
                | Self::Decode { .. }
                | Self::InvalidUtf8 { .. }
        )
    }
}

/// Why an email could not be delivered on this attempt
#[derive(Debug, Error)]
pub enum DeliveryFailure {
    #[error(transparent)]
    Resolve(ResolveError),

    #[error(transparent)]
    Unsupported(UnsupportedProvider),

    #[error(transparent)]
    Provider(ProviderError),
}

impl DeliveryFailure {
    /// Returns `true` if retrying without a change to the email cannot help.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        match self {
            Self::Resolve(_) => false,
            Self::Unsupported(_) => true,
            Self::Provider(error) => error.is_permanent(),
        }
    }

    /// Returns `true` if the dispatcher should back off and try again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !self.is_permanent()
    }

    /// Short label for logs
    #[must_use]
    pub const fn class(&self) -> &'static str {
        match self {
            Self::Resolve(ResolveError::SenderConfigNotFound(_)) => "dependency-missing",
            Self::Resolve(_) => "credential",
            Self::Unsupported(_) => "unsupported-provider",
            Self::Provider(error) => match error.class() {
                FailureClass::Authentication => "authentication",
                FailureClass::Transient => "transient",
                FailureClass::Rejected => "rejected",
                FailureClass::Unknown => "unknown",
            },
        }
    }
}

/// Failures returned to the dispatcher, which backs off on its own
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Status write kept conflicting after {0} attempts")]
    ConflictRetriesExhausted(usize),

    #[error("Reconcile cancelled")]
    Cancelled,
}

impl ReconcileError {
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
