//! Classified provider failures.
//!
//! The reconciler only cares about the class of a failure:
//! - Rejected: the vendor refused the content or recipient, don't retry
//! - Authentication and Transient: retry with backoff
//! - Unknown: anything else, retried with backoff

use std::time::Duration;

use thiserror::Error;

/// How a provider failure should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    Authentication,
    Transient,
    Rejected,
    Unknown,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The vendor refused the credential.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// No answer within the send timeout.
    #[error("Request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    /// The request never reached the vendor.
    #[error("Network error: {0}")]
    Network(String),

    /// The vendor is rate limiting or temporarily failing.
    #[error("Provider unavailable ({status}): {message}")]
    Unavailable { status: u16, message: String },

    /// The vendor refused the message itself.
    #[error("Message rejected: {0}")]
    Rejected(String),

    /// Anything the adapter could not classify.
    #[error("Unexpected provider response: {0}")]
    Other(String),
}

impl ProviderError {
    #[must_use]
    pub const fn class(&self) -> FailureClass {
        match self {
            Self::Authentication(_) => FailureClass::Authentication,
            Self::Timeout(_) | Self::Network(_) | Self::Unavailable { .. } => {
                FailureClass::Transient
            }
            Self::Rejected(_) => FailureClass::Rejected,
            Self::Other(_) => FailureClass::Unknown,
        }
    }

    /// Returns `true` if retrying the same message cannot succeed.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self.class(), FailureClass::Rejected)
    }

    /// Returns `true` if the failure is expected to clear up by itself.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.class(), FailureClass::Transient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(
            ProviderError::Authentication(String::new()).class(),
            FailureClass::Authentication
        );
        assert!(ProviderError::Timeout(Duration::from_secs(10)).is_transient());
        assert!(ProviderError::Network(String::new()).is_transient());
        assert!(
            ProviderError::Unavailable {
                status: 503,
                message: String::new()
            }
            .is_transient()
        );
        assert!(ProviderError::Rejected(String::new()).is_permanent());
        assert!(!ProviderError::Other(String::new()).is_permanent());
        assert!(!ProviderError::Authentication(String::new()).is_permanent());
    }

    #[test]
    fn test_timeout_message() {
        assert_eq!(
            ProviderError::Timeout(Duration::from_secs(10)).to_string(),
            "Request timed out after 10s"
        );
    }
}
