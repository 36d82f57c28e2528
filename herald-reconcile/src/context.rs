use herald_common::{Kind, ResourceKey};
use tokio_util::sync::CancellationToken;
use tracing::Span;

use crate::ReconcileError;

/// What the dispatcher should do with a key after a reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing more to do until the object changes
    Done,
    /// Try again after the key's next backoff delay
    Backoff,
}

/// Per-invocation context handed to every component a reconcile calls.
///
/// Carries the `reconcile` span the invocation logs under and the token that
/// tells it to stop.
#[derive(Debug, Clone)]
pub struct ReconcileContext {
    span: Span,
    cancel: CancellationToken,
}

impl ReconcileContext {
    pub fn new(kind: Kind, key: &ResourceKey, cancel: CancellationToken) -> Self {
        let span = tracing::info_span!(
            target: "herald::reconcile",
            "reconcile",
            kind = %kind,
            namespace = %key.namespace,
            name = %key.name,
        );

        Self { span, cancel }
    }

    /// A context with its own, never-cancelled token
    pub fn detached(kind: Kind, key: &ResourceKey) -> Self {
        Self::new(kind, key, CancellationToken::new())
    }

    pub const fn span(&self) -> &Span {
        &self.span
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop here if the invocation was cancelled
    ///
    /// # Errors
    /// `ReconcileError::Cancelled` once the token has been cancelled
    pub fn check(&self) -> Result<(), ReconcileError> {
        if self.is_cancelled() {
            Err(ReconcileError::Cancelled)
        } else {
            Ok(())
        }
    }
}
