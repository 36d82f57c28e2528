use async_trait::async_trait;
use herald_common::{Kind, ResourceKey};

use crate::{Action, ReconcileContext, ReconcileError};

/// Something the dispatcher can drive for one resource kind.
///
/// `reconcile` must be idempotent: the dispatcher calls it at least once per
/// change and may call it again at any time.
#[async_trait]
pub trait Reconciler: Send + Sync + 'static {
    /// The kind whose keys this reconciler accepts
    fn kind(&self) -> Kind;

    /// Converge the object under `key`
    ///
    /// # Errors
    /// Store failures, exhausted conflict retries, or cancellation
    async fn reconcile(
        &self,
        key: &ResourceKey,
        ctx: &ReconcileContext,
    ) -> Result<Action, ReconcileError>;
}
