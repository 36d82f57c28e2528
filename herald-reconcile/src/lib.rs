//! Reconciliation of declared emails into delivered (or failed) ones.
//!
//! The [`EmailReconciler`] drives a single `Email` to a terminal outcome:
//! load it, resolve its sender config and credential, hand the message to a
//! provider, and record what happened with a conflict-checked status write.
//! The [`SenderConfigReconciler`] keeps `EmailSenderConfig.status.error` in
//! step with whether its credential resolves. The [`Dispatcher`] turns store
//! watch events into serialized, rate-limited calls to both.

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod policy;
pub mod reconciler;
pub mod resolver;
pub mod sender_config;
pub mod status;

pub use config::ReconcilerConfig;
pub use context::{Action, ReconcileContext};
pub use dispatcher::{Dispatcher, DispatcherConfig, DispatcherHandle, WorkQueue};
pub use engine::EmailReconciler;
pub use error::{DeliveryFailure, ReconcileError, ResolveError};
pub use policy::RetryPolicy;
pub use reconciler::Reconciler;
pub use resolver::{Resolved, Resolver};
pub use sender_config::SenderConfigReconciler;
pub use status::Outcome;
