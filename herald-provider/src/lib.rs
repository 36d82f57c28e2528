//! Email provider adapters.
//!
//! Every vendor sits behind [`ProviderAdapter`]. The reconciler picks one by
//! [`ProviderKind`] through the [`Providers`] registry and never talks to a
//! vendor API directly.

pub mod adapter;
pub mod error;
pub mod mailersend;
pub mod message;
pub mod registry;
pub mod simulated;

pub use adapter::ProviderAdapter;
pub use error::{FailureClass, ProviderError};
pub use mailersend::{MailerSendConfig, MailerSendProvider};
pub use message::{DeliveryReceipt, Mailbox, OutboundMessage};
pub use registry::{ProviderKind, Providers, ProvidersConfig, UnsupportedProvider};
pub use simulated::{SimulatedConfig, SimulatedProvider};
