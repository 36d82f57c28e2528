//! Shared types for the herald email controller.
//!
//! This crate holds the resource model (`Email`, `EmailSenderConfig`,
//! `Secret`), the metadata every stored object carries, and the logging
//! helpers used by the other crates in the workspace.

pub mod audit;
pub mod email;
pub mod logging;
pub mod object;
pub mod resource;
pub mod sender;

pub use tracing;

pub use email::{DeliveryStatus, EmailIntent, EmailSpec, EmailStatus};
pub use object::{Object, Resource};
pub use resource::{Kind, ObjectMeta, ResourceKey};
pub use sender::{Credential, Secret, SenderConfig, SenderConfigSpec, SenderConfigStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
    Finalised,
}
