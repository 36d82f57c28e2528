//! Email status transitions.
//!
//! ```text
//! Pending ──send ok──▶ Sent (terminal)
//!    │                   ▲
//!    └──failure──▶ Failed┘ (only through a full successful pass)
//!                   │  ▲
//!                   └──┘ failure
//! ```

use herald_common::EmailStatus;
use herald_provider::DeliveryReceipt;

use crate::{Action, DeliveryFailure};

/// Result of one resolve-and-send pass
#[derive(Debug)]
pub enum Outcome {
    Sent(DeliveryReceipt),
    Failed(DeliveryFailure),
}

impl Outcome {
    pub const fn is_sent(&self) -> bool {
        matches!(self, Self::Sent(_))
    }

    /// Whether the provider was called to produce this outcome
    pub const fn reached_provider(&self) -> bool {
        matches!(self, Self::Sent(_) | Self::Failed(DeliveryFailure::Provider(_)))
    }

    /// What the dispatcher should do once this outcome is recorded
    pub const fn action(&self) -> Action {
        match self {
            Self::Sent(_) => Action::Done,
            Self::Failed(failure) if failure.is_permanent() => Action::Done,
            Self::Failed(_) => Action::Backoff,
        }
    }
}

/// The status to record for `outcome`, given what is stored now.
///
/// A stored `Sent` is never replaced.
pub fn next_status(current: &EmailStatus, outcome: &Outcome) -> EmailStatus {
    if current.is_sent() {
        return current.clone();
    }

    match outcome {
        Outcome::Sent(receipt) => EmailStatus::sent(receipt.message_id.clone()),
        Outcome::Failed(failure) => EmailStatus::failed(failure.to_string()),
    }
}
