//! Retry policy for failed reconciles.
//!
//! - [`RetryPolicy`]: how many times a key is retried and how long to wait

pub mod retry;

pub use retry::RetryPolicy;
