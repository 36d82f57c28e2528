//! Health check endpoints for the herald controller
//!
//! # Endpoints
//!
//! - **`/health/live`** - Liveness probe: 200 while the process can answer
//! - **`/health/ready`** - Readiness probe: 200 once the store is reachable,
//!   the dispatcher is running and the work queues are below their limit
//!
//! Both answer with a JSON [`HealthStatus`] snapshot.
//!
//! # Usage
//!
//! ```rust,no_run
//! use herald_health::{HealthChecker, HealthConfig, HealthServer};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HealthConfig::default();
//! let checker = Arc::new(HealthChecker::new(config.max_queue_depth));
//! let server = HealthServer::new(&config, checker).await?;
//!
//! // server.serve(shutdown_receiver).await?;
//! # Ok(())
//! # }
//! ```

mod checker;
mod config;
mod error;
mod server;

pub use checker::{HealthChecker, HealthStatus};
pub use config::HealthConfig;
pub use error::HealthError;
pub use server::{HealthServer, LIVE_PATH, READY_PATH, router};
