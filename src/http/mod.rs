//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum serve, graceful drain)
//!     → pipeline.rs (request id, metrics, in-flight tracking, /health)
//!     → middleware/ + security (ordered stages)
//!     → routing (provider → ResolvedTarget)
//!     → response.rs (strip hop-by-hop headers)
//!     → transport (upstream exchange)
//!     → upgrade.rs (relay bytes after `101 Switching Protocols`)
//!     → Send to client
//! ```

pub mod health;
pub mod middleware;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod server;
pub mod upgrade;

pub use health::HealthStatus;
pub use pipeline::{Pipeline, PipelineError};
pub use request::X_REQUEST_ID;
pub use server::{HttpServer, ServerError};
