//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → access_list.rs (block list, then allow list)
//!     → auth.rs (basic / bearer / api_key)
//!     → rate_limit.rs (per-IP or global token bucket)
//!     → Pass to header mutation and routing
//! ```
//!
//! # Design Decisions
//! - Each check is a terminal stage: a rejection skips everything after it
//! - Fail closed: malformed input is rejected, never forwarded
//! - Rejections log at warn or debug, never error

pub mod access_list;
pub mod auth;
pub mod rate_limit;

pub use access_list::{allow_list_middleware, block_list_middleware, AccessList};
pub use auth::{auth_middleware, AuthDecision, AuthVerifier, RejectReason};
pub use rate_limit::{rate_limit_middleware, RateLimiter};
