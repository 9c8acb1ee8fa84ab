//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Port from config
//!     → listener.rs (bind, fatal on failure)
//!     → HTTP layer (axum accept loop)
//!     → connection.rs (in-flight tracking per request)
//! ```
//!
//! # Design Decisions
//! - Each request tracked for graceful shutdown
//! - Plain TCP only; TLS applies to upstream connections

pub mod connection;
pub mod listener;

pub use connection::{track_in_flight, InFlightGuard, InFlightTracker};
pub use listener::{bind, ListenerError};
