//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → stop accepting → drain in-flight (≤ 5 s) → Graceful | Forced
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has timeout: forced exit after deadline
//! - The outcome maps onto the process exit code

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownOutcome, DEFAULT_GRACE_PERIOD};
pub use signals::{spawn_signal_handler, wait_for_termination};
