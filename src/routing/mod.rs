//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (headers, path)
//!     → provider.rs (provider marker → ResolvedTarget in extensions)
//!     → target.rs (ResolvedTarget → absolute upstream URL)
//!
//! Block / allow lists:
//!     glob patterns → matcher.rs (compiled AccessPattern) → match / no match
//! ```
//!
//! # Design Decisions
//! - Providers and patterns compiled at startup, immutable at runtime
//! - Deterministic: same input always resolves to the same target
//! - No marker, or an unknown one, means the static default target

pub mod matcher;
pub mod provider;
pub mod target;

pub use matcher::{AccessPattern, PatternScope};
pub use provider::{provider_middleware, ProviderRegistry, Resolution};
pub use target::{ResolvedTarget, TargetError, TlsPolicy};
