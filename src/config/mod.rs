//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (YAML/TOML/JSON)
//!     → loader.rs (read & pick format)
//!     → document.rs (parse into all-optional sections)
//!     → merge.rs (field-level merge per section, provider normalisation)
//!     → validation.rs (semantic checks)
//!     → Config (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - Loading never fails: any problem logs a warning and yields defaults
//! - Nested values are replaced, never deep-merged

pub mod document;
pub mod loader;
pub mod merge;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_str, try_load_config, ConfigError, ConfigFormat};
pub use schema::{
    AccessLogConfig, AuthConfig, AuthType, Config, HandlersConfig, HeadersConfig, LoggingConfig,
    MetricsConfig, MiddlewareConfig, Provider, RateLimitConfig, RewriteConfig, RewriteMode,
    RewriteRule, ServerConfig,
};
pub use validation::{validate_config, ValidationError};
