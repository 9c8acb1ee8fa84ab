//! Configurable HTTP proxy gateway library.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod security;
pub mod transport;

pub use config::Config;
pub use http::{HttpServer, Pipeline};
pub use lifecycle::{Shutdown, ShutdownOutcome};
