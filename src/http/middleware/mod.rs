//! Pipeline stages that transform rather than reject.

pub mod access_log;
pub mod headers;
pub mod rewrite;

pub use access_log::{access_log_middleware, AccessLog};
pub use headers::{request_headers_middleware, response_headers_middleware, HeaderRules};
pub use rewrite::{rewrite_middleware, RewriteEngine};
