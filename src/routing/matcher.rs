//! Request matching for block and allow lists.
//!
//! # Responsibilities
//! - Compile `*` glob patterns into anchored regular expressions
//! - Match path-only patterns against the request path
//! - Match host patterns against `host + path`
//!
//! # Design Decisions
//! - Host matching is case-insensitive
//! - Path matching is case-sensitive
//! - Patterns compile once at startup; invalid ones are rejected then

use regex::Regex;

/// What part of the request a pattern is compared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternScope {
    /// Pattern starts with `/`: compared with the path alone.
    Path,
    /// Anything else: compared with `host` followed by the path.
    HostPath,
}

/// One compiled block/allow pattern such as `/admin/*` or `*.internal.example.com/*`.
#[derive(Debug, Clone)]
pub struct AccessPattern {
    source: String,
    scope: PatternScope,
    regex: Regex,
}

impl AccessPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let scope = if pattern.starts_with('/') {
            PatternScope::Path
        } else {
            PatternScope::HostPath
        };
        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = match scope {
            PatternScope::Path => Regex::new(&format!("^{body}$"))?,
            PatternScope::HostPath => Regex::new(&format!("(?i)^{body}$"))?,
        };
        Ok(Self {
            source: pattern.to_string(),
            scope,
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn scope(&self) -> PatternScope {
        self.scope
    }

    /// Match against already extracted request parts.
    pub fn matches_parts(&self, host: Option<&str>, path: &str) -> bool {
        match self.scope {
            PatternScope::Path => self.regex.is_match(path),
            PatternScope::HostPath => match host {
                Some(host) => self.regex.is_match(&format!("{host}{path}")),
                None => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    use crate::http::request::request_host;

    fn request(host: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("Host", host)
            .body(Body::default())
            .unwrap()
    }

    impl AccessPattern {
        /// Match a whole request the way the access lists do.
        fn matches(&self, req: &Request<Body>) -> bool {
            self.matches_parts(request_host(req).as_deref(), req.uri().path())
        }
    }

    #[test]
    fn test_path_pattern() {
        let pattern = AccessPattern::new("/admin/*").unwrap();
        assert_eq!(pattern.scope(), PatternScope::Path);

        assert!(pattern.matches(&request("example.com", "/admin/users")));
        assert!(pattern.matches(&request("example.com", "/admin/")));
        assert!(!pattern.matches(&request("example.com", "/admin")));
        assert!(!pattern.matches(&request("example.com", "/public/admin/x")));
        // Path matching is case-sensitive
        assert!(!pattern.matches(&request("example.com", "/ADMIN/users")));
    }

    #[test]
    fn test_exact_path_pattern() {
        let pattern = AccessPattern::new("/health").unwrap();
        assert!(pattern.matches(&request("a", "/health")));
        assert!(!pattern.matches(&request("a", "/healthz")));
    }

    #[test]
    fn test_host_pattern() {
        let pattern = AccessPattern::new("*.internal.example.com/*").unwrap();
        assert_eq!(pattern.scope(), PatternScope::HostPath);

        assert!(pattern.matches(&request("db.internal.example.com", "/x")));
        assert!(pattern.matches(&request("DB.Internal.Example.com:8443", "/x")));
        assert!(!pattern.matches(&request("example.com", "/x")));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let pattern = AccessPattern::new("/v1.0/(x)").unwrap();
        assert!(pattern.matches(&request("a", "/v1.0/(x)")));
        assert!(!pattern.matches(&request("a", "/v1x0/(x)")));
    }

    #[test]
    fn test_host_pattern_without_host_never_matches() {
        let pattern = AccessPattern::new("example.com/*").unwrap();
        assert!(!pattern.matches_parts(None, "/x"));
    }
}
