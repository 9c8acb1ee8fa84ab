//! URL rewriting.
//!
//! Rules are regexes applied to the path and query. Each rule replaces its
//! first match only. In `chain` mode every rule sees the previous rule's
//! output; in `first_match` mode only the first rule that matches runs.

use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use regex::Regex;

use crate::config::{RewriteConfig, RewriteMode};
use crate::http::request::{path_and_query, set_path_and_query};

#[derive(Debug, Clone)]
struct CompiledRule {
    pattern: Regex,
    replacement: String,
}

#[derive(Debug, Clone)]
pub struct RewriteEngine {
    rules: Vec<CompiledRule>,
    mode: RewriteMode,
}

impl RewriteEngine {
    pub fn new(config: &RewriteConfig) -> Self {
        let rules = config
            .rules
            .iter()
            .filter_map(|rule| match Regex::new(&rule.pattern) {
                Ok(pattern) => Some(CompiledRule {
                    pattern,
                    replacement: brace_group_refs(&rule.replace),
                }),
                Err(e) => {
                    tracing::warn!(pattern = %rule.pattern, error = %e, "Skipping invalid rewrite rule");
                    None
                }
            })
            .collect();
        Self {
            rules,
            mode: config.mode,
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rewritten path and query, or `None` when no rule matched.
    pub fn rewrite(&self, input: &str) -> Option<String> {
        let mut current = input.to_string();
        let mut changed = false;
        for rule in &self.rules {
            if !rule.pattern.is_match(&current) {
                continue;
            }
            current = rule
                .pattern
                .replace(&current, rule.replacement.as_str())
                .into_owned();
            changed = true;
            if self.mode == RewriteMode::FirstMatch {
                break;
            }
        }
        changed.then_some(current)
    }
}

/// Brace numeric group references so `$1_v2` means group 1 followed by `_v2`.
///
/// The regex crate would otherwise read `$1_v2` as a group named `1_v2`.
/// `$$` stays an escaped dollar and `${..}` is left as written.
fn brace_group_refs(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len() + 4);
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
                out.push_str("$$");
            }
            Some(d) if d.is_ascii_digit() => {
                out.push_str("${");
                while let Some(d) = chars.next_if(char::is_ascii_digit) {
                    out.push(d);
                }
                out.push('}');
            }
            _ => out.push('$'),
        }
    }
    out
}

pub async fn rewrite_middleware(
    State(engine): State<Arc<RewriteEngine>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let original = path_and_query(&request).to_string();
    if let Some(rewritten) = engine.rewrite(&original) {
        match set_path_and_query(&mut request, &rewritten) {
            Ok(()) => tracing::debug!(from = %original, to = %rewritten, "Rewrote URL"),
            Err(e) => tracing::warn!(from = %original, to = %rewritten, error = %e, "Rewrite produced an invalid URI, leaving request unchanged"),
        }
    }
    next.run(request).await
}
