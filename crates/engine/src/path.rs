use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::context::RequestContext;

const FRONT_PAGE: &str = "<front>";

pub trait PathMatcher: Send + Sync {
    /// Whether the request path matches any of the newline-separated
    /// `patterns`.
    fn matches(&self, patterns: &str, request: &dyn RequestContext) -> bool;
}

/// One look's rule text, compiled.
#[derive(Debug)]
struct CompiledPatterns {
    front_page: bool,
    regex: Option<Regex>,
}

impl CompiledPatterns {
    fn compile(patterns: &str) -> Self {
        let mut front_page = false;
        let mut alternatives = Vec::new();
        for line in patterns.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line == FRONT_PAGE {
                front_page = true;
            } else {
                alternatives.push(regex::escape(line).replace(r"\*", ".*"));
            }
        }
        let regex = if alternatives.is_empty() {
            None
        } else {
            let source = format!("^(?:{})$", alternatives.join("|"));
            match RegexBuilder::new(&source).case_insensitive(true).build() {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(error = %e, "unusable path pattern");
                    None
                }
            }
        };
        Self { front_page, regex }
    }

    fn matches(&self, request: &dyn RequestContext) -> bool {
        if self.front_page && request.is_front_page() {
            return true;
        }
        let Some(regex) = &self.regex else {
            return false;
        };
        let path = request.path();
        let path = if path.len() > 1 { path.trim_end_matches('/') } else { path };
        regex.is_match(path)
    }
}

/// Glob-style matching: `*` matches any run of characters, `<front>` the
/// front page. Case-insensitive, surrounding whitespace ignored.
///
/// Each distinct rule text is compiled on first use and kept for the life of
/// the matcher.
#[derive(Debug, Default)]
pub struct WildcardPathMatcher {
    compiled: RwLock<HashMap<String, Arc<CompiledPatterns>>>,
}

impl WildcardPathMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn compiled(&self, patterns: &str) -> Arc<CompiledPatterns> {
        if let Some(hit) = self.compiled.read().get(patterns) {
            return Arc::clone(hit);
        }
        let compiled = Arc::new(CompiledPatterns::compile(patterns));
        debug!(rules = patterns.lines().count(), "compiled path rules");
        let mut map = self.compiled.write();
        Arc::clone(map.entry(patterns.to_string()).or_insert(compiled))
    }
}

impl PathMatcher for WildcardPathMatcher {
    fn matches(&self, patterns: &str, request: &dyn RequestContext) -> bool {
        self.compiled(patterns).matches(request)
    }
}
