//! Glob pattern compiler
//!
//! Site rule patterns support two wildcards:
//! - `*` matches zero or more characters
//! - `?` matches exactly one character
//!
//! Every other character is literal. Wildcards are expanded token by token,
//! so neither binds tighter than the other. The compiled pattern is anchored
//! at both ends and case-insensitive for ASCII letters only: non-ASCII
//! characters never fold onto ASCII ones, so `ſ` does not match `s`.

use regex::Regex;
use std::borrow::Cow;

#[derive(Debug, Clone)]
enum Matcher {
    /// The lone `*` pattern
    Any,
    Compiled(Regex),
    /// Pattern could not be compiled, never matches
    Invalid,
}

#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    matcher: Matcher,
}

impl GlobPattern {
    pub fn compile(pattern: &str) -> Self {
        let matcher = if pattern == "*" {
            Matcher::Any
        } else {
            match Regex::new(&to_regex(pattern)) {
                Ok(re) => Matcher::Compiled(re),
                Err(e) => {
                    tracing::warn!(
                        pattern = %pattern,
                        error = %e,
                        "Failed to compile domain pattern"
                    );
                    Matcher::Invalid
                }
            }
        };

        Self {
            source: pattern.to_string(),
            matcher,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Test a hostname against the whole pattern
    pub fn is_match(&self, hostname: &str) -> bool {
        match &self.matcher {
            Matcher::Any => true,
            _ if self.source == hostname => true,
            Matcher::Compiled(re) => re.is_match(&fold_case(hostname)),
            Matcher::Invalid => false,
        }
    }
}

fn fold_case(hostname: &str) -> Cow<'_, str> {
    if hostname.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(hostname.to_ascii_lowercase())
    } else {
        Cow::Borrowed(hostname)
    }
}

/// Translate a glob into an anchored regular expression over ASCII-lowercased
/// input
pub(crate) fn to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');

    let mut buf = [0u8; 4];
    for ch in pattern.chars() {
        let ch = ch.to_ascii_lowercase();
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            _ => out.push_str(&regex::escape(ch.encode_utf8(&mut buf))),
        }
    }

    out.push('$');
    out
}
