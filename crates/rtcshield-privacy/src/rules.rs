//! Rule evaluation
//!
//! Resolves a hostname to an action. Rules are evaluated in list order and
//! the first match wins; there is no specificity ranking.

use url::Url;

use crate::error::PrivacyError;
use crate::glob::GlobPattern;
use crate::policy::{Rule, RuleAction, Settings};
use crate::Result;

/// Check whether a hostname matches a domain pattern
pub fn matches_glob(hostname: &str, pattern: &str) -> bool {
    GlobPattern::compile(pattern).is_match(hostname)
}

/// Return the action of the first rule matching `hostname`
pub fn match_rule(hostname: &str, rules: &[Rule]) -> Option<RuleAction> {
    rules
        .iter()
        .find(|rule| matches_glob(hostname, &rule.domain))
        .map(|rule| rule.action)
}

/// Rule action for `hostname`, falling back to the default rule
pub fn effective_action(hostname: &str, rules: &[Rule], default_rule: RuleAction) -> RuleAction {
    match_rule(hostname, rules).unwrap_or(default_rule)
}

/// Extract the hostname from a page URL.
///
/// URLs without a host (`about:blank`, `data:`) yield an empty hostname.
pub fn hostname_of(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| PrivacyError::InvalidUrl(format!("{url}: {e}")))?;
    Ok(parsed.host_str().unwrap_or_default().to_string())
}

/// Whether the page-level blocker should be injected into a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDecision {
    Inject,
    Skip,
}

/// Decide page injection for a document on `hostname`.
///
/// Pages without a host (`file:`, `about:`) pass an empty hostname and are
/// still subject to rules like `*`.
pub fn page_decision(hostname: &str, rules: &[Rule], settings: &Settings) -> PageDecision {
    if effective_action(hostname, rules, settings.default_rule).is_block() {
        PageDecision::Inject
    } else {
        PageDecision::Skip
    }
}

/// A rule list with its patterns compiled once
#[derive(Debug, Clone, Default)]
pub struct CompiledRules {
    entries: Vec<(GlobPattern, RuleAction)>,
}

impl CompiledRules {
    pub fn new(rules: &[Rule]) -> Self {
        let entries = rules
            .iter()
            .map(|rule| (GlobPattern::compile(&rule.domain), rule.action))
            .collect();

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn match_host(&self, hostname: &str) -> Option<RuleAction> {
        self.entries
            .iter()
            .find(|(pattern, _)| pattern.is_match(hostname))
            .map(|(_, action)| *action)
    }

    pub fn effective_action(&self, hostname: &str, default_rule: RuleAction) -> RuleAction {
        self.match_host(hostname).unwrap_or(default_rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(domain: &str, action: RuleAction) -> Rule {
        Rule::new(domain, action)
    }

    #[test]
    fn test_star_matches_everything() {
        for host in ["example.com", "a.b.c", "", "localhost", "192.168.0.1"] {
            assert!(matches_glob(host, "*"));
        }
    }

    #[test]
    fn test_exact_match() {
        for host in ["example.com", "a+b.test", "x?y", "[::1]"] {
            assert!(matches_glob(host, host));
        }
    }

    #[test]
    fn test_subdomain_wildcard() {
        assert!(matches_glob("sub.example.com", "*.example.com"));
        assert!(!matches_glob("example.com", "*.example.com"));
    }

    #[test]
    fn test_first_match_wins() {
        let rules = vec![
            rule("*.example.com", RuleAction::Allow),
            rule("evil.example.com", RuleAction::Block),
        ];
        assert_eq!(
            match_rule("evil.example.com", &rules),
            Some(RuleAction::Allow)
        );
    }

    #[test]
    fn test_empty_rules() {
        assert_eq!(match_rule("example.com", &[]), None);
        assert_eq!(match_rule("", &[]), None);
    }

    #[test]
    fn test_effective_action_fallback() {
        let rules = vec![rule("meet.example.com", RuleAction::Allow)];
        assert_eq!(
            effective_action("meet.example.com", &rules, RuleAction::Block),
            RuleAction::Allow
        );
        assert_eq!(
            effective_action("other.test", &rules, RuleAction::Block),
            RuleAction::Block
        );
        assert_eq!(
            effective_action("other.test", &rules, RuleAction::Allow),
            RuleAction::Allow
        );
    }

    #[test]
    fn test_page_decision() {
        let settings = Settings::default();
        let rules = vec![rule("*.call.test", RuleAction::Allow)];

        assert_eq!(
            page_decision("app.call.test", &rules, &settings),
            PageDecision::Skip
        );
        // Default rule is block
        assert_eq!(
            page_decision("news.test", &rules, &settings),
            PageDecision::Inject
        );
    }

    #[test]
    fn test_hostname_of() {
        assert_eq!(
            hostname_of("https://trusted.example.com/page?x=1").unwrap(),
            "trusted.example.com"
        );
        assert!(matches!(
            hostname_of("not a url"),
            Err(PrivacyError::InvalidUrl(_))
        ));
        assert_eq!(hostname_of("about:blank").unwrap(), "");
        assert_eq!(hostname_of("HTTPS://Meet.Example.COM").unwrap(), "meet.example.com");
    }

    #[test]
    fn test_compiled_rules_agree() {
        let rules = vec![
            rule("*.example.com", RuleAction::Allow),
            rule("evil.example.com", RuleAction::Block),
            rule("b?d.test", RuleAction::Block),
        ];
        let compiled = CompiledRules::new(&rules);
        assert_eq!(compiled.len(), 3);

        for host in ["evil.example.com", "bad.test", "bd.test", "example.com", ""] {
            assert_eq!(compiled.match_host(host), match_rule(host, &rules), "{host}");
        }
        assert_eq!(
            compiled.effective_action("nowhere.test", RuleAction::Allow),
            RuleAction::Allow
        );
    }
}
