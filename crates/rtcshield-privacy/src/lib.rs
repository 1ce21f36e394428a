//! RTC Shield Privacy Rules
//!
//! Site rules decide how much RTC capability an origin gets:
//! - Rules are ordered; the first matching rule wins
//! - Unmatched hostnames fall back to the default rule
//! - An `allow` match relaxes the browser-wide IP handling policy
//!   while that origin is the active context
//!
//! The same matcher serves both the global policy synchronizer and the
//! per-page injection decision.

mod error;
mod glob;
mod policy;
mod rules;

pub use error::PrivacyError;
pub use glob::GlobPattern;
pub use policy::{GlobalPolicy, Rule, RuleAction, Settings, SettingsPatch};
pub use rules::{
    effective_action, hostname_of, match_rule, matches_glob, page_decision, CompiledRules,
    PageDecision,
};

pub type Result<T> = std::result::Result<T, PrivacyError>;
