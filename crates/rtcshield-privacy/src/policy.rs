//! Policy data model
//!
//! Persisted shape (JSON, camelCase keys):
//! ```text
//! settings: { globalPolicy, defaultRule, showIconBadge }
//! rules:    [{ id, domain, action, note?, timestamp }]
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PrivacyError;

/// Browser-wide WebRTC IP handling policy.
///
/// Ordered from least to most restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalPolicy {
    /// Browser default, RTC may use every interface
    Default,
    /// Hide private addresses
    DefaultPublicInterfaceOnly,
    /// Force RTC traffic through the proxy
    DisableNonProxiedUdp,
}

impl GlobalPolicy {
    /// The value used while an explicitly allowed origin is active
    pub const LEAST_RESTRICTIVE: GlobalPolicy = GlobalPolicy::Default;

    pub fn as_str(&self) -> &'static str {
        match self {
            GlobalPolicy::Default => "default",
            GlobalPolicy::DefaultPublicInterfaceOnly => "default_public_interface_only",
            GlobalPolicy::DisableNonProxiedUdp => "disable_non_proxied_udp",
        }
    }
}

impl Default for GlobalPolicy {
    fn default() -> Self {
        GlobalPolicy::DefaultPublicInterfaceOnly
    }
}

impl std::fmt::Display for GlobalPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for GlobalPolicy {
    type Err = PrivacyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(GlobalPolicy::Default),
            "default_public_interface_only" => Ok(GlobalPolicy::DefaultPublicInterfaceOnly),
            "disable_non_proxied_udp" => Ok(GlobalPolicy::DisableNonProxiedUdp),
            _ => Err(PrivacyError::UnknownValue(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Block,
}

impl RuleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAction::Allow => "allow",
            RuleAction::Block => "block",
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, RuleAction::Block)
    }
}

impl std::fmt::Display for RuleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RuleAction {
    type Err = PrivacyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "allow" => Ok(RuleAction::Allow),
            "block" => Ok(RuleAction::Block),
            _ => Err(PrivacyError::UnknownValue(s.to_string())),
        }
    }
}

/// A user-defined site rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique identifier
    pub id: String,
    /// Glob pattern matched against the hostname
    pub domain: String,
    pub action: RuleAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Creation time, milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl Rule {
    pub fn new(domain: impl Into<String>, action: RuleAction) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            domain: domain.into(),
            action,
            note: None,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub global_policy: GlobalPolicy,
    /// Action for hostnames no rule matches
    pub default_rule: RuleAction,
    pub show_icon_badge: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            global_policy: GlobalPolicy::DefaultPublicInterfaceOnly,
            default_rule: RuleAction::Block,
            show_icon_badge: true,
        }
    }
}

impl Settings {
    /// Merge a partial update into these settings
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(policy) = patch.global_policy {
            self.global_policy = policy;
        }
        if let Some(rule) = patch.default_rule {
            self.default_rule = rule;
        }
        if let Some(show) = patch.show_icon_badge {
            self.show_icon_badge = show;
        }
    }
}

/// Partial settings update, unset fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub global_policy: Option<GlobalPolicy>,
    pub default_rule: Option<RuleAction>,
    pub show_icon_badge: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(
            settings.global_policy,
            GlobalPolicy::DefaultPublicInterfaceOnly
        );
        assert_eq!(settings.default_rule, RuleAction::Block);
        assert!(settings.show_icon_badge);
    }

    #[test]
    fn test_persisted_shape() {
        let json = r#"{"globalPolicy":"disable_non_proxied_udp","defaultRule":"allow","showIconBadge":false}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.global_policy, GlobalPolicy::DisableNonProxiedUdp);
        assert_eq!(settings.default_rule, RuleAction::Allow);
        assert!(!settings.show_icon_badge);

        // Missing keys fall back to defaults
        let partial: Settings = serde_json::from_str(r#"{"defaultRule":"allow"}"#).unwrap();
        assert_eq!(
            partial.global_policy,
            GlobalPolicy::DefaultPublicInterfaceOnly
        );
        assert!(partial.show_icon_badge);
    }

    #[test]
    fn test_rule_serialization() {
        let rule = Rule::new("*.example.com", RuleAction::Allow);
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["action"], "allow");
        assert!(json.get("note").is_none());

        let noted = rule.with_note("video calls");
        let json = serde_json::to_value(&noted).unwrap();
        assert_eq!(json["note"], "video calls");
    }

    #[test]
    fn test_apply_patch() {
        let mut settings = Settings::default();
        settings.apply(SettingsPatch {
            global_policy: Some(GlobalPolicy::DisableNonProxiedUdp),
            ..Default::default()
        });
        assert_eq!(settings.global_policy, GlobalPolicy::DisableNonProxiedUdp);
        assert_eq!(settings.default_rule, RuleAction::Block);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "disable_non_proxied_udp".parse::<GlobalPolicy>().unwrap(),
            GlobalPolicy::DisableNonProxiedUdp
        );
        assert!("proxy".parse::<GlobalPolicy>().is_err());
    }
}
