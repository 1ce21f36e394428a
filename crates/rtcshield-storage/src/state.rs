//! Persisted state documents and change notifications

use chrono::Utc;
use serde::{Deserialize, Serialize};

use rtcshield_privacy::{Rule, Settings};

pub(crate) const STATE_VERSION: u32 = 1;

/// Bookkeeping updated on every settings or rules write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub version: u32,
    /// Milliseconds since the Unix epoch
    pub last_modified: i64,
}

impl Meta {
    pub fn new() -> Self {
        Self {
            version: STATE_VERSION,
            last_modified: Utc::now().timestamp_millis(),
        }
    }

    /// Copy of this record stamped with the current time
    pub fn touched(&self) -> Self {
        Self {
            version: self.version,
            last_modified: Utc::now().timestamp_millis().max(self.last_modified),
        }
    }
}

impl Default for Meta {
    fn default() -> Self {
        Self::new()
    }
}

/// Whole-store document, the unit of export and import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub settings: Settings,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_filters: Option<String>,
    #[serde(default)]
    pub meta: Meta,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            rules: Vec::new(),
            user_filters: None,
            meta: Meta::new(),
        }
    }
}

/// Which persisted records a write touched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreChange {
    pub settings: bool,
    pub rules: bool,
    pub user_filters: bool,
}

impl StoreChange {
    pub const SETTINGS: StoreChange = StoreChange {
        settings: true,
        rules: false,
        user_filters: false,
    };

    pub const RULES: StoreChange = StoreChange {
        settings: false,
        rules: true,
        user_filters: false,
    };

    pub const USER_FILTERS: StoreChange = StoreChange {
        settings: false,
        rules: false,
        user_filters: true,
    };

    pub const ALL: StoreChange = StoreChange {
        settings: true,
        rules: true,
        user_filters: true,
    };

    /// True when the change can alter the effective policy
    pub fn affects_policy(&self) -> bool {
        self.settings || self.rules
    }

    pub fn union(self, other: StoreChange) -> StoreChange {
        StoreChange {
            settings: self.settings || other.settings,
            rules: self.rules || other.rules,
            user_filters: self.user_filters || other.user_filters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affects_policy() {
        assert!(StoreChange::SETTINGS.affects_policy());
        assert!(StoreChange::RULES.affects_policy());
        assert!(!StoreChange::USER_FILTERS.affects_policy());
        assert!(!StoreChange::default().affects_policy());
        assert_eq!(
            StoreChange::SETTINGS.union(StoreChange::RULES),
            StoreChange {
                settings: true,
                rules: true,
                user_filters: false
            }
        );
    }

    #[test]
    fn test_app_state_shape() {
        let json = r#"{
            "settings": {"globalPolicy": "default", "defaultRule": "block", "showIconBadge": true},
            "rules": [{"id": "r1", "domain": "*.meet.test", "action": "allow", "timestamp": 1700000000000}],
            "meta": {"version": 1, "lastModified": 1700000000000}
        }"#;

        let state: AppState = serde_json::from_str(json).unwrap();
        assert_eq!(state.rules.len(), 1);
        assert_eq!(state.rules[0].note, None);
        assert_eq!(state.meta.last_modified, 1_700_000_000_000);
        assert!(state.user_filters.is_none());
    }
}
