//! RTC Shield Core
//!
//! Keeps the browser-wide WebRTC IP handling policy in line with the
//! active tab. Site rules can only relax a single global switch, so the
//! engine re-resolves the policy whenever the active origin, the settings
//! or the rules change, and writes the switch only when its value differs
//! from the last one applied.

mod config;
mod enforcement;
mod error;
mod shield;
mod synchronizer;
mod tracker;

pub use config::Config;
pub use enforcement::{EnforcementError, EnforcementSink, RecordingSink, UnavailableSink};
pub use error::{CoreError, SyncError};
pub use shield::Shield;
pub use synchronizer::{ReconcileOutcome, Synchronizer};
pub use tracker::{ContextTracker, StoreFeed, TrackerHandle, Trigger};

// Re-export the collaborating crates
pub use rtcshield_privacy::{
    effective_action, match_rule, matches_glob, page_decision, GlobalPolicy, PageDecision, Rule,
    RuleAction, Settings, SettingsPatch,
};
pub use rtcshield_storage::{
    AppState, MemoryPolicyStore, Meta, PolicyStore, SqlitePolicyStore, StorageError, StoreChange,
};
pub use rtcshield_tabs::{
    ActiveTabSource, BrowserEvent, LoadStatus, TabChange, TabError, TabId, TabInfo, TabRegistry,
    WindowId,
};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
