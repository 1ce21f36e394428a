//! Policy store
//!
//! The reconciliation engine consumes [`PolicyStore`]: reads plus a change
//! feed. Writers (rule editor, import, tests) use the inherent methods on
//! [`StateStore`]; every write bumps `meta.lastModified` and broadcasts a
//! [`StoreChange`] to all subscribers.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::sync::broadcast;

use rtcshield_privacy::{Rule, Settings, SettingsPatch};

use crate::backend::{Backend, MemoryBackend};
use crate::database::Database;
use crate::state::{AppState, Meta, StoreChange};
use crate::Result;

const KEY_SETTINGS: &str = "settings";
const KEY_RULES: &str = "rules";
const KEY_META: &str = "meta";
const KEY_USER_FILTERS: &str = "userFilters";

const CHANGE_CAPACITY: usize = 64;

/// Read side of the persisted policy state
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Current settings, defaults when none were written yet
    async fn get_settings(&self) -> Result<Settings>;

    /// Ordered rule list, empty when none were written yet
    async fn get_rules(&self) -> Result<Vec<Rule>>;

    /// Feed of change notifications, one per write
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// Policy state over a key/value backend
pub struct StateStore<B: Backend> {
    backend: B,
    changes: broadcast::Sender<StoreChange>,
}

pub type MemoryPolicyStore = StateStore<MemoryBackend>;
pub type SqlitePolicyStore = StateStore<Database>;

impl StateStore<MemoryBackend> {
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }
}

impl StateStore<Database> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }
}

impl<B: Backend> StateStore<B> {
    pub fn new(backend: B) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self { backend, changes }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Write the default state if no settings exist yet.
    ///
    /// Returns true when defaults were written.
    pub fn initialize(&self) -> Result<bool> {
        if self.backend.get(KEY_SETTINGS)?.is_some() {
            return Ok(false);
        }

        let state = AppState::default();
        self.backend.put_all(&[
            (KEY_SETTINGS, serde_json::to_string(&state.settings)?),
            (KEY_RULES, serde_json::to_string(&state.rules)?),
            (KEY_META, serde_json::to_string(&state.meta)?),
        ])?;

        tracing::info!(
            global_policy = %state.settings.global_policy,
            default_rule = %state.settings.default_rule,
            "Initialized policy store with defaults"
        );

        self.notify(StoreChange::SETTINGS.union(StoreChange::RULES));
        Ok(true)
    }

    pub fn settings(&self) -> Result<Settings> {
        Ok(self.read(KEY_SETTINGS)?.unwrap_or_default())
    }

    pub fn rules(&self) -> Result<Vec<Rule>> {
        Ok(self.read(KEY_RULES)?.unwrap_or_default())
    }

    pub fn user_filters(&self) -> Result<Option<String>> {
        self.read(KEY_USER_FILTERS)
    }

    pub fn meta(&self) -> Result<Meta> {
        Ok(self.read(KEY_META)?.unwrap_or_default())
    }

    pub fn set_settings(&self, settings: &Settings) -> Result<()> {
        let meta = self.meta()?.touched();
        self.backend.put_all(&[
            (KEY_SETTINGS, serde_json::to_string(settings)?),
            (KEY_META, serde_json::to_string(&meta)?),
        ])?;

        tracing::debug!(global_policy = %settings.global_policy, "Settings saved");
        self.notify(StoreChange::SETTINGS);
        Ok(())
    }

    /// Merge a partial update into the stored settings
    pub fn update_settings(&self, patch: SettingsPatch) -> Result<Settings> {
        let mut settings = self.settings()?;
        settings.apply(patch);
        self.set_settings(&settings)?;
        Ok(settings)
    }

    pub fn set_rules(&self, rules: &[Rule]) -> Result<()> {
        let meta = self.meta()?.touched();
        self.backend.put_all(&[
            (KEY_RULES, serde_json::to_string(rules)?),
            (KEY_META, serde_json::to_string(&meta)?),
        ])?;

        tracing::debug!(count = rules.len(), "Rules saved");
        self.notify(StoreChange::RULES);
        Ok(())
    }

    pub fn set_user_filters(&self, filters: &str) -> Result<()> {
        self.backend
            .put_all(&[(KEY_USER_FILTERS, serde_json::to_string(filters)?)])?;
        self.notify(StoreChange::USER_FILTERS);
        Ok(())
    }

    pub fn export_state(&self) -> Result<AppState> {
        Ok(AppState {
            settings: self.settings()?,
            rules: self.rules()?,
            user_filters: self.user_filters()?,
            meta: self.meta()?,
        })
    }

    /// Replace the stored state with an exported document
    pub fn import_state(&self, state: &AppState) -> Result<()> {
        let meta = state.meta.touched();
        let mut entries = vec![
            (KEY_SETTINGS, serde_json::to_string(&state.settings)?),
            (KEY_RULES, serde_json::to_string(&state.rules)?),
            (KEY_META, serde_json::to_string(&meta)?),
        ];
        let mut change = StoreChange::SETTINGS.union(StoreChange::RULES);
        if let Some(filters) = &state.user_filters {
            entries.push((KEY_USER_FILTERS, serde_json::to_string(filters)?));
            change = StoreChange::ALL;
        }
        self.backend.put_all(&entries)?;

        tracing::info!(rules = state.rules.len(), "Imported policy state");
        self.notify(change);
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.backend.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn notify(&self, change: StoreChange) {
        // No subscribers is fine
        let _ = self.changes.send(change);
    }
}

#[async_trait]
impl<B: Backend> PolicyStore for StateStore<B> {
    async fn get_settings(&self) -> Result<Settings> {
        self.settings()
    }

    async fn get_rules(&self) -> Result<Vec<Rule>> {
        self.rules()
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtcshield_privacy::{GlobalPolicy, RuleAction};

    #[tokio::test]
    async fn test_defaults_when_empty() {
        let store = MemoryPolicyStore::in_memory();
        assert_eq!(store.get_settings().await.unwrap(), Settings::default());
        assert!(store.get_rules().await.unwrap().is_empty());
    }

    #[test]
    fn test_initialize_once() {
        let store = MemoryPolicyStore::in_memory();
        assert!(store.initialize().unwrap());

        store
            .update_settings(SettingsPatch {
                global_policy: Some(GlobalPolicy::DisableNonProxiedUdp),
                ..Default::default()
            })
            .unwrap();

        // A second run must not clobber user settings
        assert!(!store.initialize().unwrap());
        assert_eq!(
            store.settings().unwrap().global_policy,
            GlobalPolicy::DisableNonProxiedUdp
        );
    }

    #[tokio::test]
    async fn test_writes_notify_subscribers() {
        let store = MemoryPolicyStore::in_memory();
        let mut rx = store.subscribe();

        store.set_settings(&Settings::default()).unwrap();
        store
            .set_rules(&[Rule::new("*.meet.test", RuleAction::Allow)])
            .unwrap();
        store.set_user_filters("||ads.test^").unwrap();

        assert_eq!(rx.recv().await.unwrap(), StoreChange::SETTINGS);
        assert_eq!(rx.recv().await.unwrap(), StoreChange::RULES);
        assert_eq!(rx.recv().await.unwrap(), StoreChange::USER_FILTERS);
    }

    #[test]
    fn test_writes_touch_meta() {
        let store = MemoryPolicyStore::in_memory();
        store.initialize().unwrap();
        let before = store.meta().unwrap();

        store
            .set_rules(&[Rule::new("a.test", RuleAction::Block)])
            .unwrap();
        let after = store.meta().unwrap();

        assert_eq!(after.version, before.version);
        assert!(after.last_modified >= before.last_modified);
    }

    #[test]
    fn test_rule_order_preserved() {
        let store = SqlitePolicyStore::new(Database::open_in_memory().unwrap());
        let rules = vec![
            Rule::new("*.example.com", RuleAction::Allow),
            Rule::new("evil.example.com", RuleAction::Block),
            Rule::new("*", RuleAction::Block).with_note("catch-all"),
        ];
        store.set_rules(&rules).unwrap();

        assert_eq!(store.rules().unwrap(), rules);
    }

    #[test]
    fn test_export_import() {
        let source = SqlitePolicyStore::new(Database::open_in_memory().unwrap());
        source.initialize().unwrap();
        source
            .set_rules(&[Rule::new("meet.test", RuleAction::Allow)])
            .unwrap();
        source.set_user_filters("custom").unwrap();

        let exported = source.export_state().unwrap();
        let json = serde_json::to_string(&exported).unwrap();

        let target = MemoryPolicyStore::in_memory();
        let mut rx = target.subscribe();
        target
            .import_state(&serde_json::from_str(&json).unwrap())
            .unwrap();

        assert_eq!(rx.try_recv().unwrap(), StoreChange::ALL);
        assert_eq!(target.rules().unwrap(), exported.rules);
        assert_eq!(target.settings().unwrap(), exported.settings);
        assert_eq!(target.user_filters().unwrap().as_deref(), Some("custom"));
    }

    #[test]
    fn test_corrupt_record_is_an_error() {
        let backend = MemoryBackend::new();
        backend
            .put_all(&[(KEY_SETTINGS, "{not json".to_string())])
            .unwrap();
        let store = StateStore::new(backend);

        assert!(matches!(
            store.settings(),
            Err(crate::StorageError::Json(_))
        ));
    }
}
