//! Engine bootstrap
//!
//! Wires the policy store, the enforcement sink and the tab source into a
//! running context tracker.

use std::sync::Arc;
use tokio::task::JoinHandle;

use rtcshield_privacy::GlobalPolicy;
use rtcshield_storage::{Backend, Database, PolicyStore, SqlitePolicyStore, StateStore};
use rtcshield_tabs::{ActiveTabSource, BrowserEvent};

use crate::config::Config;
use crate::enforcement::EnforcementSink;
use crate::error::CoreError;
use crate::synchronizer::Synchronizer;
use crate::tracker::{ContextTracker, StoreFeed, TrackerHandle, Trigger};
use crate::Result;

/// Running policy engine
pub struct Shield<B: Backend = Database> {
    config: Config,
    store: Arc<StateStore<B>>,
    tracker: TrackerHandle,
    task: JoinHandle<Synchronizer>,
    feed: StoreFeed,
}

impl Shield<Database> {
    /// Open the configured database and start the engine.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: Config,
        sink: Arc<dyn EnforcementSink>,
        tabs: Arc<dyn ActiveTabSource>,
    ) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let store = SqlitePolicyStore::open(&config.database_path)?;
        Self::with_store(config, Arc::new(store), sink, tabs)
    }
}

impl<B: Backend> Shield<B> {
    /// Start the engine over an existing store
    pub fn with_store(
        config: Config,
        store: Arc<StateStore<B>>,
        sink: Arc<dyn EnforcementSink>,
        tabs: Arc<dyn ActiveTabSource>,
    ) -> Result<Self> {
        store.initialize()?;

        let synchronizer =
            Synchronizer::new(store.clone(), sink).with_override(config.allow_override);
        let (tracker, task) = ContextTracker::new(synchronizer, tabs).spawn();
        let feed = tracker.follow_store(store.subscribe());

        if config.reconcile_on_startup {
            tracker.send(Trigger::Startup)?;
        }

        tracing::info!(
            database = %config.database_path.display(),
            allow_override = config.allow_override,
            "RTC Shield started"
        );

        Ok(Self {
            config,
            store,
            tracker,
            task,
            feed,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Store for settings and rule writes
    pub fn store(&self) -> &Arc<StateStore<B>> {
        &self.store
    }

    pub fn tracker(&self) -> &TrackerHandle {
        &self.tracker
    }

    /// Queue a browser event
    pub fn dispatch(&self, event: BrowserEvent) -> Result<()> {
        self.tracker.dispatch(event)
    }

    /// Wait for queued triggers, return the applied policy
    pub async fn settle(&self) -> Result<Option<GlobalPolicy>> {
        self.tracker.flush().await
    }

    /// Drain the queue and stop, returning the last applied policy.
    ///
    /// Store writes made before this call are still applied.
    pub async fn shutdown(self) -> Result<Option<GlobalPolicy>> {
        self.feed.stop().await;
        self.tracker.shutdown();

        let synchronizer = self.task.await.map_err(|_| CoreError::TrackerStopped)?;

        tracing::info!("RTC Shield stopped");
        Ok(synchronizer.applied())
    }
}
