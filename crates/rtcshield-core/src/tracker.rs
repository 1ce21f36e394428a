//! Context tracker
//!
//! Browser events and store changes fan in to one queue, drained by a
//! single task that owns the [`Synchronizer`]. Triggers run one at a time
//! in arrival order, each to completion, so the applied policy always
//! reflects the most recently finished trigger. A queued trigger may carry
//! stale context; the triggers queued behind it supersede its outcome.

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use rtcshield_privacy::GlobalPolicy;
use rtcshield_storage::StoreChange;
use rtcshield_tabs::{ActiveTabSource, BrowserEvent, TabChange, TabInfo, WindowId};

use crate::error::CoreError;
use crate::synchronizer::Synchronizer;
use crate::Result;

/// Something that may change which policy should be applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Process start: global policy first, then the active tab
    Startup,
    /// Enforcement capability re-initialized, its current value is unknown
    Reinitialize,
    /// A tab was selected in `window_id`
    TabActivated { window_id: WindowId },
    /// A tab navigated or finished loading
    TabUpdated { change: TabChange, tab: TabInfo },
    /// Focus moved to a window, or away from all windows
    WindowFocusChanged(Option<WindowId>),
    /// Persisted state was written
    StoreChanged(StoreChange),
}

impl From<BrowserEvent> for Trigger {
    fn from(event: BrowserEvent) -> Self {
        match event {
            BrowserEvent::Started => Trigger::Startup,
            BrowserEvent::CapabilityReinitialized => Trigger::Reinitialize,
            BrowserEvent::TabActivated { window_id, .. } => Trigger::TabActivated { window_id },
            BrowserEvent::TabUpdated { change, tab, .. } => Trigger::TabUpdated { change, tab },
            BrowserEvent::WindowFocusChanged { window_id } => {
                Trigger::WindowFocusChanged(window_id)
            }
        }
    }
}

enum Message {
    Trigger(Trigger),
    /// Barrier: answered once every earlier message is handled
    Flush(oneshot::Sender<Option<GlobalPolicy>>),
    Shutdown,
}

/// Cloneable sender side of the tracker queue
#[derive(Clone)]
pub struct TrackerHandle {
    tx: mpsc::UnboundedSender<Message>,
}

impl TrackerHandle {
    pub fn send(&self, trigger: Trigger) -> Result<()> {
        self.tx
            .send(Message::Trigger(trigger))
            .map_err(|_| CoreError::TrackerStopped)
    }

    pub fn dispatch(&self, event: BrowserEvent) -> Result<()> {
        self.send(event.into())
    }

    /// Wait until every trigger sent before this call has been handled.
    ///
    /// Returns the policy applied at that point.
    pub async fn flush(&self) -> Result<Option<GlobalPolicy>> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(Message::Flush(tx))
            .map_err(|_| CoreError::TrackerStopped)?;
        rx.await.map_err(|_| CoreError::TrackerStopped)
    }

    /// Stop accepting triggers; everything already queued still runs
    pub fn shutdown(&self) {
        let _ = self.tx.send(Message::Shutdown);
    }

    /// Forward store change notifications into the queue.
    ///
    /// The forwarder does not keep the tracker alive. It ends when the
    /// returned [`StoreFeed`] is stopped or dropped, when the store closes,
    /// or when the tracker stops.
    pub fn follow_store(&self, mut changes: broadcast::Receiver<StoreChange>) -> StoreFeed {
        let tx = self.tx.downgrade();
        let (stop, mut stopped) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stopped => {
                        // Hand over what was broadcast before the stop
                        loop {
                            let change = match changes.try_recv() {
                                Ok(change) => change,
                                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                                    lagged(skipped)
                                }
                                Err(_) => break,
                            };
                            if !forward(&tx, change) {
                                break;
                            }
                        }
                        break;
                    }
                    received = changes.recv() => {
                        let change = match received {
                            Ok(change) => change,
                            Err(broadcast::error::RecvError::Lagged(skipped)) => lagged(skipped),
                            Err(broadcast::error::RecvError::Closed) => break,
                        };
                        if !forward(&tx, change) {
                            break;
                        }
                    }
                }
            }
        });

        StoreFeed {
            stop: Some(stop),
            task,
        }
    }
}

fn lagged(skipped: u64) -> StoreChange {
    tracing::warn!(skipped, "Store change feed lagged");
    StoreChange::SETTINGS.union(StoreChange::RULES)
}

fn forward(tx: &mpsc::WeakUnboundedSender<Message>, change: StoreChange) -> bool {
    match tx.upgrade() {
        Some(tx) => tx
            .send(Message::Trigger(Trigger::StoreChanged(change)))
            .is_ok(),
        None => false,
    }
}

/// Running store change forwarder, stops when dropped
pub struct StoreFeed {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl StoreFeed {
    /// Forward the changes already broadcast, then stop
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!(error = %e, "Store change forwarder failed");
        }
    }
}

/// Single consumer of the trigger queue
pub struct ContextTracker {
    synchronizer: Synchronizer,
    tabs: Arc<dyn ActiveTabSource>,
}

impl ContextTracker {
    pub fn new(synchronizer: Synchronizer, tabs: Arc<dyn ActiveTabSource>) -> Self {
        Self { synchronizer, tabs }
    }

    /// Start the tracker task.
    ///
    /// The task ends once every [`TrackerHandle`] is dropped, or after
    /// [`TrackerHandle::shutdown`] once the triggers queued before and
    /// around it are handled. It hands back its synchronizer.
    pub fn spawn(self) -> (TrackerHandle, JoinHandle<Synchronizer>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(rx));
        (TrackerHandle { tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Message>) -> Synchronizer {
        tracing::debug!("Context tracker started");

        while let Some(message) = rx.recv().await {
            match message {
                Message::Trigger(trigger) => self.handle(trigger).await,
                Message::Flush(reply) => {
                    let _ = reply.send(self.synchronizer.applied());
                }
                Message::Shutdown => rx.close(),
            }
        }

        tracing::debug!("Context tracker stopped");
        self.synchronizer
    }

    async fn handle(&mut self, trigger: Trigger) {
        tracing::trace!(?trigger, "Handling trigger");

        match trigger {
            Trigger::Startup => {
                self.reconcile(None).await;
                self.reconcile_active(None).await;
            }
            Trigger::Reinitialize => {
                self.synchronizer.reset();
                self.reconcile(None).await;
                self.reconcile_active(None).await;
            }
            Trigger::TabActivated { window_id } => {
                self.reconcile_active(Some(window_id)).await;
            }
            Trigger::TabUpdated { change, tab } => {
                if change.is_navigation() && tab.active {
                    self.reconcile(tab.context_url()).await;
                }
            }
            Trigger::WindowFocusChanged(Some(window_id)) => {
                self.reconcile_active(Some(window_id)).await;
            }
            Trigger::WindowFocusChanged(None) => {}
            Trigger::StoreChanged(change) => {
                if change.affects_policy() {
                    self.reconcile_active(None).await;
                }
            }
        }
    }

    /// Look up the active tab and reconcile against it, or globally
    async fn reconcile_active(&mut self, window: Option<WindowId>) {
        let url = match self.tabs.active_tab(window).await {
            Ok(tab) => tab.and_then(|t| t.context_url().map(str::to_string)),
            Err(e) => {
                tracing::warn!(error = %e, "Error checking active tab");
                None
            }
        };

        self.reconcile(url.as_deref()).await;
    }

    async fn reconcile(&mut self, context_url: Option<&str>) {
        match self.synchronizer.reconcile(context_url).await {
            Ok(outcome) => tracing::trace!(?outcome, "Reconciled"),
            Err(e) => tracing::warn!(error = %e, "Reconciliation failed, waiting for next trigger"),
        }
    }
}
