//! In-memory tab registry
//!
//! Tracks windows, tabs and focus for hosts that drive the engine without
//! a browser tab API. Each mutation returns the event a browser would raise
//! for it, ready to hand to the context tracker.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::TabError;
use crate::event::{BrowserEvent, TabChange};
use crate::source::ActiveTabSource;
use crate::state::LoadStatus;
use crate::tab::{TabId, TabInfo, WindowId};
use crate::Result;

#[derive(Default)]
struct Inner {
    tabs: BTreeMap<TabId, TabInfo>,
    windows: BTreeSet<WindowId>,
    focused: Option<WindowId>,
    next_tab_id: u64,
}

impl Inner {
    fn tab_mut(&mut self, tab_id: TabId) -> Result<&mut TabInfo> {
        self.tabs.get_mut(&tab_id).ok_or(TabError::NotFound(tab_id))
    }

    fn active_in(&self, window_id: WindowId) -> Option<&TabInfo> {
        self.tabs
            .values()
            .find(|t| t.window_id == window_id && t.active)
    }
}

#[derive(Clone, Default)]
pub struct TabRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a window and give it focus
    pub fn open_window(&self, window_id: WindowId) -> BrowserEvent {
        let mut inner = self.inner.write();
        inner.windows.insert(window_id);
        inner.focused = Some(window_id);

        tracing::debug!(window_id = %window_id, "Opened window");

        BrowserEvent::WindowFocusChanged {
            window_id: Some(window_id),
        }
    }

    /// Open a background tab in `window_id`
    pub fn open_tab(&self, window_id: WindowId, url: impl Into<String>) -> Result<TabInfo> {
        let mut inner = self.inner.write();
        if !inner.windows.contains(&window_id) {
            return Err(TabError::WindowNotFound(window_id));
        }

        inner.next_tab_id += 1;
        let tab = TabInfo::new(TabId(inner.next_tab_id), window_id, url);
        inner.tabs.insert(tab.id, tab.clone());

        tracing::debug!(tab_id = %tab.id, window_id = %window_id, "Opened tab");

        Ok(tab)
    }

    pub fn get_tab(&self, tab_id: TabId) -> Result<TabInfo> {
        self.inner
            .read()
            .tabs
            .get(&tab_id)
            .cloned()
            .ok_or(TabError::NotFound(tab_id))
    }

    /// Select a tab within its window
    pub fn activate(&self, tab_id: TabId) -> Result<BrowserEvent> {
        let mut inner = self.inner.write();
        let window_id = inner.tab_mut(tab_id)?.window_id;

        for tab in inner.tabs.values_mut() {
            if tab.window_id == window_id {
                tab.active = tab.id == tab_id;
            }
        }

        Ok(BrowserEvent::TabActivated { tab_id, window_id })
    }

    /// Start a navigation in a tab
    pub fn navigate(&self, tab_id: TabId, url: impl Into<String>) -> Result<BrowserEvent> {
        let url = url.into();
        let mut inner = self.inner.write();
        let tab = inner.tab_mut(tab_id)?;
        tab.url = Some(url.clone());
        tab.status = LoadStatus::Loading;

        Ok(BrowserEvent::TabUpdated {
            tab_id,
            change: TabChange {
                url: Some(url),
                status: Some(LoadStatus::Loading),
            },
            tab: tab.clone(),
        })
    }

    /// Finish loading the current document of a tab
    pub fn complete_load(&self, tab_id: TabId) -> Result<BrowserEvent> {
        let mut inner = self.inner.write();
        let tab = inner.tab_mut(tab_id)?;
        tab.status = LoadStatus::Complete;

        Ok(BrowserEvent::TabUpdated {
            tab_id,
            change: TabChange {
                url: None,
                status: Some(LoadStatus::Complete),
            },
            tab: tab.clone(),
        })
    }

    /// Move focus to a window, or away from all of them
    pub fn focus_window(&self, window_id: Option<WindowId>) -> Result<BrowserEvent> {
        let mut inner = self.inner.write();
        if let Some(id) = window_id {
            if !inner.windows.contains(&id) {
                return Err(TabError::WindowNotFound(id));
            }
        }
        inner.focused = window_id;

        Ok(BrowserEvent::WindowFocusChanged { window_id })
    }

    pub fn close_tab(&self, tab_id: TabId) -> Result<()> {
        let mut inner = self.inner.write();
        inner
            .tabs
            .remove(&tab_id)
            .ok_or(TabError::NotFound(tab_id))?;

        tracing::debug!(tab_id = %tab_id, "Closed tab");

        Ok(())
    }

    pub fn focused_window(&self) -> Option<WindowId> {
        self.inner.read().focused
    }
}

#[async_trait]
impl ActiveTabSource for TabRegistry {
    async fn active_tab(&self, window: Option<WindowId>) -> Result<Option<TabInfo>> {
        let inner = self.inner.read();
        let window_id = match window.or(inner.focused) {
            Some(id) => id,
            None => return Ok(None),
        };

        if !inner.windows.contains(&window_id) {
            return Err(TabError::WindowNotFound(window_id));
        }

        Ok(inner.active_in(window_id).cloned())
    }
}
