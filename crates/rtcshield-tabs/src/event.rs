//! Browser events that can change the active origin

use serde::{Deserialize, Serialize};

use crate::state::LoadStatus;
use crate::tab::{TabId, TabInfo, WindowId};

/// Fields reported as changed by a tab update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabChange {
    pub url: Option<String>,
    pub status: Option<LoadStatus>,
}

impl TabChange {
    /// Navigated or finished loading
    pub fn is_navigation(&self) -> bool {
        self.url.is_some() || self.status.is_some_and(|s| s.is_complete())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrowserEvent {
    /// Process start
    Started,
    /// The enforcement capability was re-initialized, its value is unknown
    CapabilityReinitialized,
    TabActivated {
        tab_id: TabId,
        window_id: WindowId,
    },
    TabUpdated {
        tab_id: TabId,
        change: TabChange,
        tab: TabInfo,
    },
    /// `None` when focus left every browser window
    WindowFocusChanged { window_id: Option<WindowId> },
}
