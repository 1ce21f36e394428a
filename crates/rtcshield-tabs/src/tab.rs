//! Tab and window snapshots

use serde::{Deserialize, Serialize};

use crate::state::LoadStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u64);

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Point-in-time view of a browser tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    pub window_id: WindowId,
    /// Absent for privileged pages the extension cannot see
    pub url: Option<String>,
    /// Whether this is the selected tab of its window
    pub active: bool,
    pub status: LoadStatus,
}

impl TabInfo {
    pub fn new(id: TabId, window_id: WindowId, url: impl Into<String>) -> Self {
        Self {
            id,
            window_id,
            url: Some(url.into()),
            active: false,
            status: LoadStatus::Loading,
        }
    }

    pub fn active(mut self) -> Self {
        self.active = true;
        self
    }

    /// URL usable as policy context, empty strings count as missing
    pub fn context_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }
}
