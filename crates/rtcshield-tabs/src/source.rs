//! Active tab lookup

use async_trait::async_trait;

use crate::tab::{TabInfo, WindowId};
use crate::Result;

/// Resolves which tab the user is currently looking at
#[async_trait]
pub trait ActiveTabSource: Send + Sync {
    /// Active tab of `window`, or of the focused window when `None`.
    ///
    /// `Ok(None)` means there is no such tab (no focused window, empty window).
    async fn active_tab(&self, window: Option<WindowId>) -> Result<Option<TabInfo>>;
}
