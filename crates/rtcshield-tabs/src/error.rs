//! Tab error types

use thiserror::Error;

use crate::tab::{TabId, WindowId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TabError {
    #[error("Tab not found: {0}")]
    NotFound(TabId),

    #[error("Window not found: {0}")]
    WindowNotFound(WindowId),

    #[error("Tab lookup unavailable: {0}")]
    Unavailable(String),
}
