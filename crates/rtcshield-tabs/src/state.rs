//! Tab load status
//!
//! ```text
//! Loading
//!   ↓ load finished
//! Complete
//!   ↓ navigation
//! Loading
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    /// Navigation started, document not ready
    Loading,
    /// Document finished loading
    Complete,
}

impl LoadStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, LoadStatus::Complete)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStatus::Loading => "loading",
            LoadStatus::Complete => "complete",
        }
    }
}

impl std::fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LoadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "loading" => Ok(LoadStatus::Loading),
            "complete" => Ok(LoadStatus::Complete),
            _ => Err(format!("Unknown load status: {}", s)),
        }
    }
}
