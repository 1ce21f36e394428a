//! RTC Shield Browser Context
//!
//! Models the parts of the browser the policy engine reacts to:
//! tabs, windows, which tab is active, and the events raised when
//! any of that changes.

mod error;
mod event;
mod registry;
mod source;
mod state;
mod tab;

pub use error::TabError;
pub use event::{BrowserEvent, TabChange};
pub use registry::TabRegistry;
pub use source::ActiveTabSource;
pub use state::LoadStatus;
pub use tab::{TabId, TabInfo, WindowId};

pub type Result<T> = std::result::Result<T, TabError>;
