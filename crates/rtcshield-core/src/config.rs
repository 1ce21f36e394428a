//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the policy database
    pub database_path: PathBuf,
    /// Relax the global policy while an allowed origin is active
    pub allow_override: bool,
    /// Queue a startup reconciliation as soon as the engine starts
    pub reconcile_on_startup: bool,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            database_path: data_dir.join("rtcshield.db"),
            allow_override: true,
            reconcile_on_startup: true,
        }
    }

    /// Read a JSON config file, missing keys take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("RTCShield"))
            .unwrap_or_else(|| PathBuf::from(".rtcshield"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new(PathBuf::from("/tmp/shield"));
        assert_eq!(config.database_path, PathBuf::from("/tmp/shield/rtcshield.db"));
        assert!(config.allow_override);
        assert!(config.reconcile_on_startup);
    }

    #[test]
    fn test_load_partial_file() {
        let path =
            std::env::temp_dir().join(format!("rtcshield-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"allow_override": false}"#).unwrap();

        let config = Config::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(!config.allow_override);
        assert!(config.reconcile_on_startup);
    }

    #[test]
    fn test_load_invalid_file() {
        let path = std::env::temp_dir().join(format!("rtcshield-bad-{}.json", std::process::id()));
        std::fs::write(&path, "allow_override = false").unwrap();

        let result = Config::load(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(CoreError::Config(_))));
    }
}
