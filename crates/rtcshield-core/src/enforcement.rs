//! Global enforcement switch
//!
//! The browser exposes one process-wide WebRTC IP handling value. Writing
//! it is visible to every tab, so callers de-duplicate before writing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use rtcshield_privacy::GlobalPolicy;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnforcementError {
    /// The platform has no such switch
    #[error("Enforcement capability unavailable")]
    Unavailable,

    #[error("Platform error: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait EnforcementSink: Send + Sync {
    /// Write the global policy. Repeating the current value is harmless.
    async fn set_global_policy(&self, policy: GlobalPolicy) -> Result<(), EnforcementError>;
}

/// Sink for platforms without the capability
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSink;

#[async_trait]
impl EnforcementSink for UnavailableSink {
    async fn set_global_policy(&self, _policy: GlobalPolicy) -> Result<(), EnforcementError> {
        Err(EnforcementError::Unavailable)
    }
}

#[derive(Default)]
struct Recorded {
    writes: Vec<GlobalPolicy>,
    current: Option<GlobalPolicy>,
    failure: Option<EnforcementError>,
}

/// In-memory sink that records every write.
///
/// Can be told to fail or to take time, which makes it the stand-in for the
/// browser switch in hosts without one and in tests.
#[derive(Clone, Default)]
pub struct RecordingSink {
    recorded: Arc<Mutex<Recorded>>,
    latency: Option<Duration>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every write by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make subsequent writes fail with `error`, or succeed again with `None`
    pub fn fail_with(&self, error: Option<EnforcementError>) {
        self.recorded.lock().failure = error;
    }

    /// Successful writes, oldest first
    pub fn writes(&self) -> Vec<GlobalPolicy> {
        self.recorded.lock().writes.clone()
    }

    /// Value the switch currently holds
    pub fn current(&self) -> Option<GlobalPolicy> {
        self.recorded.lock().current
    }
}

#[async_trait]
impl EnforcementSink for RecordingSink {
    async fn set_global_policy(&self, policy: GlobalPolicy) -> Result<(), EnforcementError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut recorded = self.recorded.lock();
        if let Some(error) = recorded.failure.clone() {
            return Err(error);
        }
        recorded.writes.push(policy);
        recorded.current = Some(policy);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_sink() {
        let sink = RecordingSink::new();
        sink.set_global_policy(GlobalPolicy::Default).await.unwrap();

        sink.fail_with(Some(EnforcementError::Rejected("policy locked".into())));
        assert!(sink
            .set_global_policy(GlobalPolicy::DisableNonProxiedUdp)
            .await
            .is_err());

        sink.fail_with(None);
        sink.set_global_policy(GlobalPolicy::DisableNonProxiedUdp)
            .await
            .unwrap();

        assert_eq!(
            sink.writes(),
            vec![GlobalPolicy::Default, GlobalPolicy::DisableNonProxiedUdp]
        );
        assert_eq!(sink.current(), Some(GlobalPolicy::DisableNonProxiedUdp));
    }

    #[tokio::test]
    async fn test_unavailable_sink() {
        assert_eq!(
            UnavailableSink.set_global_policy(GlobalPolicy::Default).await,
            Err(EnforcementError::Unavailable)
        );
    }
}
