//! Global policy synchronizer
//!
//! Resolves the single global policy value for an optional context URL
//! (the active tab) and writes it to the enforcement sink:
//!
//! 1. Start from `Settings.global_policy`
//! 2. If the context host matches an `allow` rule, relax to
//!    [`GlobalPolicy::LEAST_RESTRICTIVE`]; `block` or no match keep it
//! 3. Skip the write when the value equals the last applied one
//!
//! The applied value is cached on the instance, never shared globally.

use std::sync::Arc;

use rtcshield_privacy::{hostname_of, match_rule, GlobalPolicy, RuleAction};
use rtcshield_storage::PolicyStore;

use crate::enforcement::{EnforcementError, EnforcementSink};
use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The sink accepted a new value
    Applied(GlobalPolicy),
    /// The value was already applied, no write
    Unchanged(GlobalPolicy),
    /// The platform lacks the capability, nothing written
    SinkUnavailable(GlobalPolicy),
}

impl ReconcileOutcome {
    pub fn policy(&self) -> GlobalPolicy {
        match self {
            ReconcileOutcome::Applied(p)
            | ReconcileOutcome::Unchanged(p)
            | ReconcileOutcome::SinkUnavailable(p) => *p,
        }
    }
}

pub struct Synchronizer {
    store: Arc<dyn PolicyStore>,
    sink: Arc<dyn EnforcementSink>,
    /// Relax the global policy for explicitly allowed origins
    allow_override: bool,
    /// Last value the sink accepted
    applied: Option<GlobalPolicy>,
}

impl Synchronizer {
    pub fn new(store: Arc<dyn PolicyStore>, sink: Arc<dyn EnforcementSink>) -> Self {
        Self {
            store,
            sink,
            allow_override: true,
            applied: None,
        }
    }

    pub fn with_override(mut self, enabled: bool) -> Self {
        self.allow_override = enabled;
        self
    }

    pub fn applied(&self) -> Option<GlobalPolicy> {
        self.applied
    }

    /// Forget the applied value, the next reconcile always writes
    pub fn reset(&mut self) {
        self.applied = None;
    }

    /// Compute the policy for a context without touching the sink
    pub async fn resolve(&self, context_url: Option<&str>) -> Result<GlobalPolicy, SyncError> {
        let settings = self.store.get_settings().await?;
        let global = settings.global_policy;

        let Some(url) = context_url else {
            return Ok(global);
        };
        if !self.allow_override {
            return Ok(global);
        }

        let hostname = match hostname_of(url) {
            Ok(hostname) => hostname,
            Err(e) => {
                tracing::warn!(
                    context = %url,
                    error = %e,
                    "Invalid context URL, using global policy"
                );
                return Ok(global);
            }
        };

        let rules = self.store.get_rules().await?;
        match match_rule(&hostname, &rules) {
            Some(RuleAction::Allow) => {
                tracing::info!(hostname = %hostname, "Domain allowed, relaxing global policy");
                Ok(GlobalPolicy::LEAST_RESTRICTIVE)
            }
            _ => Ok(global),
        }
    }

    /// Resolve the policy for `context_url` and apply it if it changed
    pub async fn reconcile(
        &mut self,
        context_url: Option<&str>,
    ) -> Result<ReconcileOutcome, SyncError> {
        let policy = self.resolve(context_url).await?;

        if self.applied == Some(policy) {
            tracing::debug!(policy = %policy, "Global policy already applied");
            return Ok(ReconcileOutcome::Unchanged(policy));
        }

        tracing::info!(
            policy = %policy,
            context = context_url.unwrap_or("global"),
            "Applying global policy"
        );

        match self.sink.set_global_policy(policy).await {
            Ok(()) => {
                self.applied = Some(policy);
                Ok(ReconcileOutcome::Applied(policy))
            }
            Err(EnforcementError::Unavailable) => {
                tracing::warn!(policy = %policy, "WebRTC IP handling policy API not available");
                Ok(ReconcileOutcome::SinkUnavailable(policy))
            }
            Err(EnforcementError::Rejected(reason)) => {
                tracing::error!(policy = %policy, reason = %reason, "Failed to set global policy");
                Err(SyncError::EnforcementRejected { policy, reason })
            }
        }
    }
}
