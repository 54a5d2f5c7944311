//! Device registry configuration

use std::time::Duration;

/// What discovery does with an operator's explicit selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RediscoveryPolicy {
    /// Keep a manual selection while its port is still enumerated
    #[default]
    PreserveManual,
    /// Re-run the brand policy on every discovery
    AlwaysReapply,
}

/// Device registry configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Upper bound on one enumeration call
    pub discovery_timeout: Duration,

    /// Handling of manual selections across rediscovery
    pub rediscovery: RediscoveryPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            discovery_timeout: Duration::from_secs(15),
            rediscovery: RediscoveryPolicy::default(),
        }
    }
}

impl RegistryConfig {
    /// Set the enumeration timeout
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Set the rediscovery policy
    pub fn rediscovery(mut self, policy: RediscoveryPolicy) -> Self {
        self.rediscovery = policy;
        self
    }
}
