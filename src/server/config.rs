//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::capture::{BusyPolicy, CaptureConfig};
use crate::device::{RediscoveryPolicy, RegistryConfig};
use crate::session::SessionConfig;

/// Default HTTP/WebSocket port
pub const DEFAULT_PORT: u16 = 8080;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Device discovery options
    pub registry: RegistryConfig,

    /// Capture gateway options
    pub capture: CaptureConfig,

    /// Live view options
    pub session: SessionConfig,

    /// Periodic rediscovery (None = discover once at startup)
    pub rediscover_interval: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            registry: RegistryConfig::default(),
            capture: CaptureConfig::default(),
            session: SessionConfig::default(),
            rediscover_interval: None,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the live view frame interval
    pub fn frame_interval(mut self, interval: Duration) -> Self {
        self.session.frame_interval = interval;
        self
    }

    /// Set the per-client event buffer
    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.session = self.session.event_buffer(capacity);
        self
    }

    /// Set the driver capture timeout
    pub fn capture_timeout(mut self, timeout: Duration) -> Self {
        self.capture.timeout = timeout;
        self
    }

    /// Set still-capture contention handling
    pub fn busy_policy(mut self, policy: BusyPolicy) -> Self {
        self.capture.busy_policy = policy;
        self
    }

    /// Set the enumeration timeout
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.registry.discovery_timeout = timeout;
        self
    }

    /// Set how rediscovery treats a manual selection
    pub fn rediscovery(mut self, policy: RediscoveryPolicy) -> Self {
        self.registry.rediscovery = policy;
        self
    }

    /// Rediscover devices on a fixed interval
    pub fn rediscover_every(mut self, interval: Duration) -> Self {
        self.rediscover_interval = Some(interval);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(config.session.frame_interval, Duration::from_millis(100));
        assert_eq!(config.capture.busy_policy, BusyPolicy::Queue);
        assert_eq!(config.registry.rediscovery, RediscoveryPolicy::PreserveManual);
        assert!(config.rediscover_interval.is_none());
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr, addr);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:8081".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .frame_interval(Duration::from_millis(250))
            .event_buffer(4)
            .capture_timeout(Duration::from_secs(3))
            .busy_policy(BusyPolicy::Reject)
            .discovery_timeout(Duration::from_secs(2))
            .rediscovery(RediscoveryPolicy::AlwaysReapply)
            .rediscover_every(Duration::from_secs(30));

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.session.frame_interval, Duration::from_millis(250));
        assert_eq!(config.session.event_buffer, 4);
        assert_eq!(config.capture.timeout, Duration::from_secs(3));
        assert_eq!(config.capture.busy_policy, BusyPolicy::Reject);
        assert_eq!(config.registry.discovery_timeout, Duration::from_secs(2));
        assert_eq!(config.registry.rediscovery, RediscoveryPolicy::AlwaysReapply);
        assert_eq!(config.rediscover_interval, Some(Duration::from_secs(30)));
    }
}
