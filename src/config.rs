//! Configuration for uwatch2
//!
//! Centralized client configuration with sensible defaults.

use std::time::Duration;

/// Environment variable consulted for the watch address when none is configured
pub const ADDRESS_ENV_VAR: &str = "UWATCH2_MAC";

/// What an in-flight query does when the link drops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisconnectPolicy {
    /// Mark the link as down and keep waiting for the response
    #[default]
    Continue,

    /// Fail the query with `WatchError::Disconnected`
    Abort,
}

/// Main configuration for a command client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -------------------------------------------------------------------------
    // Connection Configuration
    // -------------------------------------------------------------------------
    /// BLE address of the watch. When unset, `UWATCH2_MAC` is consulted and
    /// then the transport is asked to discover a device by name.
    pub address: Option<String>,

    /// Name substring used when discovering the watch
    pub scan_for_name: String,

    /// Connect (and reconnect) timeout
    pub connect_timeout: Duration,

    /// Ask the transport to re-establish the link on its own
    pub auto_reconnect: bool,

    // -------------------------------------------------------------------------
    // Command Pipeline Configuration
    // -------------------------------------------------------------------------
    /// Upper bound on the wait for a query response. `None` waits forever.
    pub response_timeout: Option<Duration>,

    /// Behavior of an in-flight query across a disconnect
    pub disconnect_policy: DisconnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: None,
            scan_for_name: "Uwatch2".to_string(),
            connect_timeout: Duration::from_secs(60),
            auto_reconnect: true,
            response_timeout: Some(Duration::from_secs(10)),
            disconnect_policy: DisconnectPolicy::Continue,
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Default config with the address taken from `UWATCH2_MAC`, if set
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.address = address_from_env();
        config
    }

    /// Address to connect to: the configured one, else `UWATCH2_MAC`
    pub fn resolve_address(&self) -> Option<String> {
        self.address.clone().or_else(address_from_env)
    }
}

fn address_from_env() -> Option<String> {
    std::env::var(ADDRESS_ENV_VAR)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the BLE address of the watch
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = Some(address.into());
        self
    }

    /// Set the name substring used for discovery
    pub fn scan_for_name(mut self, name: impl Into<String>) -> Self {
        self.config.scan_for_name = name.into();
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Enable or disable transport-level auto reconnect
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.config.auto_reconnect = enabled;
        self
    }

    /// Set the response timeout (`None` waits forever)
    pub fn response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.response_timeout = timeout;
        self
    }

    /// Set the disconnect policy for in-flight queries
    pub fn disconnect_policy(mut self, policy: DisconnectPolicy) -> Self {
        self.config.disconnect_policy = policy;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
