//! Runtime configuration and its fluent builder.
//!
//! # Example
//!
//! ```rust
//! use chainwatch_core::WatchConfigBuilder;
//!
//! let config = WatchConfigBuilder::new()
//!     .rpc_url("http://localhost:8545")
//!     .poll_interval_ms(2_000)
//!     .listen_addr("127.0.0.1:9090")
//!     .build();
//! assert_eq!(config.poll_interval_ms, 2_000);
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public Ethereum endpoint used when none is configured.
pub const DEFAULT_RPC_URL: &str = "https://ethereum-rpc.publicnode.com";

/// Configuration for a ChainWatch instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// JSON-RPC endpoint of the ledger node.
    pub rpc_url: String,
    /// How often the chain head is polled (milliseconds).
    pub poll_interval_ms: u64,
    /// Per-request timeout for RPC calls (milliseconds).
    pub request_timeout_ms: u64,
    /// Retries for a failed RPC call before the fetch is reported failed.
    pub max_retries: u32,
    /// Socket address the HTTP API binds to.
    pub listen_addr: String,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.into(),
            poll_interval_ms: 5_000,
            request_timeout_ms: 30_000,
            max_retries: 3,
            listen_addr: "0.0.0.0:8080".into(),
        }
    }
}

impl WatchConfig {
    /// Polling interval, never shorter than one millisecond.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Fluent builder for [`WatchConfig`].
#[derive(Default)]
pub struct WatchConfigBuilder {
    config: WatchConfig,
}

impl WatchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: WatchConfig::default(),
        }
    }

    /// Start from an existing configuration (e.g. one loaded from a file).
    /// A zero polling interval is raised to one millisecond.
    pub fn from_config(mut config: WatchConfig) -> Self {
        config.poll_interval_ms = config.poll_interval_ms.max(1);
        Self { config }
    }

    pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
        self.config.rpc_url = url.into();
        self
    }

    /// Set the chain-head polling interval in milliseconds. Zero is raised
    /// to one millisecond.
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms.max(1);
        self
    }

    pub fn request_timeout_ms(mut self, ms: u64) -> Self {
        self.config.request_timeout_ms = ms;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    pub fn build(self) -> WatchConfig {
        self.config
    }
}
