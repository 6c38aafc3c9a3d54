// ── Runtime replica configuration ──
//
// These types describe *where* the replica syncs from and how the push
// channel behaves. They never touch disk; the CLI (or any embedding
// application) builds a `ReplicaConfig` and hands it to the `Controller`.

use std::time::Duration;

use arrowcast_api::ReconnectConfig;
use url::Url;

/// Default path of the push channel endpoint.
pub const DEFAULT_PUSH_PATH: &str = "/api/auto-updater";

/// Name prefix of "real" tournaments; everything else is a test event.
pub const DEFAULT_TEST_PREFIX: &str = "DrunkenFall";

/// Push-channel reconnection policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

impl From<&ReconnectPolicy> for ReconnectConfig {
    fn from(policy: &ReconnectPolicy) -> Self {
        Self {
            initial_delay: policy.initial_delay,
            max_delay: policy.max_delay,
            max_retries: policy.max_retries,
        }
    }
}

/// Configuration for syncing a replica against one bracket server.
#[derive(Debug, Clone)]
pub struct ReplicaConfig {
    /// Server base URL (e.g., `https://drunkenfall.com`).
    pub url: Url,
    /// Path of the push channel, relative to `url`.
    pub push_path: String,
    /// Request timeout for snapshot fetches.
    pub timeout: Duration,
    /// How often to re-fetch the full tournament snapshot (seconds). 0 = never.
    pub refresh_interval_secs: u64,
    /// Subscribe to the push channel.
    pub websocket_enabled: bool,
    pub reconnect: ReconnectPolicy,
    pub test_prefix: String,
}

impl ReplicaConfig {
    /// Defaults for everything but the server URL.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            push_path: DEFAULT_PUSH_PATH.into(),
            timeout: Duration::from_secs(30),
            refresh_interval_secs: 0,
            websocket_enabled: true,
            reconnect: ReconnectPolicy::default(),
            test_prefix: DEFAULT_TEST_PREFIX.into(),
        }
    }
}
