//! Server configuration, loaded from environment variables once at startup.

use std::net::SocketAddr;
use std::time::Duration;

/// Which of the two shared-secret keys a request presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Viewer,
}

impl Role {
    pub const fn can_mutate(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Static shared secrets for the two users. Not real authentication; the
/// deployment model is two trusted people on a private network.
#[derive(Clone)]
pub struct RoleKeys {
    admin_key: String,
    viewer_key: String,
}

impl RoleKeys {
    pub fn new(admin_key: impl Into<String>, viewer_key: impl Into<String>) -> Self {
        Self {
            admin_key: admin_key.into(),
            viewer_key: viewer_key.into(),
        }
    }

    /// Resolve a presented key to a role. The admin key grants viewer access
    /// implicitly.
    pub fn authorize(&self, presented: &str) -> Option<Role> {
        if !self.admin_key.is_empty() && presented == self.admin_key {
            Some(Role::Admin)
        } else if !self.viewer_key.is_empty() && presented == self.viewer_key {
            Some(Role::Viewer)
        } else {
            None
        }
    }
}

// Keys never appear in logs.
impl std::fmt::Debug for RoleKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleKeys").finish_non_exhaustive()
    }
}

/// Typed settings snapshot.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub refresh_interval: Duration,
    pub cache_ttl: Duration,
    pub role_keys: RoleKeys,
    pub finnhub_api_key: Option<String>,
    pub alphavantage_api_key: Option<String>,
}

impl Settings {
    pub const BIND_ADDR_ENV: &'static str = "QUOTEFALL_BIND_ADDR";
    pub const REFRESH_SECS_ENV: &'static str = "QUOTEFALL_REFRESH_SECS";
    pub const CACHE_TTL_SECS_ENV: &'static str = "QUOTEFALL_CACHE_TTL_SECS";
    pub const ADMIN_KEY_ENV: &'static str = "QUOTEFALL_ADMIN_KEY";
    pub const VIEWER_KEY_ENV: &'static str = "QUOTEFALL_VIEWER_KEY";

    pub fn from_env() -> Self {
        let bind_addr = std::env::var(Self::BIND_ADDR_ENV)
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8787)));

        let refresh_interval = duration_from_env(Self::REFRESH_SECS_ENV, 45);
        let cache_ttl = duration_from_env(Self::CACHE_TTL_SECS_ENV, 300);

        let role_keys = RoleKeys::new(
            std::env::var(Self::ADMIN_KEY_ENV).unwrap_or_default(),
            std::env::var(Self::VIEWER_KEY_ENV).unwrap_or_default(),
        );

        Self {
            bind_addr,
            refresh_interval,
            cache_ttl,
            role_keys,
            finnhub_api_key: std::env::var(quotefall_core::FinnhubAdapter::API_KEY_ENV).ok(),
            alphavantage_api_key: std::env::var(quotefall_core::AlphaVantageAdapter::API_KEY_ENV)
                .ok(),
        }
    }
}

fn duration_from_env(name: &str, default_secs: u64) -> Duration {
    let secs = std::env::var(name)
        .ok()
        .and_then(|raw| raw.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(default_secs);
    Duration::from_secs(secs)
}
