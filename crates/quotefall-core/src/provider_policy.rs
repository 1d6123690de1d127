use std::time::Duration;

use crate::ProviderId;

/// Outbound request budget and retry behavior for one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPolicy {
    pub provider_id: ProviderId,
    /// Sliding quota window and the number of requests allowed within it.
    pub quota_window: Duration,
    pub quota_limit: u32,
    /// Minimum spacing between consecutive requests.
    pub min_spacing: Duration,
    /// Delay before the single retry allowed after an HTTP 429.
    pub rate_limit_backoff: Duration,
}

impl ProviderPolicy {
    /// Finnhub free tier: 60/min, and the adapter additionally spaces
    /// requests 100ms apart to stay clear of burst rejection.
    pub fn finnhub_default() -> Self {
        Self {
            provider_id: ProviderId::Finnhub,
            quota_window: Duration::from_secs(60),
            quota_limit: 60,
            min_spacing: Duration::from_millis(100),
            rate_limit_backoff: Duration::from_secs(1),
        }
    }

    /// Alpha Vantage free tier: 5 requests per minute.
    pub fn alphavantage_default() -> Self {
        Self {
            provider_id: ProviderId::Alphavantage,
            quota_window: Duration::from_secs(60),
            quota_limit: 5,
            min_spacing: Duration::from_millis(200),
            rate_limit_backoff: Duration::from_secs(1),
        }
    }

    /// Yahoo has no published quota; keep a light touch anyway.
    pub fn yahoo_default() -> Self {
        Self {
            provider_id: ProviderId::Yahoo,
            quota_window: Duration::from_secs(60),
            quota_limit: 120,
            min_spacing: Duration::from_millis(50),
            rate_limit_backoff: Duration::from_secs(1),
        }
    }

    pub fn default_for(provider_id: ProviderId) -> Option<Self> {
        match provider_id {
            ProviderId::Finnhub => Some(Self::finnhub_default()),
            ProviderId::Alphavantage => Some(Self::alphavantage_default()),
            ProviderId::Yahoo => Some(Self::yahoo_default()),
            ProviderId::Offline => None,
        }
    }
}
