//! Network reachability probing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::http_client::{HttpClient, HttpRequest};

pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = bool> + Send + 'a>>;

/// Decides online vs. offline mode for the resolver.
///
/// Results are not cached; the resolver calls this at most once per
/// resolution to bound latency.
pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> ProbeFuture<'_>;
}

/// Probes a known-reachable endpoint with a bounded timeout.
///
/// An authentication rejection (401/403) still proves the network path works,
/// so it counts as online; only transport errors and timeouts count as
/// offline.
pub struct HttpConnectivityProber {
    client: Arc<dyn HttpClient>,
    endpoint: String,
    timeout_ms: u64,
}

impl HttpConnectivityProber {
    pub const DEFAULT_ENDPOINT: &'static str = "https://finnhub.io/api/v1/quote?symbol=AAPL";
    pub const DEFAULT_TIMEOUT_MS: u64 = 3_000;

    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self {
            client,
            endpoint: Self::DEFAULT_ENDPOINT.to_owned(),
            timeout_ms: Self::DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

impl ConnectivityProbe for HttpConnectivityProber {
    fn is_online(&self) -> ProbeFuture<'_> {
        Box::pin(async move {
            let request = HttpRequest::get(&self.endpoint).with_timeout_ms(self.timeout_ms);

            match self.client.execute(request).await {
                Ok(response) => {
                    response.is_success() || response.status == 401 || response.status == 403
                }
                Err(error) => {
                    tracing::debug!(error = %error, "connectivity probe failed");
                    false
                }
            }
        })
    }
}

/// Fixed-answer probe for wiring tests and forced-offline operation.
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub bool);

impl ConnectivityProbe for StaticProbe {
    fn is_online(&self) -> ProbeFuture<'_> {
        let online = self.0;
        Box::pin(async move { online })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpError, HttpResponse};

    struct CannedClient(Result<HttpResponse, HttpError>);

    impl HttpClient for CannedClient {
        fn execute<'a>(
            &'a self,
            _request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            let response = self.0.clone();
            Box::pin(async move { response })
        }
    }

    #[tokio::test]
    async fn success_counts_as_online() {
        let prober = HttpConnectivityProber::new(Arc::new(CannedClient(Ok(
            HttpResponse::ok_json("{}"),
        ))));
        assert!(prober.is_online().await);
    }

    #[tokio::test]
    async fn auth_rejection_counts_as_online() {
        let prober = HttpConnectivityProber::new(Arc::new(CannedClient(Ok(
            HttpResponse::with_status(401, "missing token"),
        ))));
        assert!(prober.is_online().await);
    }

    #[tokio::test]
    async fn transport_error_counts_as_offline() {
        let prober = HttpConnectivityProber::new(Arc::new(CannedClient(Err(HttpError::timeout(
            "deadline exceeded",
        )))));
        assert!(!prober.is_online().await);
    }
}
