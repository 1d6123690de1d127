use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::{ProviderId, Quote, SearchResult, Symbol};

/// Adapter-level failure classification.
///
/// `NotConfigured` is deliberately distinct from the transport failures: the
/// resolver skips such adapters without surfacing an error to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    NotConfigured,
    NotFound,
    RateLimited,
    Unreachable,
    UpstreamError,
    InvalidRequest,
}

/// Structured adapter error used by resolver fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn not_configured(provider: ProviderId) -> Self {
        Self {
            kind: SourceErrorKind::NotConfigured,
            message: format!("no credential configured for provider '{provider}'"),
            retryable: false,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::NotFound,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unreachable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::UpstreamError,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::NotConfigured => "source.not_configured",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::Unreachable => "source.unreachable",
            SourceErrorKind::UpstreamError => "source.upstream_error",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Validated free-text search input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    query: String,
    limit: usize,
}

impl SearchQuery {
    pub const MIN_QUERY_LEN: usize = 2;
    pub const DEFAULT_LIMIT: usize = 10;

    pub fn new(query: impl Into<String>, limit: usize) -> Result<Self, SourceError> {
        let query = query.into();
        let trimmed = query.trim();
        if trimmed.chars().count() < Self::MIN_QUERY_LEN {
            return Err(SourceError::invalid_request(format!(
                "search query must be at least {} characters",
                Self::MIN_QUERY_LEN
            )));
        }
        if limit == 0 {
            return Err(SourceError::invalid_request(
                "search limit must be greater than zero",
            ));
        }
        Ok(Self {
            query: trimmed.to_owned(),
            limit,
        })
    }

    pub fn parse(query: impl Into<String>) -> Result<Self, SourceError> {
        Self::new(query, Self::DEFAULT_LIMIT)
    }

    pub fn as_str(&self) -> &str {
        &self.query
    }

    pub const fn limit(&self) -> usize {
        self.limit
    }
}

pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Contract implemented by every quote provider adapter.
///
/// Implementations issue at most one upstream request per `fetch_quote` call
/// (search may batch two, see the Finnhub adapter) and must classify every
/// failure via [`SourceError`]; an upstream price of exactly zero is a
/// `NotFound`, never a valid quote.
pub trait QuoteSource: Send + Sync {
    fn id(&self) -> ProviderId;

    /// True once a credential (where one is required) is present.
    fn is_configured(&self) -> bool;

    fn fetch_quote<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, Quote>;

    fn search<'a>(&'a self, query: &'a SearchQuery) -> SourceFuture<'a, Vec<SearchResult>>;
}
