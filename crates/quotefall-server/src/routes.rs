//! REST routes for the quote resolver and the portfolio store.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use quotefall_core::resolver::Resolution;
use quotefall_core::{
    Envelope, EnvelopeMeta, ProviderId, QuoteResolver, RefreshHandle, SearchQuery, Symbol,
};
use quotefall_portfolio::{
    InMemoryPortfolioStore, InvestmentUpdate, NewInvestment, PortfolioStore,
};

use crate::config::{Role, RoleKeys};
use crate::error::ApiError;

const ACCESS_KEY_HEADER: &str = "x-portfolio-key";

pub struct AppState {
    pub resolver: Arc<QuoteResolver>,
    pub store: Arc<InMemoryPortfolioStore>,
    pub refresh: RefreshHandle,
    pub role_keys: RoleKeys,
    pub refresh_interval_secs: u64,
}

/// Build the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/quote/:symbol", get(get_quote))
        .route("/search", get(get_search))
        .route("/status", get(get_status))
        .route("/portfolio", get(get_portfolio))
        .route("/portfolio/investments", post(post_investment))
        .route("/portfolio/investments/:id", put(put_investment))
        .route("/portfolio/investments/:id/sell", post(post_sell))
        .route("/portfolio/refresh", post(post_refresh))
        .with_state(state)
}

fn require_role(headers: &HeaderMap, keys: &RoleKeys, admin_only: bool) -> Result<Role, ApiError> {
    let presented = headers
        .get(ACCESS_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let role = keys.authorize(presented).ok_or(ApiError::Unauthorized)?;
    if admin_only && !role.can_mutate() {
        return Err(ApiError::Forbidden);
    }
    Ok(role)
}

fn resolution_envelope(resolution: Resolution) -> Result<Envelope<Value>, ApiError> {
    let meta = EnvelopeMeta::new(
        Uuid::new_v4().to_string(),
        resolution.source_chain,
        resolution.latency_ms,
        resolution.cache_hit,
    )
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    let data = serde_json::to_value(&resolution.quote)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Envelope::with_errors(meta, data, resolution.errors)
        .map_err(|e| ApiError::Internal(e.to_string()))
}

async fn get_quote(
    State(state): State<Arc<AppState>>,
    Path(raw_symbol): Path<String>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let symbol = Symbol::parse(&raw_symbol)?;
    let resolution = state.resolver.resolve(&symbol).await;
    Ok(Json(resolution_envelope(resolution)?))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: String,
    #[serde(default)]
    limit: Option<usize>,
}

async fn get_search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let query = SearchQuery::new(
        params.q,
        params.limit.unwrap_or(SearchQuery::DEFAULT_LIMIT),
    )
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let outcome = state.resolver.search(&query).await;

    let meta = EnvelopeMeta::new(
        Uuid::new_v4().to_string(),
        outcome.source_chain,
        outcome.latency_ms,
        false,
    )
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    let data = serde_json::to_value(&outcome.results)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(
        Envelope::with_errors(meta, data, outcome.errors)
            .map_err(|e| ApiError::Internal(e.to_string()))?,
    ))
}

#[derive(Debug, Serialize)]
struct StatusBody {
    configured_providers: Vec<ProviderId>,
    online: bool,
    cache_entries: usize,
    refresh_interval_secs: u64,
    refresh_completed: u64,
    refresh_skipped: u64,
}

async fn get_status(State(state): State<Arc<AppState>>) -> Result<Json<StatusBody>, ApiError> {
    let stats = state.refresh.stats();
    Ok(Json(StatusBody {
        configured_providers: state.resolver.configured_providers(),
        online: state.resolver.is_online().await,
        cache_entries: state.resolver.cache().len().await,
        refresh_interval_secs: state.refresh_interval_secs,
        refresh_completed: stats.completed,
        refresh_skipped: stats.skipped,
    }))
}

async fn get_portfolio(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_role(&headers, &state.role_keys, false)?;

    let investments = state.store.investments();
    let total_value: f64 = investments.iter().map(|i| i.market_value()).sum();

    Ok(Json(json!({
        "investments": investments,
        "total_value": total_value,
    })))
}

async fn post_investment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(new): Json<NewInvestment>,
) -> Result<Json<Value>, ApiError> {
    require_role(&headers, &state.role_keys, true)?;

    let investment = state.store.add(new)?;
    Ok(Json(serde_json::to_value(investment).map_err(|e| {
        ApiError::Internal(e.to_string())
    })?))
}

async fn put_investment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(update): Json<InvestmentUpdate>,
) -> Result<Json<Value>, ApiError> {
    require_role(&headers, &state.role_keys, true)?;

    let investment = state.store.update(id, update)?;
    Ok(Json(serde_json::to_value(investment).map_err(|e| {
        ApiError::Internal(e.to_string())
    })?))
}

#[derive(Debug, Deserialize)]
struct SellRequest {
    quantity: f64,
    #[serde(default)]
    price: Option<f64>,
}

async fn post_sell(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<SellRequest>,
) -> Result<Json<Value>, ApiError> {
    require_role(&headers, &state.role_keys, true)?;

    let price = match request.price {
        Some(price) => price,
        None => {
            state
                .store
                .get(id)
                .ok_or(quotefall_portfolio::StoreError::UnknownInvestment(id))?
                .current_price
        }
    };

    let investment = state.store.sell(id, request.quantity, price)?;
    Ok(Json(serde_json::to_value(investment).map_err(|e| {
        ApiError::Internal(e.to_string())
    })?))
}

async fn post_refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_role(&headers, &state.role_keys, true)?;

    let ran = state.refresh.run_once().await;
    let stats = state.refresh.stats();
    Ok(Json(json!({
        "ran": ran,
        "completed": stats.completed,
        "skipped": stats.skipped,
    })))
}
