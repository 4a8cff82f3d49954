/// Name API endpoints
/// Address -> name lookups, forward domain lookups, and resolver stats
use crate::{
    context::AppContext,
    error::{ResolverError, ResolverResult},
    names::{ResolverStats, WalletAddress},
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Maximum addresses accepted by the batch endpoint
pub const MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameResponse {
    pub address: String,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateResponse {
    pub address: String,
    pub state: &'static str,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub addresses: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub names: Vec<NameResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainResponse {
    pub domain: String,
    pub address: String,
}

/// Validate and normalize an address path parameter
fn parse_address(raw: &str) -> ResolverResult<WalletAddress> {
    WalletAddress::normalize(raw)
        .filter(WalletAddress::is_evm)
        .ok_or_else(|| ResolverError::Validation(format!("Invalid wallet address: {}", raw)))
}

/// Best-effort name for an address (cache, then background path, then chain)
pub async fn get_name(
    State(ctx): State<AppContext>,
    Path(address): Path<String>,
) -> ResolverResult<Json<NameResponse>> {
    let address = parse_address(&address)?;
    let name = ctx
        .resolver
        .resolve_with_fallback(Some(address.as_str()))
        .await;

    Ok(Json(NameResponse {
        address: address.to_string(),
        name,
    }))
}

/// Non-blocking lookup; may return null and start a background resolution
pub async fn peek_name(
    State(ctx): State<AppContext>,
    Path(address): Path<String>,
) -> ResolverResult<Json<NameResponse>> {
    let address = parse_address(&address)?;
    let name = ctx.resolver.resolve(Some(address.as_str())).await;

    Ok(Json(NameResponse {
        address: address.to_string(),
        name,
    }))
}

/// Resolution state without triggering any work
pub async fn get_state(
    State(ctx): State<AppContext>,
    Path(address): Path<String>,
) -> ResolverResult<Json<StateResponse>> {
    let address = parse_address(&address)?;
    let state = ctx.resolver.state(address.as_str()).await;

    Ok(Json(StateResponse {
        address: address.to_string(),
        state: state.label(),
        name: state.name().map(str::to_string),
    }))
}

pub async fn batch_names(
    State(ctx): State<AppContext>,
    Json(req): Json<BatchRequest>,
) -> ResolverResult<Json<BatchResponse>> {
    if req.addresses.len() > MAX_BATCH_SIZE {
        return Err(ResolverError::Validation(format!(
            "Too many addresses (max {})",
            MAX_BATCH_SIZE
        )));
    }

    for raw in &req.addresses {
        parse_address(raw)?;
    }

    let names = ctx
        .resolver
        .resolve_many(&req.addresses)
        .await
        .into_iter()
        .map(|(address, name)| NameResponse { address, name })
        .collect();

    Ok(Json(BatchResponse { names }))
}

/// Forward lookup through the REST backend
pub async fn get_domain(
    State(ctx): State<AppContext>,
    Path(domain): Path<String>,
) -> ResolverResult<Json<DomainResponse>> {
    let domain = domain.trim().to_lowercase();
    if domain.is_empty() {
        return Err(ResolverError::Validation("Domain cannot be empty".to_string()));
    }

    let address = ctx
        .name_api
        .resolve_domain(&domain)
        .await?
        .ok_or_else(|| ResolverError::NotFound(format!("No address for {}", domain)))?;

    Ok(Json(DomainResponse { domain, address }))
}

pub async fn get_stats(State(ctx): State<AppContext>) -> Json<ResolverStats> {
    Json(ctx.resolver.stats().await)
}

/// Build name routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/v1/names/batch", post(batch_names))
        .route("/v1/names/:address", get(get_name))
        .route("/v1/names/:address/peek", get(peek_name))
        .route("/v1/names/:address/state", get(get_state))
        .route("/v1/domains/:domain", get(get_domain))
        .route("/v1/stats", get(get_stats))
}
