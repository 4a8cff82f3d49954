/// HTTP server setup and routing
use crate::{
    context::AppContext,
    error::{ResolverError, ResolverResult},
    metrics,
};
use axum::{
    extract::{MatchedPath, Request},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{Json, Response},
    Router,
};
use serde_json::json;
use std::time::Instant;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Build the main application router
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .merge(crate::api::routes())
        .with_state(ctx)
        .layer(middleware::from_fn(track_metrics))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .fallback(not_found)
}

/// Record request count and latency per matched route
async fn track_metrics(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    metrics::record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );

    response
}

/// 404 handler
async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "NotFound",
            "message": "Endpoint not found"
        })),
    )
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> ResolverResult<()> {
    let addr = ctx.listen_addr();

    info!("Wallet name service listening on {}", addr);
    info!("   Name API: {}", ctx.config.name_api.base_url);
    info!("   RPC: {}", ctx.config.chain.rpc_url);
    info!("   Resolver contract: {}", ctx.config.chain.resolver_contract);

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ResolverError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| ResolverError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::test_config,
        names::{
            onchain::tests::spawn_rpc, strategy::build_http_client, NameResolver, NameStrategy,
            OnChainNameStrategy, RestNameStrategy, WalletAddress,
        },
    };
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tower::ServiceExt;

    const ALICE: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    struct Unnamed;

    #[async_trait]
    impl NameStrategy for Unnamed {
        fn name(&self) -> &'static str {
            "unnamed"
        }

        async fn lookup(&self, _address: &WalletAddress) -> ResolverResult<Option<String>> {
            Ok(None)
        }
    }

    /// Name API stub that only knows `alice.hl`
    async fn spawn_name_api() -> String {
        let app = Router::new().route(
            "/resolve/address/:domain",
            axum::routing::get(|axum::extract::Path(domain): axum::extract::Path<String>| async move {
                if domain == "alice.hl" {
                    (StatusCode::OK, Json(json!({ "address": ALICE })))
                } else {
                    (StatusCode::NOT_FOUND, Json(json!({ "error": "NotFound" })))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn test_router() -> Router {
        let mut names = HashMap::new();
        names.insert(ALICE.to_string(), Some("alice.hl".to_string()));

        let mut config = test_config();
        config.chain.rpc_url = spawn_rpc(names).await;
        config.name_api.base_url = spawn_name_api().await;

        let client = build_http_client(&config.http_client).unwrap();
        let name_api = Arc::new(RestNameStrategy::new(client.clone(), &config.name_api));
        let onchain = Arc::new(OnChainNameStrategy::new(client, &config.chain).unwrap());

        let resolver = NameResolver::builder()
            .background(Arc::new(Unnamed))
            .fallback(onchain)
            .build();

        build_router(AppContext::from_parts(config, resolver, name_api))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, json) = get_json(test_router().await, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_get_name_uses_onchain_fallback() {
        let app = test_router().await;

        let uri = format!("/v1/names/{}", ALICE.to_uppercase().replace("0X", "0x"));
        let (status, json) = get_json(app.clone(), &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["address"], ALICE);
        assert_eq!(json["name"], "alice.hl");

        let (status, json) = get_json(app, &format!("/v1/names/{}/state", ALICE)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["state"], "resolved");
        assert_eq!(json["name"], "alice.hl");
    }

    #[tokio::test]
    async fn test_invalid_address_is_bad_request() {
        let (status, json) = get_json(test_router().await, "/v1/names/not-an-address").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "InvalidRequest");
    }

    #[tokio::test]
    async fn test_state_of_unseen_address() {
        let (status, json) = get_json(
            test_router().await,
            "/v1/names/0x2222222222222222222222222222222222222222/state",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["state"], "unseen");
    }

    #[tokio::test]
    async fn test_batch_endpoint() {
        let app = test_router().await;
        let body = json!({
            "addresses": [ALICE, "0x3333333333333333333333333333333333333333"]
        });

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method(Method::POST)
                    .uri("/v1/names/batch")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["names"][0]["name"], "alice.hl");
        assert!(json["names"][1]["name"].is_null());
    }

    #[tokio::test]
    async fn test_peek_does_not_wait_for_fallback() {
        let app = test_router().await;
        let peek = format!("/v1/names/{}/peek", ALICE);

        // First sight only starts the background lookup
        let (status, json) = get_json(app.clone(), &peek).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["address"], ALICE);
        assert!(json["name"].is_null());

        let (_, json) = get_json(app.clone(), &format!("/v1/names/{}", ALICE)).await;
        assert_eq!(json["name"], "alice.hl");

        let (status, json) = get_json(app, &peek).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["name"], "alice.hl");
    }

    #[tokio::test]
    async fn test_domain_lookup() {
        let app = test_router().await;

        let (status, json) = get_json(app.clone(), "/v1/domains/Alice.HL").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["domain"], "alice.hl");
        assert_eq!(json["address"], ALICE);

        let (status, json) = get_json(app, "/v1/domains/nobody.hl").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "NotFound");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, json) = get_json(test_router().await, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "NotFound");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = test_router().await;
        let response = app
            .oneshot(axum::http::Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
