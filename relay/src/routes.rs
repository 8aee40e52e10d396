//! HTTP route handlers for the relay.
//!
//! JSON in, JSON out. Blockchain-data endpoints answer with the
//! `{data, source}` envelope; any upstream failure collapses to HTTP 500
//! with `{"error": ...}`, with no distinction between network errors,
//! provider 4xx/5xx, and malformed responses (existing clients depend on
//! the shape). Malformed request bodies are rejected with HTTP 400.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::chain::ChainId;
use crate::cursor::CursorState;
use crate::error::RelayError;
use crate::relay::Relay;

/// Shared application state behind the router.
#[derive(Debug)]
pub struct AppState {
    /// Outbound relay core.
    pub relay: Relay,
    /// Cursor demo state.
    pub cursor: CursorState,
}

/// Type alias for the shared state used by Axum route handlers.
pub type RelayState = Arc<AppState>;

/// Creates the Axum router with all relay endpoints.
pub fn routes() -> Router<RelayState> {
    Router::new()
        .route("/", get(get_root))
        .route("/health", get(get_health))
        .route("/status", get(get_status))
        .route("/getBlock", post(post_block))
        .route("/getTokenBalances", post(post_token_balances))
        .route("/getTokenMetadata", post(post_token_metadata))
        .route("/getNFTMetadata", post(post_nft_metadata))
        .route("/createTransakOrder", post(post_onramp_order))
        .route("/moveCursor", post(post_move_cursor))
}

/// `POST /getBlock` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockRequest {
    chain_id: ChainId,
}

/// `POST /getTokenBalances` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenBalancesRequest {
    address: String,
    #[serde(default)]
    chain_id: ChainId,
}

/// `POST /getTokenMetadata` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenMetadataRequest {
    addresses: AddressList,
    #[serde(default)]
    chain_id: ChainId,
}

/// One contract address, or a list joined comma-separated for the provider.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AddressList {
    One(String),
    Many(Vec<String>),
}

impl AddressList {
    fn join(&self) -> String {
        match self {
            Self::One(address) => address.clone(),
            Self::Many(addresses) => addresses.join(","),
        }
    }
}

/// `POST /getNFTMetadata` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NftMetadataRequest {
    address: String,
    token_id: String,
    #[serde(default)]
    chain_id: ChainId,
}

/// `POST /moveCursor` body.
#[derive(Debug, Deserialize)]
struct MoveCursorRequest {
    direction: String,
    #[serde(default = "default_steps")]
    steps: i64,
}

const fn default_steps() -> i64 {
    1
}

/// `GET /` — simple greeting.
#[tracing::instrument(skip_all)]
async fn get_root() -> impl IntoResponse {
    (
        StatusCode::OK,
        concat!("Hello from ", env!("CARGO_PKG_NAME"), "!"),
    )
}

/// `GET /health` — lightweight liveness check.
#[tracing::instrument(skip_all)]
async fn get_health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// `GET /status` — configuration diagnostics: which provider credentials are
/// present, plus the current server time. Never fails.
#[tracing::instrument(skip_all)]
async fn get_status(State(state): State<RelayState>) -> impl IntoResponse {
    let providers = state.relay.providers();
    (
        StatusCode::OK,
        Json(json!({
            "status": "connected",
            "apis": {
                "moralis": providers.moralis().is_configured(),
                "alchemy": providers.alchemy().is_configured(),
                "transak": providers.transak().is_configured(),
            },
            "server": { "time": chrono::Utc::now().to_rfc3339() },
        })),
    )
}

/// `POST /getBlock` — latest-block lookup with the two-tier fallback.
#[tracing::instrument(skip_all)]
async fn post_block(
    State(state): State<RelayState>,
    body: Result<Json<BlockRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Ok(Json(request)) = body else {
        return invalid_body();
    };
    match state.relay.block(request.chain_id).await {
        Ok(relayed) => (StatusCode::OK, Json(relayed)).into_response(),
        Err(ref error) => {
            tracing::error!(%error, "block lookup failed");
            upstream_failure(error)
        }
    }
}

/// `POST /getTokenBalances` — ERC-20 balances for an address.
#[tracing::instrument(skip_all)]
async fn post_token_balances(
    State(state): State<RelayState>,
    body: Result<Json<TokenBalancesRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Ok(Json(request)) = body else {
        return invalid_body();
    };
    match state
        .relay
        .token_balances(&request.address, request.chain_id)
        .await
    {
        Ok(relayed) => (StatusCode::OK, Json(relayed)).into_response(),
        Err(ref error) => {
            tracing::error!(%error, "token balance lookup failed");
            upstream_failure(error)
        }
    }
}

/// `POST /getTokenMetadata` — ERC-20 metadata for a list of contracts.
#[tracing::instrument(skip_all)]
async fn post_token_metadata(
    State(state): State<RelayState>,
    body: Result<Json<TokenMetadataRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Ok(Json(request)) = body else {
        return invalid_body();
    };
    match state
        .relay
        .token_metadata(&request.addresses.join(), request.chain_id)
        .await
    {
        Ok(relayed) => (StatusCode::OK, Json(relayed)).into_response(),
        Err(ref error) => {
            tracing::error!(%error, "token metadata lookup failed");
            upstream_failure(error)
        }
    }
}

/// `POST /getNFTMetadata` — metadata for one NFT.
#[tracing::instrument(skip_all)]
async fn post_nft_metadata(
    State(state): State<RelayState>,
    body: Result<Json<NftMetadataRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Ok(Json(request)) = body else {
        return invalid_body();
    };
    match state
        .relay
        .nft_metadata(&request.address, &request.token_id, request.chain_id)
        .await
    {
        Ok(relayed) => (StatusCode::OK, Json(relayed)).into_response(),
        Err(ref error) => {
            tracing::error!(%error, "NFT metadata lookup failed");
            upstream_failure(error)
        }
    }
}

/// `POST /createTransakOrder` — forwards the order body verbatim and
/// reshapes the reply to `{status, url}`.
#[tracing::instrument(skip_all)]
async fn post_onramp_order(
    State(state): State<RelayState>,
    body: Result<Json<Value>, JsonRejection>,
) -> impl IntoResponse {
    let Ok(Json(order)) = body else {
        return invalid_body();
    };
    match state.relay.onramp_order(order).await {
        Ok(created) => (StatusCode::OK, Json(created)).into_response(),
        Err(ref error) => {
            tracing::error!(%error, "on-ramp order creation failed");
            upstream_failure(error)
        }
    }
}

/// `POST /moveCursor` — cursor movement demo; pure in-process computation.
#[tracing::instrument(skip_all)]
async fn post_move_cursor(
    State(state): State<RelayState>,
    body: Result<Json<MoveCursorRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Ok(Json(request)) = body else {
        return invalid_body();
    };
    let position = state.cursor.apply(&request.direction, request.steps);
    (StatusCode::OK, Json(json!({ "position": position }))).into_response()
}

fn invalid_body() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "invalid request body" })),
    )
        .into_response()
}

fn upstream_failure(error: &RelayError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": error.to_string() })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::body::Body;
    use axum::extract::OriginalUri;
    use axum::http::{HeaderMap, Request, header};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::config::ProvidersConfig;
    use crate::provider::ProviderRegistry;

    /// Serves `router` on an ephemeral local port.
    async fn spawn_upstream(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    /// A mock upstream that echoes the request URI and credential header
    /// back as its JSON body.
    fn echo_upstream() -> Router {
        Router::new().fallback(
            |OriginalUri(uri): OriginalUri, headers: HeaderMap| async move {
                Json(json!({
                    "uri": uri.to_string(),
                    "key": headers.get("x-api-key").and_then(|v| v.to_str().ok()),
                }))
            },
        )
    }

    fn failing_upstream() -> Router {
        Router::new().fallback(|| async { StatusCode::INTERNAL_SERVER_ERROR })
    }

    fn providers_with(moralis: &str, alchemy: &str, transak: &str) -> ProvidersConfig {
        let mut providers = ProvidersConfig::default();
        providers.moralis.base_url = moralis.to_owned();
        providers.moralis.api_key = Some("moralis-key".to_owned());
        providers.alchemy.base_url = alchemy.to_owned();
        providers.alchemy.api_key = Some("alchemy-key".to_owned());
        providers.transak.base_url = transak.to_owned();
        providers.transak.api_key = Some("transak-key".to_owned());
        providers
    }

    fn app(providers: &ProvidersConfig) -> Router {
        let registry = ProviderRegistry::from_config(providers, &|_| None).unwrap();
        let relay = Relay::new(registry, None).unwrap();
        let state = Arc::new(AppState {
            relay,
            cursor: CursorState::default(),
        });
        routes().with_state(state)
    }

    async fn request(app: Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_owned()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn block_is_served_by_moralis_when_primary_succeeds() {
        let moralis = spawn_upstream(echo_upstream()).await;
        let alchemy_hits = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&alchemy_hits);
        let alchemy = spawn_upstream(Router::new().fallback(move || {
            let hits = Arc::clone(&hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Json(json!({"result": null}))
            }
        }))
        .await;

        let app = app(&providers_with(
            &format!("http://{moralis}"),
            &format!("http://{alchemy}/{{network}}"),
            "http://transak.invalid",
        ));
        let (status, body) = request(app, "POST", "/getBlock", r#"{"chainId":"5"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "moralis");
        let uri = body["data"]["uri"].as_str().unwrap();
        assert!(uri.contains("/block/5"), "unexpected uri: {uri}");
        assert!(uri.contains("chain=0x5"), "unexpected uri: {uri}");
        assert_eq!(body["data"]["key"], "moralis-key");
        assert_eq!(alchemy_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn block_falls_back_to_alchemy_exactly_once() {
        let moralis = spawn_upstream(failing_upstream()).await;
        let alchemy_hits = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&alchemy_hits);
        let alchemy = spawn_upstream(Router::new().fallback(move |Json(rpc): Json<Value>| {
            let hits = Arc::clone(&hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Json(json!({"jsonrpc": "2.0", "id": rpc["id"], "result": {"number": "0x10"}}))
            }
        }))
        .await;

        let app = app(&providers_with(
            &format!("http://{moralis}"),
            &format!("http://{alchemy}/{{network}}"),
            "http://transak.invalid",
        ));
        let (status, body) = request(app, "POST", "/getBlock", r#"{"chainId":"1"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "alchemy");
        assert_eq!(body["data"]["result"]["number"], "0x10");
        assert_eq!(alchemy_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn block_is_500_when_both_tiers_fail() {
        let moralis = spawn_upstream(failing_upstream()).await;
        let alchemy = spawn_upstream(failing_upstream()).await;

        let app = app(&providers_with(
            &format!("http://{moralis}"),
            &format!("http://{alchemy}/{{network}}"),
            "http://transak.invalid",
        ));
        let (status, body) = request(app, "POST", "/getBlock", r#"{"chainId":"1"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("alchemy"));
    }

    #[tokio::test]
    async fn token_balances_defaults_to_mainnet_slug() {
        let moralis = spawn_upstream(echo_upstream()).await;
        let app = app(&providers_with(
            &format!("http://{moralis}"),
            "http://{network}.alchemy.invalid",
            "http://transak.invalid",
        ));
        let (status, body) = request(
            app,
            "POST",
            "/getTokenBalances",
            r#"{"address":"0xabc"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "moralis");
        let uri = body["data"]["uri"].as_str().unwrap();
        assert!(uri.contains("/erc20/0xabc/balance"), "unexpected uri: {uri}");
        assert!(uri.contains("chain=eth"), "unexpected uri: {uri}");
    }

    #[tokio::test]
    async fn token_balances_upstream_rejection_is_500_with_error() {
        let moralis = spawn_upstream(failing_upstream()).await;
        let app = app(&providers_with(
            &format!("http://{moralis}"),
            "http://{network}.alchemy.invalid",
            "http://transak.invalid",
        ));
        let (status, body) = request(
            app,
            "POST",
            "/getTokenBalances",
            r#"{"address":"0xabc","chainId":5}"#,
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("moralis"));
    }

    #[tokio::test]
    async fn token_metadata_joins_address_list() {
        let moralis = spawn_upstream(echo_upstream()).await;
        let app = app(&providers_with(
            &format!("http://{moralis}"),
            "http://{network}.alchemy.invalid",
            "http://transak.invalid",
        ));
        let (status, body) = request(
            app,
            "POST",
            "/getTokenMetadata",
            r#"{"addresses":["0xaaa","0xbbb"],"chainId":"1"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let uri = body["data"]["uri"].as_str().unwrap();
        assert!(uri.contains("/erc20/metadata"), "unexpected uri: {uri}");
        assert!(uri.contains("0xaaa"), "unexpected uri: {uri}");
        assert!(uri.contains("0xbbb"), "unexpected uri: {uri}");
    }

    #[tokio::test]
    async fn nft_metadata_builds_path_from_address_and_token() {
        let moralis = spawn_upstream(echo_upstream()).await;
        let app = app(&providers_with(
            &format!("http://{moralis}"),
            "http://{network}.alchemy.invalid",
            "http://transak.invalid",
        ));
        let (status, body) = request(
            app,
            "POST",
            "/getNFTMetadata",
            r#"{"address":"0xccc","tokenId":"7","chainId":137}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let uri = body["data"]["uri"].as_str().unwrap();
        assert!(uri.contains("/nft/0xccc/7"), "unexpected uri: {uri}");
        assert!(uri.contains("chain=0x89"), "unexpected uri: {uri}");
    }

    #[tokio::test]
    async fn onramp_order_forwards_body_and_reshapes_reply() {
        let transak = spawn_upstream(Router::new().fallback(
            |headers: HeaderMap, Json(order): Json<Value>| async move {
                Json(json!({
                    "status": headers.get("apikey").and_then(|v| v.to_str().ok()),
                    "transactionLink": order,
                }))
            },
        ))
        .await;

        let app = app(&providers_with(
            "http://moralis.invalid",
            "http://{network}.alchemy.invalid",
            &format!("http://{transak}"),
        ));
        let (status, body) = request(
            app,
            "POST",
            "/createTransakOrder",
            r#"{"fiatAmount":100,"cryptoCurrency":"ETH"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "transak-key");
        assert_eq!(
            body["url"],
            json!({"fiatAmount": 100, "cryptoCurrency": "ETH"})
        );
    }

    #[tokio::test]
    async fn move_cursor_accumulates_across_requests() {
        let app = app(&ProvidersConfig::default());

        let (status, body) = request(
            app.clone(),
            "POST",
            "/moveCursor",
            r#"{"direction":"right","steps":2}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["position"], json!({"x": 20, "y": 0}));

        let (_, body) = request(app, "POST", "/moveCursor", r#"{"direction":"up-left"}"#).await;
        assert_eq!(body["position"], json!({"x": 10, "y": -10}));
    }

    #[tokio::test]
    async fn status_reports_unset_credentials_as_false() {
        let app = app(&ProvidersConfig::default());
        let (status, body) = request(app, "GET", "/status", "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "connected");
        assert_eq!(body["apis"], json!({"moralis": false, "alchemy": false, "transak": false}));
        assert!(body["server"]["time"].as_str().is_some());
    }

    #[tokio::test]
    async fn status_reports_present_credentials_as_true() {
        let app = app(&providers_with(
            "http://moralis.invalid",
            "http://{network}.alchemy.invalid",
            "http://transak.invalid",
        ));
        let (_, body) = request(app, "GET", "/status", "").await;
        assert_eq!(body["apis"], json!({"moralis": true, "alchemy": true, "transak": true}));
    }

    #[tokio::test]
    async fn malformed_bodies_are_rejected_with_400() {
        let app = app(&ProvidersConfig::default());

        let (status, body) = request(app.clone(), "POST", "/getBlock", "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid request body");

        let (status, _) = request(app.clone(), "POST", "/moveCursor", "not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = request(app, "POST", "/getNFTMetadata", r#"{"address":"0x1"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_and_root_respond() {
        let app = app(&ProvidersConfig::default());

        let (status, body) = request(app.clone(), "GET", "/health", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
