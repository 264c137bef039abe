//! The `/mcp` action router and background server lifecycle.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use crew_ledger::{Ledger, TransactionFilter};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::{McpError, Result};

/// Configuration for the control endpoint.
#[derive(Debug, Clone)]
pub struct McpConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on (0 picks a free port).
    pub port: u16,
    /// Whether to attach a permissive CORS layer.
    pub enable_cors: bool,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8008, enable_cors: true }
    }
}

#[derive(Debug, Deserialize)]
struct ActionRequest {
    action: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Deserialize, Default)]
struct AddTransactionPayload {
    account_id: Option<String>,
    #[serde(default)]
    amount: f64,
    #[serde(rename = "type", default = "default_kind")]
    kind: String,
    description: Option<String>,
}

fn default_kind() -> String {
    "credit".to_string()
}

#[derive(Debug, Deserialize, Default)]
struct ListTransactionsPayload {
    account_id: Option<String>,
    since: Option<String>,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize, Default)]
struct GetBalancePayload {
    account_id: Option<String>,
}

type ApiResponse = (StatusCode, Json<Value>);

/// Deserialize an action payload strictly. An omitted payload (`null`) means
/// "all defaults"; a present payload with wrong types is rejected rather than
/// silently coerced to defaults.
fn parse_payload<T: DeserializeOwned + Default>(payload: Value) -> Option<T> {
    if payload.is_null() {
        return Some(T::default());
    }
    serde_json::from_value(payload).ok()
}

fn bad_request(code: &str) -> ApiResponse {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": code })))
}

fn server_error(message: impl std::fmt::Display) -> ApiResponse {
    error!(%message, "action failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "server_error", "message": message.to_string() })),
    )
}

/// Build the action router over one ledger.
pub fn router(ledger: Ledger) -> Router {
    Router::new()
        .route("/mcp", post(handle_mcp))
        .fallback(|| async {
            (StatusCode::NOT_FOUND, Json(json!({ "error": "not_found" })))
        })
        .layer(TraceLayer::new_for_http())
        .with_state(ledger)
}

async fn handle_mcp(State(ledger): State<Ledger>, body: Bytes) -> ApiResponse {
    let Ok(request) = serde_json::from_slice::<ActionRequest>(&body) else {
        return bad_request("invalid_json");
    };

    match request.action.as_str() {
        "add_transaction" => add_transaction(&ledger, request.payload).await,
        "list_transactions" => list_transactions(&ledger, request.payload).await,
        "get_balance" => get_balance(&ledger, request.payload).await,
        _ => bad_request("unknown_action"),
    }
}

async fn add_transaction(ledger: &Ledger, payload: Value) -> ApiResponse {
    let Some(payload) = parse_payload::<AddTransactionPayload>(payload) else {
        return bad_request("invalid_payload");
    };
    let Some(account_id) = payload.account_id.filter(|a| !a.is_empty()) else {
        return bad_request("missing_parameters");
    };

    match ledger
        .record(&account_id, payload.amount, &payload.kind, payload.description.as_deref())
        .await
    {
        Ok(id) => (StatusCode::OK, Json(json!({ "ok": true, "id": id }))),
        Err(e) => server_error(e),
    }
}

async fn list_transactions(ledger: &Ledger, payload: Value) -> ApiResponse {
    let Some(payload) = parse_payload::<ListTransactionsPayload>(payload) else {
        return bad_request("invalid_payload");
    };
    let filter = TransactionFilter {
        account_id: payload.account_id,
        since: payload.since,
        limit: payload.limit,
    };

    match ledger.transactions(&filter).await {
        Ok(rows) => (StatusCode::OK, Json(json!({ "ok": true, "transactions": rows }))),
        Err(e) => server_error(e),
    }
}

async fn get_balance(ledger: &Ledger, payload: Value) -> ApiResponse {
    let Some(payload) = parse_payload::<GetBalancePayload>(payload) else {
        return bad_request("invalid_payload");
    };
    let Some(account_id) = payload.account_id.filter(|a| !a.is_empty()) else {
        return bad_request("missing_parameters");
    };

    match ledger.balance(&account_id).await {
        Ok(balance) => (StatusCode::OK, Json(json!({ "ok": true, "balance": balance }))),
        Err(e) => server_error(e),
    }
}

/// A running control endpoint: its bound address and a shutdown handle.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// The address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal shutdown and wait for the server task to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        let _ = self.task.await;
    }
}

/// Bind and start the control endpoint in a background task.
///
/// # Errors
///
/// Returns [`McpError::Bind`] if the listen address cannot be bound.
pub async fn serve(config: &McpConfig, ledger: Ledger) -> Result<ServerHandle> {
    let mut app = router(ledger);
    if config.enable_cors {
        app = app.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));
    }

    let bind_addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| McpError::Bind { addr: bind_addr.clone(), source: e })?;
    let addr = listener.local_addr().map_err(|e| McpError::Bind { addr: bind_addr, source: e })?;
    info!(%addr, "control endpoint listening");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
        if let Err(e) = result {
            error!(error = %e, "control endpoint exited with error");
        }
    });

    Ok(ServerHandle { addr, shutdown: shutdown_tx, task })
}
