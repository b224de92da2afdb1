//! Store service implementation

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use specretry_common::{MemoryStore, SharedStore};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::api::{
    CasRequest, CasResponse, GetRequest, GetResponse, SetRequest, CAS_PATH, GET_PATH,
    HEALTH_PATH, SET_PATH,
};

/// HTTP front for a shared store
#[derive(Clone)]
pub struct StoreServer {
    store: Arc<dyn SharedStore>,
}

pub async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let server = StoreServer::new(Arc::new(MemoryStore::new()));
    server.serve(addr).await
}

impl StoreServer {
    pub fn new(store: Arc<dyn SharedStore>) -> Self {
        Self { store }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(HEALTH_PATH, get(health_handler))
            .route(GET_PATH, post(get_handler))
            .route(SET_PATH, post(set_handler))
            .route(CAS_PATH, post(cas_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(self.store.clone())
    }

    /// Serve on an already bound listener
    pub async fn serve_listener(self, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
        info!("Shared store listening on http://{}", listener.local_addr()?);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    /// Start the store service
    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        self.serve_listener(listener).await
    }
}

// ============================================================================
// Handlers
// ============================================================================

type StoreState = State<Arc<dyn SharedStore>>;

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "specretry-store"
    }))
}

async fn get_handler(State(store): StoreState, Json(req): Json<GetRequest>) -> Response {
    match store.get(&req.key).await {
        Ok(value) => (StatusCode::OK, Json(GetResponse { value })).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn set_handler(State(store): StoreState, Json(req): Json<SetRequest>) -> Response {
    debug!("set {}", req.key);
    match store.set(&req.key, req.value).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"ok": true}))).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn cas_handler(State(store): StoreState, Json(req): Json<CasRequest>) -> Response {
    match store
        .compare_and_set(&req.key, req.expected.as_ref(), req.value)
        .await
    {
        Ok(swapped) => {
            debug!("cas {} swapped={}", req.key, swapped);
            (StatusCode::OK, Json(CasResponse { swapped })).into_response()
        }
        Err(e) => internal_error(e),
    }
}

fn internal_error(e: specretry_common::Error) -> Response {
    error!("Store operation failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": e.to_string()})),
    )
        .into_response()
}
