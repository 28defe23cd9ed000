//! Read-only HTTP surface for NodeProfiles (§4.B, §6 "External interfaces").
//!
//! Grounded in `original_source/src/resource_profiler/resource_profiler.py`'s
//! Flask `GET /nodes` route; the Packer is the HTTP-first, object-store-
//! fallback consumer (§4.C).

use std::convert::Infallible;

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use super::Snapshot;
use crate::model::NodeProfile;

#[derive(Serialize)]
struct NodeProfileList {
    items: Vec<NodeProfile>,
}

async fn list_nodes(State(snapshot): State<Snapshot>) -> impl IntoResponse {
    let items = snapshot.read().unwrap().clone();
    Json(NodeProfileList { items })
}

async fn healthz() -> &'static str {
    "ok"
}

pub fn router(snapshot: Snapshot) -> Router {
    Router::new()
        .route("/nodes", get(list_nodes))
        .route("/healthz", get(healthz))
        .with_state(snapshot)
}

/// Serves `router(snapshot)` on `addr` until the process is killed. Callers
/// run this as its own tokio task alongside the reconcile loop.
pub async fn serve(snapshot: Snapshot, addr: std::net::SocketAddr) -> Result<Infallible, std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(snapshot)).await?;
    unreachable!("axum::serve only returns on error, surfaced above")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::{Arc, RwLock};
    use tower::ServiceExt;

    #[tokio::test]
    async fn nodes_route_serves_current_snapshot() {
        let snapshot: Snapshot = Arc::new(RwLock::new(Vec::new()));
        let app = router(snapshot);

        let response = app
            .oneshot(Request::builder().uri("/nodes").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn healthz_route_returns_ok() {
        let snapshot: Snapshot = Arc::new(RwLock::new(Vec::new()));
        let app = router(snapshot);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
