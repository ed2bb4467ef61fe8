//! HTTP Server
//!
//! Router assembly, request logging and the listener loop.

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};

use super::routes::*;
use super::websocket::ws_events_handler;
use crate::app::App;
use crate::common::logging::log_api_response;

/// Application state shared by all handlers
pub type SharedAppState = Arc<App>;

/// Log method, path, status and latency of every request
async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    log_api_response(
        &method,
        &path,
        response.status().as_u16(),
        started.elapsed().as_millis() as u64,
    );
    response
}

/// Create the API router
pub fn create_router(app: SharedAppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handle_health))
        .route(
            "/api/host-zones",
            get(handle_list_host_zones).post(handle_register_host_zone),
        )
        .route("/api/host-zones/:chain_id", get(handle_get_host_zone))
        .route("/api/host-zones/:chain_id/reconcile", post(handle_reconcile))
        .route(
            "/api/host-zones/:chain_id/accounts/:role",
            post(handle_account_opened),
        )
        .route(
            "/api/host-zones/:chain_id/validators",
            post(handle_add_validator),
        )
        .route(
            "/api/host-zones/:chain_id/validators/:address",
            axum::routing::delete(handle_delete_validator),
        )
        .route(
            "/api/epoch-unbonding-records",
            get(handle_list_epochs).post(handle_start_epoch),
        )
        .route(
            "/api/epoch-unbonding-records/latest",
            get(handle_latest_epoch),
        )
        .route(
            "/api/account-requests",
            get(handle_pending_account_requests),
        )
        .route(
            "/api/account-requests/drain",
            post(handle_drain_account_requests),
        )
        .route("/api/events", get(handle_recent_events))
        .route("/ws/events", get(ws_events_handler))
        .layer(middleware::from_fn(log_requests))
        .layer(cors)
        .with_state(app)
}

/// Start the API server
pub async fn start_server(app: SharedAppState, port: u16) -> Result<(), std::io::Error> {
    let router = create_router(app);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    println!("=== StakeIBC Controller API ===");
    println!("Listening on http://{}", addr);
    println!();
    println!("Endpoints:");
    println!("  GET    /api/health                                  - Health check");
    println!("  POST   /api/host-zones                              - Register host zone");
    println!("  GET    /api/host-zones                              - List host zones");
    println!("  GET    /api/host-zones/:chain_id                    - Host zone details");
    println!("  POST   /api/host-zones/:chain_id/reconcile          - Re-request pending accounts");
    println!("  POST   /api/host-zones/:chain_id/accounts/:role     - Account opened callback");
    println!("  POST   /api/host-zones/:chain_id/validators         - Add validator");
    println!("  DELETE /api/host-zones/:chain_id/validators/:addr   - Delete validator");
    println!("  GET    /api/epoch-unbonding-records                 - List epochs");
    println!("  GET    /api/epoch-unbonding-records/latest          - Latest epoch");
    println!("  POST   /api/epoch-unbonding-records                 - Start epoch");
    println!("  GET    /api/account-requests                        - Queued account requests");
    println!("  POST   /api/account-requests/drain                  - Drain queued requests");
    println!("  GET    /api/events                                  - Recent events");
    println!("  WS     /ws/events                                   - Live event stream");
    println!();

    tracing::info!(target: "stakeibc::api", %addr, "API server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

// =============================================================================
// Tests
// =============================================================================
