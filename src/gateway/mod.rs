//! HTTP Gateway
//!
//! Axum router over the device callback endpoint, the order lifecycle
//! endpoints, and the read paths. Each inbound request is handled
//! independently; the store is the serialization point for conflicting
//! writes, so there is no in-process queue.

pub mod cache;
pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use state::AppState;

/// Build the full application router
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        // Health
        .route("/health", get(handlers::health_check))
        // Device callbacks (unauthenticated, device-originated)
        .route("/device/callback", post(handlers::device_callback))
        // Order lifecycle
        .route(
            "/orders",
            post(handlers::create_order).get(handlers::get_orders),
        )
        .route("/orders/cancel", post(handlers::cancel_order))
        .route("/orders/{order_no}", get(handlers::get_order))
        .route("/orders/{order_no}/pay", post(handlers::pay_order))
        .route("/orders/{order_no}/start", post(handlers::start_wash))
        .route("/orders/{order_no}/complete", post(handlers::complete_wash))
        // Fleet queries
        .route("/devices", get(handlers::get_devices))
        .route("/devices/{devid}", get(handlers::get_device));

    Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

/// Bind and serve until the process exits
pub async fn run_server(state: AppState, host: &str, port: u16) {
    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("FATAL: Failed to bind to {}: {}", addr, e);
            eprintln!(
                "   Hint: Port {} may already be in use. Check with: lsof -i :{}",
                port, port
            );
            std::process::exit(1);
        }
    };

    tracing::info!("Gateway listening on http://{}", addr);
    tracing::info!("API Docs: http://{}/docs", addr);
    tracing::info!("Device callback: POST /api/v1/device/callback");

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("FATAL: Server error: {}", e);
        std::process::exit(1);
    }
}
