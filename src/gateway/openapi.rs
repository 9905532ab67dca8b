//! OpenAPI / Swagger UI Documentation
//!
//! Auto-generated OpenAPI 3.0 documentation for the Washlink API.
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::OpenApi;

use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::{
    CallbackRequest, CancelOrderRequest, CompleteWashRequest, CreateOrderRequest, DeviceData,
    OrderData, PayOrderRequest,
};

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Washlink Fleet API",
        version = "1.0.0",
        description = "Unattended car-wash fleet backend: device event ingestion, order lifecycle, prepaid balance.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health_check,
        crate::gateway::handlers::device_callback,
        crate::gateway::handlers::create_order,
        crate::gateway::handlers::pay_order,
        crate::gateway::handlers::start_wash,
        crate::gateway::handlers::complete_wash,
        crate::gateway::handlers::cancel_order,
        crate::gateway::handlers::get_order,
        crate::gateway::handlers::get_orders,
        crate::gateway::handlers::get_device,
        crate::gateway::handlers::get_devices,
    ),
    components(
        schemas(
            HealthResponse,
            CallbackRequest,
            CreateOrderRequest,
            PayOrderRequest,
            CompleteWashRequest,
            CancelOrderRequest,
            OrderData,
            DeviceData,
        )
    ),
    tags(
        (name = "System", description = "Service health"),
        (name = "Device", description = "Device-originated callbacks"),
        (name = "Orders", description = "Order lifecycle and queries"),
        (name = "Devices", description = "Fleet queries"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generates() {
        let doc = ApiDoc::openapi();
        let json = doc.to_json().expect("OpenAPI doc should serialize");
        assert!(json.contains("/api/v1/device/callback"));
        assert!(json.contains("/api/v1/orders"));
    }
}
