//! Order lifecycle handlers (create, pay, start, complete, cancel)

use axum::{
    Json,
    extract::{Path, State},
};

use super::super::state::AppState;
use super::super::types::{
    ApiResult, CancelOrderRequest, CompleteWashRequest, CreateOrderRequest, OrderData,
    PayOrderRequest, ok,
};

/// Create order endpoint
///
/// POST /api/v1/orders
///
/// Creates the order in `pending` and debits the prepaid balance in the
/// same unit of work. Caller identity arrives in the body; authentication
/// is handled upstream.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created", body = OrderData),
        (status = 404, description = "Unknown user or device"),
        (status = 422, description = "Device unavailable or insufficient balance")
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<OrderData> {
    let order = state
        .orders
        .create(
            req.user_id,
            &req.devid,
            &req.wash_type,
            req.duration_minutes,
            req.amount,
        )
        .await?;
    ok(order.into())
}

/// Pay order endpoint
///
/// POST /api/v1/orders/{order_no}/pay
#[utoipa::path(
    post,
    path = "/api/v1/orders/{order_no}/pay",
    params(("order_no" = String, Path, description = "Order number")),
    request_body = PayOrderRequest,
    responses(
        (status = 200, description = "Order paid", body = OrderData),
        (status = 404, description = "Unknown order"),
        (status = 422, description = "Order is not pending")
    ),
    tag = "Orders"
)]
pub async fn pay_order(
    State(state): State<AppState>,
    Path(order_no): Path<String>,
    Json(req): Json<PayOrderRequest>,
) -> ApiResult<OrderData> {
    let order = state.orders.pay(&order_no, &req.method).await?;
    ok(order.into())
}

/// Start wash endpoint
///
/// POST /api/v1/orders/{order_no}/start
///
/// Invoked by operator tooling or device-adjacent automation, not end
/// users.
#[utoipa::path(
    post,
    path = "/api/v1/orders/{order_no}/start",
    params(("order_no" = String, Path, description = "Order number")),
    responses(
        (status = 200, description = "Wash started", body = OrderData),
        (status = 404, description = "Unknown order"),
        (status = 422, description = "Order is not paid")
    ),
    tag = "Orders"
)]
pub async fn start_wash(
    State(state): State<AppState>,
    Path(order_no): Path<String>,
) -> ApiResult<OrderData> {
    let order = state.orders.start_wash(&order_no).await?;
    ok(order.into())
}

/// Complete wash endpoint
///
/// POST /api/v1/orders/{order_no}/complete
#[utoipa::path(
    post,
    path = "/api/v1/orders/{order_no}/complete",
    params(("order_no" = String, Path, description = "Order number")),
    request_body = CompleteWashRequest,
    responses(
        (status = 200, description = "Wash completed", body = OrderData),
        (status = 404, description = "Unknown order"),
        (status = 422, description = "Order is not in use")
    ),
    tag = "Orders"
)]
pub async fn complete_wash(
    State(state): State<AppState>,
    Path(order_no): Path<String>,
    Json(req): Json<CompleteWashRequest>,
) -> ApiResult<OrderData> {
    let order = state
        .orders
        .complete_wash(&order_no, req.actual_duration)
        .await?;
    ok(order.into())
}

/// Cancel order endpoint
///
/// POST /api/v1/orders/cancel
///
/// User-invoked; ownership is re-checked in the core against the
/// requesting user carried in the body.
#[utoipa::path(
    post,
    path = "/api/v1/orders/cancel",
    request_body = CancelOrderRequest,
    responses(
        (status = 200, description = "Order cancelled, refund credited", body = OrderData),
        (status = 404, description = "Unknown order"),
        (status = 422, description = "Not the owner or order not cancellable")
    ),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    Json(req): Json<CancelOrderRequest>,
) -> ApiResult<OrderData> {
    let order = state.orders.cancel(req.order_id, req.user_id).await?;
    ok(order.into())
}
