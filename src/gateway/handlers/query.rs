//! Read paths: order and device detail/list

use axum::{
    extract::{Path, Query, State},
};

use super::super::cache::load_devices_cached;
use super::super::state::AppState;
use super::super::types::{
    ApiError, ApiResult, DeviceData, ListDevicesQuery, ListOrdersQuery, OrderData, ok,
};
use crate::cache::keys;
use crate::error::ServiceError;
use crate::models::Device;

const DEFAULT_PAGE: i64 = 50;
const MAX_PAGE: i64 = 500;

fn page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    (
        limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE),
        offset.unwrap_or(0).max(0),
    )
}

/// Get one order by order number
///
/// GET /api/v1/orders/{order_no}
#[utoipa::path(
    get,
    path = "/api/v1/orders/{order_no}",
    params(("order_no" = String, Path, description = "Order number")),
    responses(
        (status = 200, description = "Order detail", body = OrderData),
        (status = 404, description = "Unknown order")
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_no): Path<String>,
) -> ApiResult<OrderData> {
    let order = state
        .store
        .get_order_by_no(&order_no)
        .await?
        .ok_or(ServiceError::OrderNotFound(order_no))?;
    ok(order.into())
}

/// List orders, optionally filtered by user
///
/// GET /api/v1/orders
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(ListOrdersQuery),
    responses((status = 200, description = "Order list", body = [OrderData])),
    tag = "Orders"
)]
pub async fn get_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> ApiResult<Vec<OrderData>> {
    let (limit, offset) = page(query.limit, query.offset);
    let orders = state.store.list_orders(query.user_id, limit, offset).await?;
    ok(orders.into_iter().map(OrderData::from).collect())
}

/// Get one device by its external identifier
///
/// GET /api/v1/devices/{devid}
///
/// Supplements the durable record with cache-derived liveness, the
/// current serving order, and the last error. Absent cache keys simply
/// mean "no signal"; the durable record stays authoritative.
#[utoipa::path(
    get,
    path = "/api/v1/devices/{devid}",
    params(("devid" = String, Path, description = "External device identifier")),
    responses(
        (status = 200, description = "Device detail", body = DeviceData),
        (status = 404, description = "Unknown device")
    ),
    tag = "Devices"
)]
pub async fn get_device(
    State(state): State<AppState>,
    Path(devid): Path<String>,
) -> ApiResult<DeviceData> {
    let device = state
        .store
        .get_device_by_devid(&devid)
        .await?
        .ok_or(ServiceError::DeviceNotFound(devid))?;

    ok(decorate_device(&state, device).await)
}

/// List the device fleet
///
/// GET /api/v1/devices
///
/// Served from a short-TTL cache of the durable records.
#[utoipa::path(
    get,
    path = "/api/v1/devices",
    params(ListDevicesQuery),
    responses((status = 200, description = "Device list", body = [DeviceData])),
    tag = "Devices"
)]
pub async fn get_devices(
    State(state): State<AppState>,
    Query(query): Query<ListDevicesQuery>,
) -> ApiResult<Vec<DeviceData>> {
    let devices = load_devices_cached(state.store.clone())
        .await
        .map_err(ApiError::internal)?;

    let (limit, offset) = page(query.limit, query.offset);
    let mut out = Vec::new();
    for device in devices
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
    {
        out.push(decorate_device(&state, device).await);
    }
    ok(out)
}

async fn decorate_device(state: &AppState, device: Device) -> DeviceData {
    let online = state
        .cache
        .get(&keys::device_online(&device.devid))
        .await
        .is_some();
    let current_order = state
        .cache
        .get(&keys::device_current_order(&device.devid))
        .await;
    let last_error = state
        .cache
        .get(&keys::device_error(&device.devid))
        .await
        .and_then(|raw| serde_json::from_str(&raw).ok());

    DeviceData::new(device, online, current_order, last_error)
}
