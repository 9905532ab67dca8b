//! Gateway types
//!
//! Request/response DTOs, the unified `ApiResponse` envelope, and the
//! mapping from [`ServiceError`] to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::ServiceError;
use crate::models::{Device, Order};

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or absent (error)
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    /// Response data (only present when code == 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create success response
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Create error response
    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

/// Standard API error codes
pub mod error_codes {
    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_BALANCE: i32 = 1002;
    pub const DEVICE_UNAVAILABLE: i32 = 1003;
    pub const INVALID_TRANSITION: i32 = 1004;
    pub const NOT_ORDER_OWNER: i32 = 1005;

    // Resource errors (4xxx)
    pub const USER_NOT_FOUND: i32 = 4001;
    pub const DEVICE_NOT_FOUND: i32 = 4002;
    pub const ORDER_NOT_FOUND: i32 = 4003;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
}

// ============================================================================
// API Error
// ============================================================================

/// HTTP-mapped error, rendered as `ApiResponse` with no data
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
            msg,
        )
    }

    pub fn into_err<T>(self) -> ApiResult<T> {
        Err(self)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiResponse::<()>::error(self.code, self.msg)),
        )
            .into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        let status = match e.http_status() {
            400 => StatusCode::BAD_REQUEST,
            404 => StatusCode::NOT_FOUND,
            422 => StatusCode::UNPROCESSABLE_ENTITY,
            503 => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let code = match e.code() {
            "USER_NOT_FOUND" => error_codes::USER_NOT_FOUND,
            "DEVICE_NOT_FOUND" => error_codes::DEVICE_NOT_FOUND,
            "ORDER_NOT_FOUND" => error_codes::ORDER_NOT_FOUND,
            "DEVICE_UNAVAILABLE" => error_codes::DEVICE_UNAVAILABLE,
            "INSUFFICIENT_BALANCE" => error_codes::INSUFFICIENT_BALANCE,
            "INVALID_TRANSITION" => error_codes::INVALID_TRANSITION,
            "NOT_ORDER_OWNER" => error_codes::NOT_ORDER_OWNER,
            "INVALID_AMOUNT" | "INVALID_DURATION" | "INVALID_PAYLOAD" => {
                error_codes::INVALID_PARAMETER
            }
            _ => error_codes::INTERNAL_ERROR,
        };

        Self::new(status, code, e.to_string())
    }
}

/// Handler result alias: success envelope or mapped error
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Wrap data in a success envelope
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

// ============================================================================
// Request DTOs
// ============================================================================

/// Inbound device callback
///
/// Devices identify themselves by `devid` or, on some hardware revisions,
/// by the SIM `iccid`. The payload shape is event-specific.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CallbackRequest {
    pub devid: Option<String>,
    pub iccid: Option<String>,
    pub event_type: String,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    /// ISO-8601 event timestamp; server time when absent
    pub timestamp: Option<DateTime<Utc>>,
    /// Optional device signature (not verified by this core)
    pub sign: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub user_id: i64,
    pub devid: String,
    pub wash_type: String,
    pub duration_minutes: u32,
    /// Minor currency units
    pub amount: u64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PayOrderRequest {
    /// Payment method label, e.g. "wechat", "alipay", "balance"
    pub method: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CompleteWashRequest {
    /// Actual duration reported by the machine; overwrites the declared one
    pub actual_duration: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelOrderRequest {
    pub order_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListOrdersQuery {
    pub user_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListDevicesQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ============================================================================
// Response DTOs
// ============================================================================

/// Order representation returned by the API
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderData {
    pub id: i64,
    pub order_no: String,
    pub user_id: i64,
    pub device_id: i64,
    pub wash_type: String,
    pub duration_minutes: u32,
    pub amount: u64,
    #[schema(example = "pending")]
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderData {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            order_no: o.order_no,
            user_id: o.user_id,
            device_id: o.device_id,
            wash_type: o.wash_type,
            duration_minutes: o.duration_minutes,
            amount: o.amount,
            status: o.status.to_string(),
            payment_method: o.payment_method,
            payment_ref: o.payment_ref,
            paid_at: o.paid_at,
            start_time: o.start_time,
            end_time: o.end_time,
            created_at: o.created_at,
        }
    }
}

/// Device representation returned by the API
///
/// `online` is cache-derived liveness (heartbeat TTL); `status` is the
/// durable record, which wins on conflict.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceData {
    pub id: i64,
    pub devid: String,
    pub name: String,
    #[schema(example = "online")]
    pub status: String,
    pub online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_order: Option<String>,
    /// Last reported error detail, while the 1-hour cache entry lives
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_online_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_offline_at: Option<DateTime<Utc>>,
}

impl DeviceData {
    /// Build from the durable record plus cache-derived fields
    pub fn new(
        device: Device,
        online: bool,
        current_order: Option<String>,
        last_error: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: device.id,
            devid: device.devid,
            name: device.name,
            status: device.status.to_string(),
            online,
            location: device.location,
            current_order,
            last_error,
            last_online_at: device.last_online_at,
            last_offline_at: device.last_offline_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderStatus;

    #[test]
    fn test_service_error_mapping() {
        let err: ApiError = ServiceError::OrderNotFound("W1".into()).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, error_codes::ORDER_NOT_FOUND);

        let err: ApiError = ServiceError::InsufficientBalance {
            balance: 500,
            required: 1500,
        }
        .into();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code, error_codes::INSUFFICIENT_BALANCE);

        let err: ApiError = ServiceError::InvalidTransition {
            order_no: "W1".into(),
            from: OrderStatus::Completed,
            op: "pay",
        }
        .into();
        assert_eq!(err.code, error_codes::INVALID_TRANSITION);

        let err: ApiError = ServiceError::SystemError("boom".into()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code, error_codes::INTERNAL_ERROR);
    }

    #[test]
    fn test_callback_request_deserialization() {
        let json = r#"{"devid": "CW-01", "event_type": "heartbeat"}"#;
        let req: CallbackRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.devid.as_deref(), Some("CW-01"));
        assert!(req.payload.is_none());
        assert!(req.timestamp.is_none());
    }

    #[test]
    fn test_response_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::success(42)).unwrap();
        assert_eq!(body["code"], 0);
        assert_eq!(body["data"], 42);

        let body =
            serde_json::to_value(ApiResponse::<()>::error(error_codes::ORDER_NOT_FOUND, "missing"))
                .unwrap();
        assert_eq!(body["code"], 4003);
        assert!(body.get("data").is_none());
    }
}
