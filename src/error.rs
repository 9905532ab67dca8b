//! Service Error Types
//!
//! One taxonomy for the whole core: not-found, precondition failures,
//! and internal errors. Error codes feed the API response mapping.

use thiserror::Error;

use crate::core_types::Amount;
use crate::models::OrderStatus;

/// Service error taxonomy
///
/// Variants group into three classes:
/// - NotFound: unknown user/device/order (404)
/// - Precondition: wrong state, insufficient funds, bad input (400/422)
/// - Internal: storage or unexpected handler failure (500)
#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    // === Not Found ===
    #[error("User not found: {0}")]
    UserNotFound(i64),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    // === Preconditions ===
    #[error("Device {devid} is not available (status: {status})")]
    DeviceUnavailable { devid: String, status: String },

    #[error("Insufficient balance: have {balance}, need {required}")]
    InsufficientBalance { balance: Amount, required: Amount },

    #[error("Order {order_no} cannot {op} from state {from}")]
    InvalidTransition {
        order_no: String,
        from: OrderStatus,
        op: &'static str,
    },

    #[error("Order does not belong to the requesting user")]
    NotOrderOwner,

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Duration must be greater than zero")]
    InvalidDuration,

    #[error("Invalid callback payload: {0}")]
    InvalidPayload(String),

    // === Internal ===
    #[error("Order number already exists: {0}")]
    DuplicateOrderNo(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal system error: {0}")]
    SystemError(String),
}

impl ServiceError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::UserNotFound(_) => "USER_NOT_FOUND",
            ServiceError::DeviceNotFound(_) => "DEVICE_NOT_FOUND",
            ServiceError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            ServiceError::DeviceUnavailable { .. } => "DEVICE_UNAVAILABLE",
            ServiceError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            ServiceError::InvalidTransition { .. } => "INVALID_TRANSITION",
            ServiceError::NotOrderOwner => "NOT_ORDER_OWNER",
            ServiceError::InvalidAmount => "INVALID_AMOUNT",
            ServiceError::InvalidDuration => "INVALID_DURATION",
            ServiceError::InvalidPayload(_) => "INVALID_PAYLOAD",
            ServiceError::DuplicateOrderNo(_) => "DUPLICATE_ORDER_NO",
            ServiceError::DatabaseError(_) => "DATABASE_ERROR",
            ServiceError::SystemError(_) => "SYSTEM_ERROR",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::UserNotFound(_)
            | ServiceError::DeviceNotFound(_)
            | ServiceError::OrderNotFound(_) => 404,
            ServiceError::InvalidAmount
            | ServiceError::InvalidDuration
            | ServiceError::InvalidPayload(_) => 400,
            ServiceError::DeviceUnavailable { .. }
            | ServiceError::InsufficientBalance { .. }
            | ServiceError::InvalidTransition { .. }
            | ServiceError::NotOrderOwner => 422,
            ServiceError::DuplicateOrderNo(_)
            | ServiceError::DatabaseError(_)
            | ServiceError::SystemError(_) => 500,
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::DatabaseError(e.to_string())
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(e: anyhow::Error) -> Self {
        ServiceError::SystemError(e.to_string())
    }
}
