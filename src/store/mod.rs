//! Durable storage layer
//!
//! The relational store is the single source of truth and the
//! serialization point for conflicting writes. Money-sensitive
//! operations (order create, cancel refund) execute check + mutation
//! as one atomic unit here, never as separate calls.
//!
//! Two implementations:
//! - [`PgStore`] - PostgreSQL via sqlx (production)
//! - [`MemStore`] - mutex-serialized maps (dev mode, tests)

pub mod memory;
pub mod postgres;
pub mod schema;

pub use memory::MemStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core_types::{Amount, DeviceId, DeviceLogId, OrderId, UserId};
use crate::error::ServiceError;
use crate::models::{Device, DeviceLog, Order, OrderStatus, ProcessStatus, User};

/// Fields of a device log known before dispatch
#[derive(Debug, Clone)]
pub struct NewDeviceLog {
    pub device_id: DeviceId,
    pub devid: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub event_time: DateTime<Utc>,
}

/// Optional field updates applied together with an order status CAS.
///
/// Only `Some` fields are written; everything else is left untouched.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub payment_ref: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u32>,
}

/// Storage operations consumed by the event processor, the order
/// lifecycle manager, and the query surface.
#[async_trait]
pub trait Store: Send + Sync {
    // === Users / balance ===

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>, ServiceError>;

    /// Credit a user's balance (top-up or standalone refund path)
    async fn credit_balance(&self, user_id: UserId, amount: Amount) -> Result<(), ServiceError>;

    // === Devices ===

    async fn get_device(&self, device_id: DeviceId) -> Result<Option<Device>, ServiceError>;

    async fn get_device_by_devid(&self, devid: &str) -> Result<Option<Device>, ServiceError>;

    async fn list_devices(&self, limit: i64, offset: i64) -> Result<Vec<Device>, ServiceError>;

    /// Full-row device write, last-writer-wins.
    ///
    /// Device events are causally ordered by the physical machine, so the
    /// processor deliberately performs no read-modify-write locking here.
    async fn save_device(&self, device: &Device) -> Result<(), ServiceError>;

    // === Device logs ===

    async fn insert_device_log(&self, log: &NewDeviceLog) -> Result<DeviceLogId, ServiceError>;

    /// Record the dispatch outcome on a previously inserted log row.
    /// Called exactly once per callback.
    async fn finalize_device_log(
        &self,
        log_id: DeviceLogId,
        status: ProcessStatus,
        order_no: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<(), ServiceError>;

    async fn list_device_logs(
        &self,
        device_id: DeviceId,
        limit: i64,
    ) -> Result<Vec<DeviceLog>, ServiceError>;

    // === Orders ===

    /// Insert a new order AND debit the owner's balance as one atomic unit.
    ///
    /// Both happen or neither does. The debit is conditional on sufficient
    /// funds, which closes the check-then-act race between concurrent
    /// creates for the same user.
    ///
    /// # Errors
    /// - `InsufficientBalance` if the conditional debit matched no row
    /// - `UserNotFound` if the user disappeared
    /// - `DuplicateOrderNo` if `order_no` already exists (caller re-derives)
    async fn create_order_debiting_balance(&self, order: &Order) -> Result<Order, ServiceError>;

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, ServiceError>;

    async fn get_order_by_no(&self, order_no: &str) -> Result<Option<Order>, ServiceError>;

    async fn list_orders(
        &self,
        user_id: Option<UserId>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, ServiceError>;

    /// Atomic CAS update: move `order_no` from `expected` to `new` and apply
    /// the patch, only if the current status matches `expected`.
    ///
    /// Returns true if the transition was applied, false if the status had
    /// already moved (caller decides whether that is an error).
    async fn update_order_status_if(
        &self,
        order_no: &str,
        expected: OrderStatus,
        new: OrderStatus,
        patch: &OrderPatch,
    ) -> Result<bool, ServiceError>;

    /// Atomic cancel: CAS the order from `expected` to CANCELLED and credit
    /// `refund` back to the owner in the same unit of work, mirroring the
    /// debit-on-create pairing.
    ///
    /// Returns true if applied; false if the status had already moved (no
    /// credit happens in that case).
    async fn cancel_order_refunding(
        &self,
        order_id: OrderId,
        expected: OrderStatus,
        refund: Amount,
    ) -> Result<bool, ServiceError>;
}
