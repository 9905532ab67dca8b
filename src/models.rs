//! Durable entities: Device, DeviceLog, Order, User
//!
//! Status enums carry SMALLINT ids for PostgreSQL storage. The durable
//! records here are always authoritative over the ephemeral cache.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::balance::Balance;
use crate::core_types::{Amount, DeviceId, DeviceLogId, MerchantId, OrderId, StoreId, UserId};

// ============================================================
// Device
// ============================================================

/// Device status
///
/// State IDs are designed for PostgreSQL storage as SMALLINT.
/// Mutated only by the event processor (last-writer-wins) and by
/// administrative writes outside this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum DeviceStatus {
    Offline = 0,
    Online = 10,
    /// Currently serving an order
    Busy = 20,
    Maintenance = 30,
    /// Device reported a fault; cleared by the next status_change/heartbeat
    Error = -10,
}

impl DeviceStatus {
    /// Get the numeric state ID for PostgreSQL storage
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    /// Convert from PostgreSQL state ID
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(DeviceStatus::Offline),
            10 => Some(DeviceStatus::Online),
            20 => Some(DeviceStatus::Busy),
            30 => Some(DeviceStatus::Maintenance),
            -10 => Some(DeviceStatus::Error),
            _ => None,
        }
    }

    /// Get human-readable status name
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Offline => "offline",
            DeviceStatus::Online => "online",
            DeviceStatus::Busy => "busy",
            DeviceStatus::Maintenance => "maintenance",
            DeviceStatus::Error => "error",
        }
    }

    /// Parse a status name as reported in a status_change payload
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "offline" => Some(DeviceStatus::Offline),
            "online" => Some(DeviceStatus::Online),
            "busy" | "using" => Some(DeviceStatus::Busy),
            "maintenance" => Some(DeviceStatus::Maintenance),
            "error" | "fault" => Some(DeviceStatus::Error),
            _ => None,
        }
    }

    /// Only an online device can accept a new order
    #[inline]
    pub fn accepts_orders(&self) -> bool {
        matches!(self, DeviceStatus::Online)
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One physical car-wash machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    /// External identifier the machine reports in callbacks (unique)
    pub devid: String,
    pub name: String,
    pub status: DeviceStatus,
    pub location: Option<String>,
    pub merchant_id: MerchantId,
    pub store_id: StoreId,
    pub last_online_at: Option<DateTime<Utc>>,
    pub last_offline_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// ============================================================
// DeviceLog
// ============================================================

/// Processing outcome of one received callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum ProcessStatus {
    Pending = 0,
    Processed = 10,
    Failed = -10,
}

impl ProcessStatus {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(ProcessStatus::Pending),
            10 => Some(ProcessStatus::Processed),
            -10 => Some(ProcessStatus::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Pending => "pending",
            ProcessStatus::Processed => "processed",
            ProcessStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only record of one received callback.
///
/// Created before dispatch, finalized exactly once after dispatch.
/// Never read back by the state machine (no log-derived decisions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceLog {
    pub id: DeviceLogId,
    pub device_id: DeviceId,
    pub devid: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    /// Correlated order, attached by wash_start/wash_end handlers
    pub order_no: Option<String>,
    pub process_status: ProcessStatus,
    pub error_message: Option<String>,
    /// Event timestamp as reported by the device
    pub event_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// ============================================================
// Order
// ============================================================

/// Order lifecycle states
///
/// ```text
/// DRAFT → PENDING → PAID → USING → COMPLETED
///              \        \
///               → CANCELLED   (from PENDING or PAID)
///                          → REFUNDED   (administrative path)
/// ```
///
/// Terminal states: COMPLETED (40), CANCELLED (-10), REFUNDED (-20)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum OrderStatus {
    Draft = 0,

    /// Created and balance debited, awaiting payment confirmation
    Pending = 10,

    /// Payment confirmed - funds are ESCROWED until completion or refund
    Paid = 20,

    /// Wash in progress on the device
    Using = 30,

    /// Terminal: wash finished
    Completed = 40,

    /// Terminal: cancelled by the user (refund credited)
    Cancelled = -10,

    /// Terminal: refunded through the administrative path
    Refunded = -20,
}

impl OrderStatus {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }

    /// Check if the user may still cancel from this state
    #[inline]
    pub fn cancellable(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Paid)
    }

    /// Get the numeric state ID for PostgreSQL storage
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    /// Convert from PostgreSQL state ID
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(OrderStatus::Draft),
            10 => Some(OrderStatus::Pending),
            20 => Some(OrderStatus::Paid),
            30 => Some(OrderStatus::Using),
            40 => Some(OrderStatus::Completed),
            -10 => Some(OrderStatus::Cancelled),
            -20 => Some(OrderStatus::Refunded),
            _ => None,
        }
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Using => "using",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for OrderStatus {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        OrderStatus::from_id(value).ok_or(())
    }
}

/// One billable device-usage session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// External idempotency key, globally unique
    pub order_no: String,
    pub user_id: UserId,
    pub device_id: DeviceId,
    pub merchant_id: MerchantId,
    pub store_id: StoreId,
    pub wash_type: String,
    /// Declared wash duration; may be overwritten with the actual value
    /// reported at completion
    pub duration_minutes: u32,
    /// Minor currency units, debited at creation
    pub amount: Amount,
    pub status: OrderStatus,
    pub payment_method: Option<String>,
    /// Simulated external payment reference
    pub payment_ref: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================
// User
// ============================================================

/// User record (balance holder)
///
/// Authentication and profile management live outside this core;
/// only identity and the prepaid balance matter here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub balance: Balance,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_terminal_states() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Refunded.is_terminal());

        assert!(!OrderStatus::Draft.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Paid.is_terminal());
        assert!(!OrderStatus::Using.is_terminal());
    }

    #[test]
    fn test_order_cancellable_states() {
        assert!(OrderStatus::Pending.cancellable());
        assert!(OrderStatus::Paid.cancellable());

        assert!(!OrderStatus::Draft.cancellable());
        assert!(!OrderStatus::Using.cancellable());
        assert!(!OrderStatus::Completed.cancellable());
        assert!(!OrderStatus::Cancelled.cancellable());
    }

    #[test]
    fn test_order_status_id_roundtrip() {
        let states = [
            OrderStatus::Draft,
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Using,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ];

        for state in states {
            let id = state.id();
            let recovered = OrderStatus::from_id(id).unwrap();
            assert_eq!(state, recovered);
        }
    }

    #[test]
    fn test_invalid_status_id() {
        assert!(OrderStatus::from_id(999).is_none());
        assert!(DeviceStatus::from_id(999).is_none());
        assert!(ProcessStatus::from_id(999).is_none());
    }

    #[test]
    fn test_device_status_parse() {
        assert_eq!(DeviceStatus::parse("online"), Some(DeviceStatus::Online));
        assert_eq!(DeviceStatus::parse("OFFLINE"), Some(DeviceStatus::Offline));
        assert_eq!(DeviceStatus::parse("using"), Some(DeviceStatus::Busy));
        assert_eq!(DeviceStatus::parse("fault"), Some(DeviceStatus::Error));
        assert_eq!(DeviceStatus::parse("unplugged"), None);
    }

    #[test]
    fn test_device_status_roundtrip() {
        for status in [
            DeviceStatus::Offline,
            DeviceStatus::Online,
            DeviceStatus::Busy,
            DeviceStatus::Maintenance,
            DeviceStatus::Error,
        ] {
            assert_eq!(DeviceStatus::from_id(status.id()), Some(status));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(OrderStatus::Pending.to_string(), "pending");
        assert_eq!(OrderStatus::Cancelled.to_string(), "cancelled");
        assert_eq!(DeviceStatus::Busy.to_string(), "busy");
        assert_eq!(ProcessStatus::Failed.to_string(), "failed");
    }
}
