//! Core types used throughout the system
//!
//! Fundamental type aliases shared by all modules. They carry semantic
//! meaning and keep the door open for future type evolution.

/// User ID - primary key of the user record.
///
/// # Usage:
/// - Owner reference on orders
/// - Balance lookups
pub type UserId = i64;

/// Internal device ID - primary key of the device record.
///
/// Distinct from the external `devid` string the physical machine reports
/// in callbacks; all callback resolution goes through `devid`.
pub type DeviceId = i64;

/// Order ID - primary key of the order record.
///
/// The external idempotency key is the `order_no` string, not this ID.
pub type OrderId = i64;

/// Device log ID - primary key of one received callback record
pub type DeviceLogId = i64;

/// Merchant ID - read-only foreign key for this core
pub type MerchantId = i64;

/// Store ID - read-only foreign key for this core
pub type StoreId = i64;

/// Money amount in minor currency units (cents)
pub type Amount = u64;
