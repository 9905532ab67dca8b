//! Washlink - Car-Wash Fleet Backend
//!
//! Manages a fleet of unattended car-wash devices, their billable usage
//! sessions (orders), and prepaid user balances.
//!
//! # Modules
//!
//! - [`core_types`] - Core type aliases (UserId, DeviceId, etc.)
//! - [`models`] - Device, DeviceLog, Order, User entities and status enums
//! - [`balance`] - Enforced prepaid balance type
//! - [`cache`] - Ephemeral TTL key-value cache (capability trait + in-memory impl)
//! - [`store`] - Durable storage trait with PostgreSQL and in-memory backends
//! - [`device`] - Device event union and callback processor
//! - [`orders`] - Order lifecycle manager and order-number generation
//! - [`gateway`] - Axum HTTP surface
//! - [`error`] - Service error taxonomy
//! - [`config`] / [`logging`] - Startup configuration and tracing setup

// Core types - must be first!
pub mod core_types;

pub mod balance;
pub mod cache;
pub mod config;
pub mod device;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod models;
pub mod orders;
pub mod store;

// Convenient re-exports at crate root
pub use balance::Balance;
pub use cache::{EphemeralCache, MemoryCache};
pub use core_types::{Amount, DeviceId, DeviceLogId, MerchantId, OrderId, StoreId, UserId};
pub use device::{DeviceEvent, DeviceEventProcessor};
pub use error::ServiceError;
pub use models::{Device, DeviceLog, DeviceStatus, Order, OrderStatus, ProcessStatus, User};
pub use orders::OrderManager;
pub use store::{MemStore, PgStore, Store};
