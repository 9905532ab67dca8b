//! Device event ingestion
//!
//! Physical machines report events through unauthenticated HTTP callbacks:
//! heartbeat, status change, wash start/end, error. Every callback is
//! recorded as a [`crate::models::DeviceLog`] row before dispatch, then one
//! handler per event kind mutates device state and publishes cache entries.
//!
//! # Reconciliation rule
//!
//! Device state and order state are driven by two independent call paths
//! (callbacks here, HTTP order transitions in [`crate::orders`]). The device
//! heartbeat is authoritative for device status; order transitions are
//! authoritative for billing. A transient mismatch (order `using`, device
//! not) is recoverable and resolves on the next heartbeat.

pub mod event;
pub mod processor;

pub use event::DeviceEvent;
pub use processor::DeviceEventProcessor;
