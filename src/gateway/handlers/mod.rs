//! HTTP handlers
//!
//! Thin layer over the processor/manager: deserialize, delegate, wrap in
//! the unified response envelope.

pub mod device;
pub mod health;
pub mod order;
pub mod query;

// Glob re-exports keep the utoipa-generated path items reachable for
// the OpenAPI document alongside the handlers themselves.
pub use device::*;
pub use health::*;
pub use order::*;
pub use query::*;
