//! TTL-based cache for the device list endpoint
//!
//! Uses the `cached` crate for automatic TTL expiration. Fleet dashboards
//! poll the device list aggressively; administrative changes become visible
//! within TTL_SECONDS without restarting the gateway.

use cached::proc_macro::cached;
use std::sync::Arc;

use crate::error::ServiceError;
use crate::models::Device;
use crate::store::Store;

/// TTL for the device list cache in seconds
pub const TTL_SECONDS: u64 = 5;

/// Load the device fleet with caching
///
/// Results are cached for TTL_SECONDS. After expiration, the next call
/// refreshes from the store.
#[cached(
    time = 5,
    key = "String",
    convert = r#"{ "devices".to_string() }"#,
    result = true
)]
pub async fn load_devices_cached(store: Arc<dyn Store>) -> Result<Vec<Device>, String> {
    tracing::debug!("[cache] Loading devices from store");
    store
        .list_devices(500, 0)
        .await
        .map_err(|e: ServiceError| format!("Failed to load devices: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_constant() {
        assert_eq!(TTL_SECONDS, 5);
    }
}
