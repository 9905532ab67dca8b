//! Ephemeral State Cache
//!
//! TTL-based key-value store publishing device liveness, the current
//! serving order, last error, and a denormalized order-status mirror.
//!
//! Best-effort only: every write may be dropped, delayed, or race with
//! another writer. The durable Device/Order records are always
//! authoritative on conflict; readers must tolerate absent keys.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

/// Capability interface for the coordination cache.
///
/// Injected into both the event processor and the order lifecycle manager
/// so tests can swap in whatever implementation they need. Never accessed
/// as ambient global state.
#[async_trait]
pub trait EphemeralCache: Send + Sync {
    /// Store a value under `key`, expiring after `ttl`
    async fn set(&self, key: &str, value: String, ttl: Duration);

    /// Fetch a live value; expired or missing keys return None
    async fn get(&self, key: &str) -> Option<String>;

    /// Remove a key (absent keys are fine)
    async fn del(&self, key: &str);
}

/// Cache key conventions and TTLs
pub mod keys {
    use std::time::Duration;

    /// Liveness TTL; each heartbeat refreshes it
    pub const DEVICE_ONLINE_TTL: Duration = Duration::from_secs(30);
    /// Last reported device error
    pub const DEVICE_ERROR_TTL: Duration = Duration::from_secs(3600);
    /// Denormalized order status mirror for closed orders
    pub const ORDER_STATUS_TTL: Duration = Duration::from_secs(3600);

    pub fn device_online(devid: &str) -> String {
        format!("device:{}:online", devid)
    }

    pub fn device_current_order(devid: &str) -> String {
        format!("device:{}:current_order", devid)
    }

    pub fn device_error(devid: &str) -> String {
        format!("device:{}:error", devid)
    }

    pub fn order_status(order_no: &str) -> String {
        format!("order:{}:status", order_no)
    }
}

/// In-process cache implementation backed by a concurrent map.
///
/// Expired entries are evicted lazily on read; `purge_expired` sweeps
/// the rest for long-running processes.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, (String, Instant)>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-expired) entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.value().1 > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, (_, deadline)| *deadline > now);
    }
}

#[async_trait]
impl EphemeralCache for MemoryCache {
    async fn set(&self, key: &str, value: String, ttl: Duration) {
        self.entries
            .insert(key.to_string(), (value, Instant::now() + ttl));
    }

    async fn get(&self, key: &str) -> Option<String> {
        let expired = match self.entries.get(key) {
            Some(entry) => {
                let (value, deadline) = entry.value();
                if *deadline > Instant::now() {
                    return Some(value.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    async fn del(&self, key: &str) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_del() {
        let cache = MemoryCache::new();
        cache
            .set("device:CW-01:online", "1".into(), Duration::from_secs(30))
            .await;

        assert_eq!(cache.get("device:CW-01:online").await, Some("1".into()));

        cache.del("device:CW-01:online").await;
        assert_eq!(cache.get("device:CW-01:online").await, None);
    }

    #[tokio::test]
    async fn test_missing_key() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("no:such:key").await, None);
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let cache = MemoryCache::new();
        cache
            .set("k", "v".into(), Duration::from_millis(20))
            .await;
        assert_eq!(cache.get("k").await, Some("v".into()));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_set_refreshes_ttl() {
        let cache = MemoryCache::new();
        cache
            .set("k", "v1".into(), Duration::from_millis(20))
            .await;
        cache.set("k", "v2".into(), Duration::from_secs(30)).await;

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("k").await, Some("v2".into()));
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let cache = MemoryCache::new();
        cache
            .set("gone", "v".into(), Duration::from_millis(10))
            .await;
        cache.set("kept", "v".into(), Duration::from_secs(30)).await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        cache.purge_expired();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("kept").await, Some("v".into()));
    }

    #[test]
    fn test_key_conventions() {
        assert_eq!(keys::device_online("CW-01"), "device:CW-01:online");
        assert_eq!(
            keys::device_current_order("CW-01"),
            "device:CW-01:current_order"
        );
        assert_eq!(keys::device_error("CW-01"), "device:CW-01:error");
        assert_eq!(keys::order_status("W17222"), "order:W17222:status");
    }
}
