use std::sync::Arc;

use crate::cache::EphemeralCache;
use crate::device::DeviceEventProcessor;
use crate::orders::OrderManager;
use crate::store::Store;

/// Shared gateway state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub cache: Arc<dyn EphemeralCache>,
    pub orders: Arc<OrderManager>,
    pub events: Arc<DeviceEventProcessor>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn EphemeralCache>) -> Self {
        let orders = Arc::new(OrderManager::new(store.clone(), cache.clone()));
        let events = Arc::new(DeviceEventProcessor::new(store.clone(), cache.clone()));
        Self {
            store,
            cache,
            orders,
            events,
        }
    }
}
