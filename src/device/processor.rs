//! Device Event Processor
//!
//! Consumes one callback at a time: resolve device, append the log row,
//! dispatch to exactly one handler, finalize the log with the outcome.
//!
//! Device-status writes are last-writer-wins. Two near-simultaneous
//! callbacks for the same device race freely; the physical machine emits
//! events one at a time, so they are causally ordered at the source.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::event::DeviceEvent;
use crate::cache::{EphemeralCache, keys};
use crate::error::ServiceError;
use crate::models::{Device, DeviceStatus, ProcessStatus};
use crate::store::{NewDeviceLog, Store};

pub struct DeviceEventProcessor {
    store: Arc<dyn Store>,
    cache: Arc<dyn EphemeralCache>,
}

impl DeviceEventProcessor {
    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn EphemeralCache>) -> Self {
        Self { store, cache }
    }

    /// Process one device callback.
    ///
    /// Fails with `DeviceNotFound` when the external identifier is unknown.
    /// A handler failure finalizes the log row as `failed` with the captured
    /// message and re-raises; the already-persisted log row is never rolled
    /// back.
    pub async fn handle_callback(
        &self,
        devid: &str,
        event_type: &str,
        payload: &serde_json::Value,
        timestamp: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let device = self
            .store
            .get_device_by_devid(devid)
            .await?
            .ok_or_else(|| ServiceError::DeviceNotFound(devid.to_string()))?;

        let log_id = self
            .store
            .insert_device_log(&NewDeviceLog {
                device_id: device.id,
                devid: device.devid.clone(),
                event_type: event_type.to_string(),
                payload: payload.clone(),
                event_time: timestamp,
            })
            .await?;

        let result = self.dispatch(device, event_type, payload, timestamp).await;

        match result {
            Ok(order_no) => {
                self.store
                    .finalize_device_log(log_id, ProcessStatus::Processed, order_no.as_deref(), None)
                    .await?;
                Ok(())
            }
            Err(e) => {
                // Best effort: the failure itself is what we surface
                if let Err(log_err) = self
                    .store
                    .finalize_device_log(log_id, ProcessStatus::Failed, None, Some(&e.to_string()))
                    .await
                {
                    warn!(devid = %devid, error = %log_err, "Failed to finalize device log");
                }
                Err(e)
            }
        }
    }

    /// Parse and route to exactly one handler.
    ///
    /// Returns the correlated order number (wash events) so the caller can
    /// attach it to the log row.
    async fn dispatch(
        &self,
        device: Device,
        event_type: &str,
        payload: &serde_json::Value,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<String>, ServiceError> {
        let event = DeviceEvent::parse(event_type, payload)?;
        let order_no = event.order_no().map(str::to_string);

        match event {
            DeviceEvent::Heartbeat => self.on_heartbeat(device, timestamp).await?,
            DeviceEvent::StatusChange { status, location } => {
                self.on_status_change(device, status, location, timestamp)
                    .await?
            }
            DeviceEvent::WashStart {
                ref order_no,
                duration_minutes,
            } => {
                self.on_wash_start(device, order_no, duration_minutes)
                    .await?
            }
            DeviceEvent::WashEnd { ref order_no, .. } => {
                self.on_wash_end(device, order_no).await?
            }
            DeviceEvent::Error { code, message } => {
                self.on_error(device, code, message, timestamp).await?
            }
            DeviceEvent::Unknown { event_type } => {
                // A no-op event is not a failure; the log row still records it
                info!(devid = %device.devid, event_type = %event_type, "Ignoring unknown device event");
            }
        }

        Ok(order_no)
    }

    /// heartbeat: device is alive. Idempotent beyond the timestamp refresh.
    async fn on_heartbeat(
        &self,
        mut device: Device,
        timestamp: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        device.status = DeviceStatus::Online;
        device.last_online_at = Some(timestamp);
        self.store.save_device(&device).await?;

        self.cache
            .set(
                &keys::device_online(&device.devid),
                "1".to_string(),
                keys::DEVICE_ONLINE_TTL,
            )
            .await;
        Ok(())
    }

    /// status_change: apply provided fields verbatim
    async fn on_status_change(
        &self,
        mut device: Device,
        status: Option<DeviceStatus>,
        location: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        if let Some(status) = status {
            device.status = status;
            match status {
                DeviceStatus::Online => device.last_online_at = Some(timestamp),
                DeviceStatus::Offline => device.last_offline_at = Some(timestamp),
                _ => {}
            }
        }
        if let Some(location) = location {
            device.location = Some(location);
        }
        self.store.save_device(&device).await?;
        Ok(())
    }

    /// wash_start: machine began serving the correlated order
    async fn on_wash_start(
        &self,
        mut device: Device,
        order_no: &str,
        duration_minutes: u32,
    ) -> Result<(), ServiceError> {
        device.status = DeviceStatus::Busy;
        self.store.save_device(&device).await?;

        self.cache
            .set(
                &keys::device_current_order(&device.devid),
                order_no.to_string(),
                Duration::from_secs(u64::from(duration_minutes) * 60),
            )
            .await;

        info!(devid = %device.devid, order_no = %order_no, "Wash started");
        Ok(())
    }

    /// wash_end: machine is free again
    async fn on_wash_end(&self, mut device: Device, order_no: &str) -> Result<(), ServiceError> {
        device.status = DeviceStatus::Online;
        self.store.save_device(&device).await?;

        self.cache
            .del(&keys::device_current_order(&device.devid))
            .await;

        info!(devid = %device.devid, order_no = %order_no, "Wash ended");
        Ok(())
    }

    /// error: fault report; details published with a 1-hour TTL
    async fn on_error(
        &self,
        mut device: Device,
        code: Option<String>,
        message: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        device.status = DeviceStatus::Error;
        self.store.save_device(&device).await?;

        let detail = serde_json::json!({
            "code": code,
            "message": message,
            "timestamp": timestamp.to_rfc3339(),
        });
        self.cache
            .set(
                &keys::device_error(&device.devid),
                detail.to_string(),
                keys::DEVICE_ERROR_TTL,
            )
            .await;

        warn!(devid = %device.devid, "Device reported error");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::store::MemStore;
    use serde_json::json;

    fn setup() -> (Arc<MemStore>, Arc<MemoryCache>, DeviceEventProcessor) {
        let store = Arc::new(MemStore::new());
        let cache = Arc::new(MemoryCache::new());
        let processor = DeviceEventProcessor::new(store.clone(), cache.clone());
        (store, cache, processor)
    }

    #[tokio::test]
    async fn test_unknown_device_is_not_found() {
        let (_, _, processor) = setup();
        let err = processor
            .handle_callback("GHOST", "heartbeat", &json!({}), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DeviceNotFound(_)));
    }

    #[tokio::test]
    async fn test_heartbeat_sets_online_and_cache() {
        let (store, cache, processor) = setup();
        let device = store.seed_device("CW-01", "bay 1");

        processor
            .handle_callback("CW-01", "heartbeat", &json!({}), Utc::now())
            .await
            .unwrap();

        let device = store.get_device(device.id).await.unwrap().unwrap();
        assert_eq!(device.status, DeviceStatus::Online);
        assert!(device.last_online_at.is_some());
        assert_eq!(
            cache.get(&keys::device_online("CW-01")).await,
            Some("1".into())
        );
    }

    #[tokio::test]
    async fn test_heartbeat_is_idempotent() {
        let (store, _, processor) = setup();
        let device = store.seed_device("CW-01", "bay 1");

        for _ in 0..2 {
            processor
                .handle_callback("CW-01", "heartbeat", &json!({}), Utc::now())
                .await
                .unwrap();
            let device = store.get_device(device.id).await.unwrap().unwrap();
            assert_eq!(device.status, DeviceStatus::Online);
        }

        // Each callback still appends its own log row
        let logs = store.list_device_logs(device.id, 10).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert!(
            logs.iter()
                .all(|l| l.process_status == ProcessStatus::Processed)
        );
    }

    #[tokio::test]
    async fn test_status_change_offline_stamps_timestamp() {
        let (store, _, processor) = setup();
        let device = store.seed_device("CW-01", "bay 1");

        processor
            .handle_callback(
                "CW-01",
                "status_change",
                &json!({"status": "offline"}),
                Utc::now(),
            )
            .await
            .unwrap();

        let device = store.get_device(device.id).await.unwrap().unwrap();
        assert_eq!(device.status, DeviceStatus::Offline);
        assert!(device.last_offline_at.is_some());
        assert!(device.last_online_at.is_none());
    }

    #[tokio::test]
    async fn test_wash_start_publishes_current_order() {
        let (store, cache, processor) = setup();
        let device = store.seed_device("CW-01", "bay 1");

        processor
            .handle_callback(
                "CW-01",
                "wash_start",
                &json!({"orderNo": "W42", "duration": 15}),
                Utc::now(),
            )
            .await
            .unwrap();

        let device = store.get_device(device.id).await.unwrap().unwrap();
        assert_eq!(device.status, DeviceStatus::Busy);
        assert_eq!(
            cache.get(&keys::device_current_order("CW-01")).await,
            Some("W42".into())
        );

        // Correlated order is attached to the log row
        let logs = store.list_device_logs(device.id, 10).await.unwrap();
        assert_eq!(logs[0].order_no.as_deref(), Some("W42"));
    }

    #[tokio::test]
    async fn test_wash_round_trip_clears_current_order() {
        let (store, cache, processor) = setup();
        let device = store.seed_device("CW-01", "bay 1");

        processor
            .handle_callback(
                "CW-01",
                "wash_start",
                &json!({"orderNo": "W42", "duration": 15}),
                Utc::now(),
            )
            .await
            .unwrap();
        processor
            .handle_callback(
                "CW-01",
                "wash_end",
                &json!({"orderNo": "W42", "result": {"ok": true}}),
                Utc::now(),
            )
            .await
            .unwrap();

        let device = store.get_device(device.id).await.unwrap().unwrap();
        assert_eq!(device.status, DeviceStatus::Online);
        assert_eq!(cache.get(&keys::device_current_order("CW-01")).await, None);
    }

    #[tokio::test]
    async fn test_error_event_publishes_detail() {
        let (store, cache, processor) = setup();
        let device = store.seed_device("CW-01", "bay 1");

        processor
            .handle_callback(
                "CW-01",
                "error",
                &json!({"code": "E07", "message": "pump jam"}),
                Utc::now(),
            )
            .await
            .unwrap();

        let device = store.get_device(device.id).await.unwrap().unwrap();
        assert_eq!(device.status, DeviceStatus::Error);

        let detail = cache.get(&keys::device_error("CW-01")).await.unwrap();
        let detail: serde_json::Value = serde_json::from_str(&detail).unwrap();
        assert_eq!(detail["code"], "E07");
        assert_eq!(detail["message"], "pump jam");
    }

    #[tokio::test]
    async fn test_unknown_event_type_is_processed_noop() {
        let (store, _, processor) = setup();
        let device = store.seed_device("CW-01", "bay 1");

        processor
            .handle_callback("CW-01", "firmware_update", &json!({"v": 2}), Utc::now())
            .await
            .unwrap();

        // No state mutation, but the log row is finalized as processed
        let device = store.get_device(device.id).await.unwrap().unwrap();
        assert_eq!(device.status, DeviceStatus::Offline);
        let logs = store.list_device_logs(device.id, 10).await.unwrap();
        assert_eq!(logs[0].process_status, ProcessStatus::Processed);
    }

    #[tokio::test]
    async fn test_malformed_payload_marks_log_failed() {
        let (store, _, processor) = setup();
        let device = store.seed_device("CW-01", "bay 1");

        let err = processor
            .handle_callback("CW-01", "wash_start", &json!({"duration": 15}), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidPayload(_)));

        let logs = store.list_device_logs(device.id, 10).await.unwrap();
        assert_eq!(logs[0].process_status, ProcessStatus::Failed);
        assert!(logs[0].error_message.is_some());
    }
}
