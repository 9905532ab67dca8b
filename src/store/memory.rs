//! In-memory store
//!
//! Mutex-serialized maps implementing the same contract as the Postgres
//! store. One lock per operation makes the money-sensitive operations
//! naturally atomic. Used in dev mode (mem-store feature) and tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{NewDeviceLog, OrderPatch, Store};
use crate::balance::Balance;
use crate::core_types::{Amount, DeviceId, DeviceLogId, OrderId, UserId};
use crate::error::ServiceError;
use crate::models::{Device, DeviceLog, DeviceStatus, Order, OrderStatus, ProcessStatus, User};

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, User>,
    devices: HashMap<DeviceId, Device>,
    devid_index: HashMap<String, DeviceId>,
    orders: HashMap<OrderId, Order>,
    order_no_index: HashMap<String, OrderId>,
    logs: Vec<DeviceLog>,
    next_user_id: UserId,
    next_device_id: DeviceId,
    next_order_id: OrderId,
    next_log_id: DeviceLogId,
}

#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user with an initial balance
    pub fn seed_user(&self, username: &str, balance: Amount) -> User {
        let mut inner = self.inner.lock().unwrap();
        inner.next_user_id += 1;
        let user = User {
            id: inner.next_user_id,
            username: username.to_string(),
            balance: Balance::with_amount(balance),
            created_at: Utc::now(),
        };
        inner.users.insert(user.id, user.clone());
        user
    }

    /// Register a device (created offline; comes up on first heartbeat)
    pub fn seed_device(&self, devid: &str, name: &str) -> Device {
        let mut inner = self.inner.lock().unwrap();
        inner.next_device_id += 1;
        let device = Device {
            id: inner.next_device_id,
            devid: devid.to_string(),
            name: name.to_string(),
            status: DeviceStatus::Offline,
            location: None,
            merchant_id: 0,
            store_id: 0,
            last_online_at: None,
            last_offline_at: None,
            created_at: Utc::now(),
        };
        inner.devid_index.insert(devid.to_string(), device.id);
        inner.devices.insert(device.id, device.clone());
        device
    }

    /// Register a device already in the given status (test setup shortcut)
    pub fn seed_device_with_status(&self, devid: &str, name: &str, status: DeviceStatus) -> Device {
        let device = self.seed_device(devid, name);
        let mut inner = self.inner.lock().unwrap();
        let stored = inner.devices.get_mut(&device.id).unwrap();
        stored.status = status;
        stored.clone()
    }
}

fn apply_patch(order: &mut Order, patch: &OrderPatch) {
    if let Some(paid_at) = patch.paid_at {
        order.paid_at = Some(paid_at);
    }
    if let Some(method) = &patch.payment_method {
        order.payment_method = Some(method.clone());
    }
    if let Some(payment_ref) = &patch.payment_ref {
        order.payment_ref = Some(payment_ref.clone());
    }
    if let Some(start_time) = patch.start_time {
        order.start_time = Some(start_time);
    }
    if let Some(end_time) = patch.end_time {
        order.end_time = Some(end_time);
    }
    if let Some(duration) = patch.duration_minutes {
        order.duration_minutes = duration;
    }
}

#[async_trait]
impl Store for MemStore {
    async fn get_user(&self, user_id: UserId) -> Result<Option<User>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.get(&user_id).cloned())
    }

    async fn credit_balance(&self, user_id: UserId, amount: Amount) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or(ServiceError::UserNotFound(user_id))?;
        user.balance
            .credit(amount)
            .map_err(|e| ServiceError::SystemError(e.to_string()))?;
        Ok(())
    }

    async fn get_device(&self, device_id: DeviceId) -> Result<Option<Device>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.devices.get(&device_id).cloned())
    }

    async fn get_device_by_devid(&self, devid: &str) -> Result<Option<Device>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .devid_index
            .get(devid)
            .and_then(|id| inner.devices.get(id))
            .cloned())
    }

    async fn list_devices(&self, limit: i64, offset: i64) -> Result<Vec<Device>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        let mut devices: Vec<Device> = inner.devices.values().cloned().collect();
        devices.sort_by_key(|d| d.id);
        Ok(devices
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn save_device(&self, device: &Device) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        // Last-writer-wins, like the SQL UPDATE
        inner.devices.insert(device.id, device.clone());
        inner.devid_index.insert(device.devid.clone(), device.id);
        Ok(())
    }

    async fn insert_device_log(&self, log: &NewDeviceLog) -> Result<DeviceLogId, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_log_id += 1;
        let id = inner.next_log_id;
        inner.logs.push(DeviceLog {
            id,
            device_id: log.device_id,
            devid: log.devid.clone(),
            event_type: log.event_type.clone(),
            payload: log.payload.clone(),
            order_no: None,
            process_status: ProcessStatus::Pending,
            error_message: None,
            event_time: log.event_time,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn finalize_device_log(
        &self,
        log_id: DeviceLogId,
        status: ProcessStatus,
        order_no: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(log) = inner.logs.iter_mut().find(|l| l.id == log_id) {
            log.process_status = status;
            if let Some(order_no) = order_no {
                log.order_no = Some(order_no.to_string());
            }
            if let Some(error_message) = error_message {
                log.error_message = Some(error_message.to_string());
            }
        }
        Ok(())
    }

    async fn list_device_logs(
        &self,
        device_id: DeviceId,
        limit: i64,
    ) -> Result<Vec<DeviceLog>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .logs
            .iter()
            .rev()
            .filter(|l| l.device_id == device_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn create_order_debiting_balance(&self, order: &Order) -> Result<Order, ServiceError> {
        let mut inner = self.inner.lock().unwrap();

        if inner.order_no_index.contains_key(&order.order_no) {
            return Err(ServiceError::DuplicateOrderNo(order.order_no.clone()));
        }

        // Check + debit under the same lock: both happen or neither does
        let user = inner
            .users
            .get_mut(&order.user_id)
            .ok_or(ServiceError::UserNotFound(order.user_id))?;
        if !user.balance.try_debit(order.amount) {
            return Err(ServiceError::InsufficientBalance {
                balance: user.balance.avail(),
                required: order.amount,
            });
        }

        inner.next_order_id += 1;
        let mut stored = order.clone();
        stored.id = inner.next_order_id;
        stored.created_at = Utc::now();
        stored.updated_at = stored.created_at;
        inner
            .order_no_index
            .insert(stored.order_no.clone(), stored.id);
        inner.orders.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.orders.get(&order_id).cloned())
    }

    async fn get_order_by_no(&self, order_no: &str) -> Result<Option<Order>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .order_no_index
            .get(order_no)
            .and_then(|id| inner.orders.get(id))
            .cloned())
    }

    async fn list_orders(
        &self,
        user_id: Option<UserId>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| user_id.is_none_or(|uid| o.user_id == uid))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn update_order_status_if(
        &self,
        order_no: &str,
        expected: OrderStatus,
        new: OrderStatus,
        patch: &OrderPatch,
    ) -> Result<bool, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(&order_id) = inner.order_no_index.get(order_no) else {
            return Ok(false);
        };
        let Some(order) = inner.orders.get_mut(&order_id) else {
            return Ok(false);
        };
        if order.status != expected {
            return Ok(false);
        }
        order.status = new;
        apply_patch(order, patch);
        order.updated_at = Utc::now();
        Ok(true)
    }

    async fn cancel_order_refunding(
        &self,
        order_id: OrderId,
        expected: OrderStatus,
        refund: Amount,
    ) -> Result<bool, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(order) = inner.orders.get(&order_id) else {
            return Ok(false);
        };
        if order.status != expected {
            return Ok(false);
        }
        let user_id = order.user_id;

        if refund > 0 {
            let user = inner
                .users
                .get_mut(&user_id)
                .ok_or(ServiceError::UserNotFound(user_id))?;
            user.balance
                .credit(refund)
                .map_err(|e| ServiceError::SystemError(e.to_string()))?;
        }

        let order = inner.orders.get_mut(&order_id).unwrap();
        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_order(order_no: &str, user_id: UserId, device_id: DeviceId, amount: Amount) -> Order {
        Order {
            id: 0,
            order_no: order_no.to_string(),
            user_id,
            device_id,
            merchant_id: 0,
            store_id: 0,
            wash_type: "standard".into(),
            duration_minutes: 10,
            amount,
            status: OrderStatus::Pending,
            payment_method: None,
            payment_ref: None,
            paid_at: None,
            start_time: None,
            end_time: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_order_debits_atomically() {
        let store = MemStore::new();
        let user = store.seed_user("alice", 2000);
        let device = store.seed_device("CW-01", "bay 1");

        let order = store
            .create_order_debiting_balance(&pending_order("W1", user.id, device.id, 1500))
            .await
            .unwrap();
        assert!(order.id > 0);
        assert_eq!(
            store.get_user(user.id).await.unwrap().unwrap().balance.avail(),
            500
        );

        let err = store
            .create_order_debiting_balance(&pending_order("W2", user.id, device.id, 1000))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientBalance { .. }));
        assert_eq!(
            store.get_user(user.id).await.unwrap().unwrap().balance.avail(),
            500
        );
    }

    #[tokio::test]
    async fn test_duplicate_order_no_rejected() {
        let store = MemStore::new();
        let user = store.seed_user("bob", 5000);
        let device = store.seed_device("CW-02", "bay 2");

        store
            .create_order_debiting_balance(&pending_order("W1", user.id, device.id, 100))
            .await
            .unwrap();
        let err = store
            .create_order_debiting_balance(&pending_order("W1", user.id, device.id, 100))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateOrderNo(_)));

        // The duplicate attempt must not have debited
        assert_eq!(
            store.get_user(user.id).await.unwrap().unwrap().balance.avail(),
            4900
        );
    }

    #[tokio::test]
    async fn test_cas_respects_expected_state() {
        let store = MemStore::new();
        let user = store.seed_user("carol", 2000);
        let device = store.seed_device("CW-03", "bay 3");
        store
            .create_order_debiting_balance(&pending_order("W1", user.id, device.id, 500))
            .await
            .unwrap();

        let moved = store
            .update_order_status_if(
                "W1",
                OrderStatus::Paid,
                OrderStatus::Using,
                &OrderPatch::default(),
            )
            .await
            .unwrap();
        assert!(!moved);

        let moved = store
            .update_order_status_if(
                "W1",
                OrderStatus::Pending,
                OrderStatus::Paid,
                &OrderPatch {
                    paid_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(moved);

        let order = store.get_order_by_no("W1").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert!(order.paid_at.is_some());
    }

    #[tokio::test]
    async fn test_cancel_refunds_once() {
        let store = MemStore::new();
        let user = store.seed_user("dave", 2000);
        let device = store.seed_device("CW-04", "bay 4");
        let order = store
            .create_order_debiting_balance(&pending_order("W1", user.id, device.id, 1500))
            .await
            .unwrap();

        assert!(
            store
                .cancel_order_refunding(order.id, OrderStatus::Pending, 1500)
                .await
                .unwrap()
        );
        assert_eq!(
            store.get_user(user.id).await.unwrap().unwrap().balance.avail(),
            2000
        );

        // Second attempt finds the order already cancelled
        assert!(
            !store
                .cancel_order_refunding(order.id, OrderStatus::Pending, 1500)
                .await
                .unwrap()
        );
        assert_eq!(
            store.get_user(user.id).await.unwrap().unwrap().balance.avail(),
            2000
        );
    }

    #[tokio::test]
    async fn test_log_lifecycle() {
        let store = MemStore::new();
        let device = store.seed_device("CW-05", "bay 5");

        let log_id = store
            .insert_device_log(&NewDeviceLog {
                device_id: device.id,
                devid: device.devid.clone(),
                event_type: "wash_start".into(),
                payload: serde_json::json!({"orderNo": "W9"}),
                event_time: Utc::now(),
            })
            .await
            .unwrap();

        store
            .finalize_device_log(log_id, ProcessStatus::Processed, Some("W9"), None)
            .await
            .unwrap();

        let logs = store.list_device_logs(device.id, 10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].process_status, ProcessStatus::Processed);
        assert_eq!(logs[0].order_no.as_deref(), Some("W9"));
    }
}
