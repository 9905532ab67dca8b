//! Order Lifecycle Manager
//!
//! Validates preconditions, drives the state machine through atomic CAS
//! updates, and pairs every transition with its money movement.
//!
//! # Refund convention
//!
//! The balance is debited at creation time regardless of payment state, so
//! cancelling refunds the full amount from BOTH `pending` and `paid`. The
//! escrow invariant per order: debits minus credits is either 0 (refunded /
//! cancelled) or exactly `amount` (holding funds).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::number;
use crate::cache::{EphemeralCache, keys};
use crate::core_types::{Amount, OrderId, UserId};
use crate::error::ServiceError;
use crate::models::{DeviceStatus, Order, OrderStatus};
use crate::store::{OrderPatch, Store};

/// Re-derivation attempts before giving up on order-number generation
const MAX_ORDER_NO_ATTEMPTS: u32 = 5;

pub struct OrderManager {
    store: Arc<dyn Store>,
    cache: Arc<dyn EphemeralCache>,
}

impl OrderManager {
    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn EphemeralCache>) -> Self {
        Self { store, cache }
    }

    /// Create an order in `pending`, debiting the balance in the same
    /// atomic unit of work.
    pub async fn create(
        &self,
        user_id: UserId,
        devid: &str,
        wash_type: &str,
        duration_minutes: u32,
        amount: Amount,
    ) -> Result<Order, ServiceError> {
        if amount == 0 {
            return Err(ServiceError::InvalidAmount);
        }
        if duration_minutes == 0 {
            return Err(ServiceError::InvalidDuration);
        }

        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound(user_id))?;
        let device = self
            .store
            .get_device_by_devid(devid)
            .await?
            .ok_or_else(|| ServiceError::DeviceNotFound(devid.to_string()))?;

        if !device.status.accepts_orders() {
            return Err(ServiceError::DeviceUnavailable {
                devid: device.devid.clone(),
                status: device.status.to_string(),
            });
        }

        // Fast precheck for a friendly error; the store re-checks under
        // the same lock/transaction that performs the debit.
        if user.balance.avail() < amount {
            return Err(ServiceError::InsufficientBalance {
                balance: user.balance.avail(),
                required: amount,
            });
        }

        for _ in 0..MAX_ORDER_NO_ATTEMPTS {
            let order_no = number::generate();
            let now = Utc::now();
            let order = Order {
                id: 0,
                order_no: order_no.clone(),
                user_id,
                device_id: device.id,
                merchant_id: device.merchant_id,
                store_id: device.store_id,
                wash_type: wash_type.to_string(),
                duration_minutes,
                amount,
                status: OrderStatus::Pending,
                payment_method: None,
                payment_ref: None,
                paid_at: None,
                start_time: None,
                end_time: None,
                created_at: now,
                updated_at: now,
            };

            match self.store.create_order_debiting_balance(&order).await {
                Ok(created) => {
                    self.publish_status(&created.order_no, OrderStatus::Pending, keys::ORDER_STATUS_TTL)
                        .await;
                    info!(
                        order_no = %created.order_no,
                        user_id = user_id,
                        devid = %devid,
                        amount = amount,
                        "Order created"
                    );
                    return Ok(created);
                }
                // Timestamp+random collided with an existing number: re-derive
                Err(ServiceError::DuplicateOrderNo(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(ServiceError::SystemError(
            "order number generation exhausted".to_string(),
        ))
    }

    /// Confirm payment: `pending` → `paid`, recording a simulated external
    /// payment reference.
    pub async fn pay(&self, order_no: &str, method: &str) -> Result<Order, ServiceError> {
        self.require_order(order_no).await?;

        let patch = OrderPatch {
            paid_at: Some(Utc::now()),
            payment_method: Some(method.to_string()),
            payment_ref: Some(Uuid::new_v4().to_string()),
            ..Default::default()
        };
        let moved = self
            .store
            .update_order_status_if(order_no, OrderStatus::Pending, OrderStatus::Paid, &patch)
            .await?;
        if !moved {
            return Err(self.transition_error(order_no, "pay").await);
        }

        self.publish_status(order_no, OrderStatus::Paid, keys::ORDER_STATUS_TTL)
            .await;
        info!(order_no = %order_no, method = %method, "Order paid");
        self.require_order(order_no).await
    }

    /// Begin the wash: `paid` → `using`.
    ///
    /// This is the pairing point with the device's own wash_start callback.
    /// A device that is not (yet) busy is a recoverable inconsistency, not
    /// a failure; the next heartbeat reconciles it.
    pub async fn start_wash(&self, order_no: &str) -> Result<Order, ServiceError> {
        let order = self.require_order(order_no).await?;

        let patch = OrderPatch {
            start_time: Some(Utc::now()),
            ..Default::default()
        };
        let moved = self
            .store
            .update_order_status_if(order_no, OrderStatus::Paid, OrderStatus::Using, &patch)
            .await?;
        if !moved {
            return Err(self.transition_error(order_no, "start").await);
        }

        if let Some(device) = self.store.get_device(order.device_id).await?
            && device.status != DeviceStatus::Busy
        {
            warn!(
                order_no = %order_no,
                devid = %device.devid,
                device_status = %device.status,
                "Order is using but device is not busy; awaiting heartbeat"
            );
        }

        self.publish_status(
            order_no,
            OrderStatus::Using,
            Duration::from_secs(u64::from(order.duration_minutes) * 60),
        )
        .await;
        info!(order_no = %order_no, "Wash started");
        self.require_order(order_no).await
    }

    /// Finish the wash: `using` → `completed`. The reported actual duration,
    /// when present, overwrites the declared one.
    pub async fn complete_wash(
        &self,
        order_no: &str,
        actual_duration: Option<u32>,
    ) -> Result<Order, ServiceError> {
        self.require_order(order_no).await?;

        let patch = OrderPatch {
            end_time: Some(Utc::now()),
            duration_minutes: actual_duration,
            ..Default::default()
        };
        let moved = self
            .store
            .update_order_status_if(order_no, OrderStatus::Using, OrderStatus::Completed, &patch)
            .await?;
        if !moved {
            return Err(self.transition_error(order_no, "complete").await);
        }

        self.publish_status(order_no, OrderStatus::Completed, keys::ORDER_STATUS_TTL)
            .await;
        info!(order_no = %order_no, "Wash completed");
        self.require_order(order_no).await
    }

    /// Cancel an order the requester owns, crediting the refund in the same
    /// unit of work as the transition.
    pub async fn cancel(
        &self,
        order_id: OrderId,
        requesting_user_id: UserId,
    ) -> Result<Order, ServiceError> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::OrderNotFound(order_id.to_string()))?;

        if order.user_id != requesting_user_id {
            return Err(ServiceError::NotOrderOwner);
        }
        if !order.status.cancellable() {
            return Err(ServiceError::InvalidTransition {
                order_no: order.order_no.clone(),
                from: order.status,
                op: "cancel",
            });
        }

        // Debited at create, so the refund applies from pending AND paid
        let moved = self
            .store
            .cancel_order_refunding(order_id, order.status, order.amount)
            .await?;
        if !moved {
            return Err(self.transition_error(&order.order_no, "cancel").await);
        }

        self.publish_status(&order.order_no, OrderStatus::Cancelled, keys::ORDER_STATUS_TTL)
            .await;
        info!(
            order_no = %order.order_no,
            refund = order.amount,
            "Order cancelled"
        );
        self.require_order(&order.order_no).await
    }

    async fn require_order(&self, order_no: &str) -> Result<Order, ServiceError> {
        self.store
            .get_order_by_no(order_no)
            .await?
            .ok_or_else(|| ServiceError::OrderNotFound(order_no.to_string()))
    }

    /// Build the InvalidTransition error after a failed CAS, using the
    /// freshly observed state.
    async fn transition_error(&self, order_no: &str, op: &'static str) -> ServiceError {
        match self.store.get_order_by_no(order_no).await {
            Ok(Some(current)) => ServiceError::InvalidTransition {
                order_no: order_no.to_string(),
                from: current.status,
                op,
            },
            Ok(None) => ServiceError::OrderNotFound(order_no.to_string()),
            Err(e) => e,
        }
    }

    async fn publish_status(&self, order_no: &str, status: OrderStatus, ttl: Duration) {
        self.cache
            .set(&keys::order_status(order_no), status.to_string(), ttl)
            .await;
    }
}
