//! Order tracking with live status updates.

use std::sync::Arc;

use thiserror::Error;

use crate::backend::{Backend, BackendError};
use crate::model::{Order, OrderStatus};

/// Stage labels shown on the tracking progress bar.
pub const STAGES: [&str; 4] = ["Order Placed", "Preparing", "Out for Delivery", "Delivered"];

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Position of a status on the progress bar. Cancelled orders have none.
pub fn stage_index(status: OrderStatus) -> Option<usize> {
    match status {
        OrderStatus::Placed => Some(0),
        OrderStatus::Confirmed | OrderStatus::Preparing => Some(1),
        OrderStatus::OutForDelivery => Some(2),
        OrderStatus::Delivered => Some(3),
        OrderStatus::Cancelled => None,
    }
}

pub fn progress_percent(status: OrderStatus) -> Option<u8> {
    let last = STAGES.len() - 1;
    stage_index(status).map(|stage| u8::try_from(stage * 100 / last).unwrap_or(100))
}

/// Customer-facing message for a status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub order_id: String,
    pub status: OrderStatus,
    pub title: String,
    pub body: String,
}

/// Builds the notification for moving from `previous` to `order.status`,
/// or `None` when the status did not change.
pub fn notification_for(previous: OrderStatus, order: &Order) -> Option<Notification> {
    if previous == order.status {
        return None;
    }
    let body = match order.status {
        OrderStatus::Placed => "We have received your order.",
        OrderStatus::Confirmed => "The kitchen has accepted your order.",
        OrderStatus::Preparing => "Your food is being cooked fresh.",
        OrderStatus::OutForDelivery => "Your order is on its way.",
        OrderStatus::Delivered => "Your order has been delivered. Enjoy your meal!",
        OrderStatus::Cancelled => "Your order has been cancelled.",
    };
    Some(Notification {
        order_id: order.id.clone(),
        status: order.status,
        title: format!("Order #{}: {}", order.short_id(), order.status.label()),
        body: body.to_string(),
    })
}

/// How a [`OrderTracker::follow`] call finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    /// Order reached `Delivered` or `Cancelled`.
    Terminal(OrderStatus),
    /// The update feed closed first.
    FeedClosed,
}

/// Tracks one order, replacing it with every pushed update.
pub struct OrderTracker {
    backend: Arc<dyn Backend>,
    order: Order,
}

impl OrderTracker {
    pub async fn open(backend: Arc<dyn Backend>, order_id: &str) -> Result<Self, TrackingError> {
        let order_id = order_id.trim();
        let order = backend
            .order(order_id)
            .await?
            .ok_or_else(|| TrackingError::OrderNotFound(order_id.to_string()))?;
        Ok(Self { backend, order })
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn stage(&self) -> Option<usize> {
        stage_index(self.order.status)
    }

    pub fn progress(&self) -> Option<u8> {
        progress_percent(self.order.status)
    }

    /// Replaces the tracked order and reports a status transition, if any.
    /// Updates for other orders are ignored.
    pub fn apply(&mut self, update: Order) -> Option<Notification> {
        if update.id != self.order.id {
            return None;
        }
        let previous = self.order.status;
        self.order = update;
        notification_for(previous, &self.order)
    }

    /// Applies pushed updates until the order is terminal or the feed
    /// closes. `on_update` sees every applied update together with the
    /// notification it produced.
    pub async fn follow<F>(&mut self, mut on_update: F) -> Result<FollowOutcome, TrackingError>
    where
        F: FnMut(&Order, Option<&Notification>),
    {
        if self.order.status.is_terminal() {
            return Ok(FollowOutcome::Terminal(self.order.status));
        }

        let mut feed = self.backend.subscribe_order(&self.order.id).await?;

        // The feed only carries changes made after it was opened.
        if let Some(latest) = self.backend.order(&self.order.id).await? {
            if let Some(notification) = self.apply(latest) {
                self.log_change(&notification);
                on_update(&self.order, Some(&notification));
            }
            if self.order.status.is_terminal() {
                return Ok(FollowOutcome::Terminal(self.order.status));
            }
        }

        while let Some(update) = feed.next_update().await {
            let update = update?;
            let notification = self.apply(update);
            if let Some(notification) = &notification {
                self.log_change(notification);
            }
            on_update(&self.order, notification.as_ref());
            if self.order.status.is_terminal() {
                return Ok(FollowOutcome::Terminal(self.order.status));
            }
        }
        Ok(FollowOutcome::FeedClosed)
    }

    fn log_change(&self, notification: &Notification) {
        tracing::info!(
            order_id = %self.order.id,
            status = %notification.status,
            "order status changed"
        );
    }
}
