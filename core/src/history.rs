//! The signed-in user's past orders.

use chrono::{DateTime, Utc};

use crate::backend::{Backend, BackendResult};
use crate::model::{Order, OrderStatus};

/// One row of the order history list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub id: String,
    pub short_id: String,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub item_count: u32,
    pub total_amount: u32,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.clone(),
            short_id: order.short_id().to_string(),
            created_at: order.created_at,
            status: order.status,
            item_count: order.item_count(),
            total_amount: order.total_amount,
        }
    }
}

/// Orders placed by `user_id`, newest first.
pub async fn order_history(backend: &dyn Backend, user_id: &str) -> BackendResult<Vec<OrderSummary>> {
    let orders = backend.orders(Some(user_id)).await?;
    Ok(orders.iter().map(OrderSummary::from).collect())
}
