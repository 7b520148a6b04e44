//! Back-office operations, available only to users holding the admin role.

use std::sync::Arc;

use thiserror::Error;

use crate::backend::{Backend, BackendError};
use crate::checkout::is_valid_pincode;
use crate::model::{DeliveryArea, DeliveryAreaInput, Dish, Order, OrderStatus, Profile};
use crate::session::{Session, is_admin};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("user {0} is not an admin")]
    Forbidden(String),

    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("order {id} is already {status} and cannot be changed")]
    TerminalOrder { id: String, status: OrderStatus },

    #[error("invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Result of a status update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChange {
    Updated { from: OrderStatus, order: Order },
    /// Order already had the requested status; nothing was written.
    Unchanged(Order),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderStats {
    pub total_orders: usize,
    pub total_revenue: u64,
    /// Neither delivered nor cancelled.
    pub pending: usize,
    pub completed: usize,
    pub cancelled: usize,
    /// Rounded to the nearest rupee; zero when there are no orders.
    pub average_order_value: u64,
    /// Count per status, in lifecycle order.
    pub by_status: Vec<(OrderStatus, usize)>,
}

pub fn order_stats(orders: &[Order]) -> OrderStats {
    let count = |status: OrderStatus| orders.iter().filter(|o| o.status == status).count();
    let total_orders = orders.len();
    let total_revenue: u64 = orders.iter().map(|o| u64::from(o.total_amount)).sum();
    let average_order_value = match u64::try_from(total_orders) {
        Ok(n) if n > 0 => (total_revenue + n / 2) / n,
        _ => 0,
    };
    OrderStats {
        total_orders,
        total_revenue,
        pending: orders.iter().filter(|o| o.status.is_pending()).count(),
        completed: count(OrderStatus::Delivered),
        cancelled: count(OrderStatus::Cancelled),
        average_order_value,
        by_status: OrderStatus::ALL
            .into_iter()
            .map(|status| (status, count(status)))
            .collect(),
    }
}

/// Trims and checks a delivery area before it is written.
pub fn validate_area(input: &DeliveryAreaInput) -> Result<DeliveryAreaInput, AdminError> {
    let pincode = input.pincode.trim().to_string();
    if !is_valid_pincode(&pincode) {
        return Err(AdminError::InvalidField {
            field: "pincode",
            reason: "expected 6 digits",
        });
    }
    let area_name = input.area_name.trim().to_string();
    if area_name.is_empty() {
        return Err(AdminError::InvalidField {
            field: "area_name",
            reason: "must not be empty",
        });
    }
    let city = input.city.trim().to_string();
    if city.is_empty() {
        return Err(AdminError::InvalidField {
            field: "city",
            reason: "must not be empty",
        });
    }
    Ok(DeliveryAreaInput {
        pincode,
        area_name,
        city,
        ..input.clone()
    })
}

pub fn validate_dish(dish: &Dish) -> Result<(), AdminError> {
    if dish.name.trim().is_empty() {
        return Err(AdminError::InvalidField {
            field: "name",
            reason: "must not be empty",
        });
    }
    if dish.price == 0 {
        return Err(AdminError::InvalidField {
            field: "price",
            reason: "must be greater than zero",
        });
    }
    Ok(())
}

/// Admin console bound to a verified admin user.
pub struct AdminConsole {
    backend: Arc<dyn Backend>,
    admin_id: String,
}

impl AdminConsole {
    /// Opens the console after checking the session's user holds the
    /// admin role.
    pub async fn open(backend: Arc<dyn Backend>, session: &Session) -> Result<Self, AdminError> {
        if !is_admin(backend.as_ref(), session).await? {
            tracing::warn!(user_id = %session.user.id, "admin access denied");
            return Err(AdminError::Forbidden(session.user.id.clone()));
        }
        Ok(Self {
            backend,
            admin_id: session.user.id.clone(),
        })
    }

    pub fn admin_id(&self) -> &str {
        &self.admin_id
    }

    // ── Orders ───────────────────────────────────────────────────────────

    /// All orders, newest first.
    pub async fn orders(&self) -> Result<Vec<Order>, AdminError> {
        Ok(self.backend.orders(None).await?)
    }

    pub async fn stats(&self) -> Result<OrderStats, AdminError> {
        let orders = self.backend.orders(None).await?;
        Ok(order_stats(&orders))
    }

    pub async fn set_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<StatusChange, AdminError> {
        let current = self
            .backend
            .order(order_id)
            .await?
            .ok_or_else(|| AdminError::OrderNotFound(order_id.to_string()))?;
        if current.status == status {
            return Ok(StatusChange::Unchanged(current));
        }
        if current.status.is_terminal() {
            return Err(AdminError::TerminalOrder {
                id: current.id,
                status: current.status,
            });
        }

        let order = self.backend.update_order_status(order_id, status).await?;
        tracing::info!(
            order_id,
            from = %current.status,
            to = %status,
            admin_id = %self.admin_id,
            "order status updated"
        );
        Ok(StatusChange::Updated {
            from: current.status,
            order,
        })
    }

    // ── Menu ─────────────────────────────────────────────────────────────

    pub async fn menu_items(&self) -> Result<Vec<Dish>, AdminError> {
        Ok(self.backend.menu_items().await?)
    }

    pub async fn create_menu_item(&self, dish: &Dish) -> Result<Dish, AdminError> {
        validate_dish(dish)?;
        Ok(self.backend.insert_menu_item(dish).await?)
    }

    pub async fn update_menu_item(&self, dish: &Dish) -> Result<Dish, AdminError> {
        validate_dish(dish)?;
        Ok(self.backend.update_menu_item(dish).await?)
    }

    pub async fn delete_menu_item(&self, id: &str) -> Result<(), AdminError> {
        Ok(self.backend.delete_menu_item(id).await?)
    }

    // ── Delivery areas ───────────────────────────────────────────────────

    /// All delivery areas ordered by city.
    pub async fn delivery_areas(&self) -> Result<Vec<DeliveryArea>, AdminError> {
        Ok(self.backend.delivery_areas().await?)
    }

    pub async fn create_delivery_area(
        &self,
        input: &DeliveryAreaInput,
    ) -> Result<DeliveryArea, AdminError> {
        let input = validate_area(input)?;
        Ok(self.backend.insert_delivery_area(&input).await?)
    }

    pub async fn update_delivery_area(
        &self,
        id: &str,
        input: &DeliveryAreaInput,
    ) -> Result<DeliveryArea, AdminError> {
        let input = validate_area(input)?;
        Ok(self.backend.update_delivery_area(id, &input).await?)
    }

    pub async fn delete_delivery_area(&self, id: &str) -> Result<(), AdminError> {
        Ok(self.backend.delete_delivery_area(id).await?)
    }

    // ── Users ────────────────────────────────────────────────────────────

    pub async fn users(&self) -> Result<Vec<Profile>, AdminError> {
        Ok(self.backend.profiles().await?)
    }
}
