//! In-process backend.

use std::cmp::Reverse;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, broadcast};
use uuid::Uuid;

use super::{Backend, BackendError, BackendResult, OrderFeed};
use crate::model::{
    DeliveryArea, DeliveryAreaInput, Dish, NewOrder, Order, OrderStatus, Profile, ProfileUpdate,
};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct Tables {
    menu_items: Vec<Dish>,
    delivery_areas: Vec<DeliveryArea>,
    orders: Vec<Order>,
    /// `(user_id, dish_id)`
    favorites: Vec<(String, String)>,
    profiles: Vec<Profile>,
    /// `(user_id, role)`
    user_roles: Vec<(String, String)>,
}

/// [`Backend`] holding every table in memory.
///
/// Order updates are fanned out over a broadcast channel so that
/// [`Backend::subscribe_order`] behaves like the realtime feed.
pub struct MemoryBackend {
    tables: Mutex<Tables>,
    order_tx: broadcast::Sender<Order>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_menu(Vec::new())
    }

    pub fn with_menu(menu: Vec<Dish>) -> Self {
        let (order_tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            tables: Mutex::new(Tables {
                menu_items: menu,
                ..Tables::default()
            }),
            order_tx,
        }
    }

    pub async fn seed_area(&self, area: DeliveryArea) {
        self.tables.lock().await.delivery_areas.push(area);
    }

    pub async fn seed_order(&self, order: Order) {
        self.tables.lock().await.orders.push(order);
    }

    pub async fn seed_profile(&self, profile: Profile) {
        self.tables.lock().await.profiles.push(profile);
    }

    /// Number of open order feeds.
    pub fn order_subscribers(&self) -> usize {
        self.order_tx.receiver_count()
    }

    pub async fn grant_role(&self, user_id: &str, role: &str) {
        self.tables
            .lock()
            .await
            .user_roles
            .push((user_id.to_string(), role.to_string()));
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn conflict(message: String) -> BackendError {
    BackendError::Api {
        status: 409,
        message,
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn menu_items(&self) -> BackendResult<Vec<Dish>> {
        Ok(self.tables.lock().await.menu_items.clone())
    }

    async fn insert_menu_item(&self, dish: &Dish) -> BackendResult<Dish> {
        let mut tables = self.tables.lock().await;
        let mut dish = dish.clone();
        if dish.id.is_empty() {
            dish.id = new_id();
        }
        if tables.menu_items.iter().any(|d| d.id == dish.id) {
            return Err(conflict(format!("menu item {} already exists", dish.id)));
        }
        tables.menu_items.push(dish.clone());
        Ok(dish)
    }

    async fn update_menu_item(&self, dish: &Dish) -> BackendResult<Dish> {
        let mut tables = self.tables.lock().await;
        let slot = tables
            .menu_items
            .iter_mut()
            .find(|d| d.id == dish.id)
            .ok_or_else(|| BackendError::NotFound {
                table: "menu_items",
                id: dish.id.clone(),
            })?;
        *slot = dish.clone();
        Ok(dish.clone())
    }

    async fn delete_menu_item(&self, id: &str) -> BackendResult<()> {
        self.tables.lock().await.menu_items.retain(|d| d.id != id);
        Ok(())
    }

    async fn delivery_area(&self, pincode: &str) -> BackendResult<Option<DeliveryArea>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .delivery_areas
            .iter()
            .find(|area| area.pincode == pincode)
            .cloned())
    }

    async fn delivery_areas(&self) -> BackendResult<Vec<DeliveryArea>> {
        let mut areas = self.tables.lock().await.delivery_areas.clone();
        areas.sort_by(|a, b| a.city.cmp(&b.city));
        Ok(areas)
    }

    async fn insert_delivery_area(&self, area: &DeliveryAreaInput) -> BackendResult<DeliveryArea> {
        let mut tables = self.tables.lock().await;
        if tables
            .delivery_areas
            .iter()
            .any(|existing| existing.pincode == area.pincode)
        {
            return Err(conflict(format!(
                "delivery area for pincode {} already exists",
                area.pincode
            )));
        }
        let area = area.clone().into_area(new_id());
        tables.delivery_areas.push(area.clone());
        Ok(area)
    }

    async fn update_delivery_area(
        &self,
        id: &str,
        area: &DeliveryAreaInput,
    ) -> BackendResult<DeliveryArea> {
        let mut tables = self.tables.lock().await;
        let slot = tables
            .delivery_areas
            .iter_mut()
            .find(|existing| existing.id == id)
            .ok_or_else(|| BackendError::NotFound {
                table: "delivery_areas",
                id: id.to_string(),
            })?;
        *slot = area.clone().into_area(id.to_string());
        Ok(slot.clone())
    }

    async fn delete_delivery_area(&self, id: &str) -> BackendResult<()> {
        self.tables
            .lock()
            .await
            .delivery_areas
            .retain(|area| area.id != id);
        Ok(())
    }

    async fn insert_order(&self, order: &NewOrder) -> BackendResult<Order> {
        let order = Order::from_new(new_id(), Utc::now(), order.clone());
        self.tables.lock().await.orders.push(order.clone());
        Ok(order)
    }

    async fn order(&self, id: &str) -> BackendResult<Option<Order>> {
        let tables = self.tables.lock().await;
        Ok(tables.orders.iter().find(|order| order.id == id).cloned())
    }

    async fn orders(&self, user_id: Option<&str>) -> BackendResult<Vec<Order>> {
        let tables = self.tables.lock().await;
        let mut orders: Vec<Order> = tables
            .orders
            .iter()
            .filter(|order| user_id.is_none_or(|user| order.user_id.as_deref() == Some(user)))
            .cloned()
            .collect();
        orders.sort_by_key(|order| Reverse(order.created_at));
        Ok(orders)
    }

    async fn update_order_status(&self, id: &str, status: OrderStatus) -> BackendResult<Order> {
        let updated = {
            let mut tables = self.tables.lock().await;
            let order = tables
                .orders
                .iter_mut()
                .find(|order| order.id == id)
                .ok_or_else(|| BackendError::NotFound {
                    table: "orders",
                    id: id.to_string(),
                })?;
            order.status = status;
            order.clone()
        };
        // No subscribers is fine
        let _ = self.order_tx.send(updated.clone());
        Ok(updated)
    }

    async fn favorites(&self, user_id: &str) -> BackendResult<Vec<String>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .favorites
            .iter()
            .filter(|(user, _)| user == user_id)
            .map(|(_, dish)| dish.clone())
            .collect())
    }

    async fn add_favorite(&self, user_id: &str, dish_id: &str) -> BackendResult<()> {
        let mut tables = self.tables.lock().await;
        let exists = tables
            .favorites
            .iter()
            .any(|(user, dish)| user == user_id && dish == dish_id);
        if !exists {
            tables
                .favorites
                .push((user_id.to_string(), dish_id.to_string()));
        }
        Ok(())
    }

    async fn remove_favorite(&self, user_id: &str, dish_id: &str) -> BackendResult<()> {
        self.tables
            .lock()
            .await
            .favorites
            .retain(|(user, dish)| !(user == user_id && dish == dish_id));
        Ok(())
    }

    async fn profile(&self, user_id: &str) -> BackendResult<Option<Profile>> {
        let tables = self.tables.lock().await;
        Ok(tables.profiles.iter().find(|p| p.id == user_id).cloned())
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> BackendResult<Profile> {
        let mut tables = self.tables.lock().await;
        let profile = tables
            .profiles
            .iter_mut()
            .find(|p| p.id == user_id)
            .ok_or_else(|| BackendError::NotFound {
                table: "profiles",
                id: user_id.to_string(),
            })?;
        update.apply_to(profile);
        Ok(profile.clone())
    }

    async fn profiles(&self) -> BackendResult<Vec<Profile>> {
        let mut profiles = self.tables.lock().await.profiles.clone();
        profiles.sort_by_key(|profile| Reverse(profile.created_at));
        Ok(profiles)
    }

    async fn has_role(&self, user_id: &str, role: &str) -> BackendResult<bool> {
        let tables = self.tables.lock().await;
        Ok(tables
            .user_roles
            .iter()
            .any(|(user, granted)| user == user_id && granted == role))
    }

    async fn subscribe_order(&self, id: &str) -> BackendResult<OrderFeed> {
        let mut changes = self.order_tx.subscribe();
        let (tx, feed) = OrderFeed::channel(16);
        let order_id = id.to_string();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(order) if order.id == order_id => {
                        if tx.send(Ok(order)).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(%order_id, skipped, "order feed lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(feed)
    }
}
