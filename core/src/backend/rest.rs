//! HTTP backend over the hosted table API.
//!
//! Tables live at `{url}/rest/v1/{table}`. Filters use the `column=eq.value`
//! query form and writes ask for the stored row back with
//! `Prefer: return=representation`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::json;

use super::realtime::open_order_feed;
use super::{Backend, BackendError, BackendResult, OrderFeed, error_from_response};
use crate::config::{DEFAULT_REQUEST_TIMEOUT_SECS, StoreConfig};
use crate::model::{
    DeliveryArea, DeliveryAreaInput, Dish, NewOrder, Order, OrderStatus, Profile, ProfileUpdate,
};

const MENU_ITEMS: &str = "menu_items";
const DELIVERY_AREAS: &str = "delivery_areas";
const ORDERS: &str = "orders";
const FAVORITES: &str = "favorites";
const PROFILES: &str = "profiles";
const USER_ROLES: &str = "user_roles";

#[derive(Debug, Deserialize)]
struct FavoriteRow {
    dish_id: String,
}

/// [`Backend`] backed by the remote table API.
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: reqwest::Client,
    rest_url: String,
    realtime_url: Option<String>,
    anon_key: String,
    access_token: Option<String>,
    timeout: Duration,
}

impl RestBackend {
    pub fn new(base_url: &str, anon_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, anon_key)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, anon_key: impl Into<String>) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            client,
            rest_url: format!("{base}/rest/v1"),
            realtime_url: Some(format!("{base}/realtime/v1")),
            anon_key: anon_key.into(),
            access_token: None,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn from_config(config: &StoreConfig) -> BackendResult<Self> {
        let base_url = config
            .backend_url
            .as_deref()
            .ok_or_else(|| BackendError::NotConfigured("backend_url is not set".to_string()))?;
        let anon_key = config
            .anon_key
            .clone()
            .ok_or_else(|| BackendError::NotConfigured("anon_key is not set".to_string()))?;

        let mut backend = Self::new(base_url, anon_key);
        backend.realtime_url = config.realtime_url();
        backend.timeout = config.request_timeout();
        Ok(backend)
    }

    /// Act as a signed-in user; row-level policies apply to this token.
    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }

    pub fn with_realtime_url(mut self, url: impl Into<String>) -> Self {
        self.realtime_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        request.header("apikey", &self.anon_key).bearer_auth(bearer)
    }

    fn table(&self, method: Method, table: &str) -> RequestBuilder {
        let request = self
            .client
            .request(method, format!("{}/{table}", self.rest_url))
            .timeout(self.timeout);
        self.authorize(request)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> BackendResult<Vec<T>> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| BackendError::Parse(e.to_string()))
    }

    /// Runs a write and returns the first row of the representation.
    async fn write_one<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        table: &'static str,
        id: &str,
    ) -> BackendResult<T> {
        let request = request.header("Prefer", "return=representation");
        self.fetch(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound {
                table,
                id: id.to_string(),
            })
    }

    async fn execute(&self, request: RequestBuilder) -> BackendResult<()> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

#[async_trait]
impl Backend for RestBackend {
    async fn menu_items(&self) -> BackendResult<Vec<Dish>> {
        let request = self
            .table(Method::GET, MENU_ITEMS)
            .query(&[("select", "*")]);
        self.fetch(request).await
    }

    async fn insert_menu_item(&self, dish: &Dish) -> BackendResult<Dish> {
        let request = self.table(Method::POST, MENU_ITEMS).json(dish);
        self.write_one(request, MENU_ITEMS, &dish.id).await
    }

    async fn update_menu_item(&self, dish: &Dish) -> BackendResult<Dish> {
        let request = self
            .table(Method::PATCH, MENU_ITEMS)
            .query(&[("id", eq(&dish.id))])
            .json(dish);
        self.write_one(request, MENU_ITEMS, &dish.id).await
    }

    async fn delete_menu_item(&self, id: &str) -> BackendResult<()> {
        let request = self
            .table(Method::DELETE, MENU_ITEMS)
            .query(&[("id", eq(id))]);
        self.execute(request).await
    }

    async fn delivery_area(&self, pincode: &str) -> BackendResult<Option<DeliveryArea>> {
        let request = self.table(Method::GET, DELIVERY_AREAS).query(&[
            ("select", "*".to_string()),
            ("pincode", eq(pincode)),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<DeliveryArea> = self.fetch(request).await?;
        Ok(rows.into_iter().next())
    }

    async fn delivery_areas(&self) -> BackendResult<Vec<DeliveryArea>> {
        let request = self
            .table(Method::GET, DELIVERY_AREAS)
            .query(&[("select", "*"), ("order", "city.asc")]);
        self.fetch(request).await
    }

    async fn insert_delivery_area(&self, area: &DeliveryAreaInput) -> BackendResult<DeliveryArea> {
        let request = self.table(Method::POST, DELIVERY_AREAS).json(area);
        self.write_one(request, DELIVERY_AREAS, &area.pincode).await
    }

    async fn update_delivery_area(
        &self,
        id: &str,
        area: &DeliveryAreaInput,
    ) -> BackendResult<DeliveryArea> {
        let request = self
            .table(Method::PATCH, DELIVERY_AREAS)
            .query(&[("id", eq(id))])
            .json(area);
        self.write_one(request, DELIVERY_AREAS, id).await
    }

    async fn delete_delivery_area(&self, id: &str) -> BackendResult<()> {
        let request = self
            .table(Method::DELETE, DELIVERY_AREAS)
            .query(&[("id", eq(id))]);
        self.execute(request).await
    }

    async fn insert_order(&self, order: &NewOrder) -> BackendResult<Order> {
        let request = self.table(Method::POST, ORDERS).json(order);
        self.write_one(request, ORDERS, "new").await
    }

    async fn order(&self, id: &str) -> BackendResult<Option<Order>> {
        let request = self
            .table(Method::GET, ORDERS)
            .query(&[("select", "*".to_string()), ("id", eq(id))]);
        let rows: Vec<Order> = self.fetch(request).await?;
        Ok(rows.into_iter().next())
    }

    async fn orders(&self, user_id: Option<&str>) -> BackendResult<Vec<Order>> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(user_id) = user_id {
            query.push(("user_id", eq(user_id)));
        }
        let request = self.table(Method::GET, ORDERS).query(&query);
        self.fetch(request).await
    }

    async fn update_order_status(&self, id: &str, status: OrderStatus) -> BackendResult<Order> {
        let request = self
            .table(Method::PATCH, ORDERS)
            .query(&[("id", eq(id))])
            .json(&json!({ "status": status }));
        self.write_one(request, ORDERS, id).await
    }

    async fn favorites(&self, user_id: &str) -> BackendResult<Vec<String>> {
        let request = self
            .table(Method::GET, FAVORITES)
            .query(&[("select", "dish_id".to_string()), ("user_id", eq(user_id))]);
        let rows: Vec<FavoriteRow> = self.fetch(request).await?;
        Ok(rows.into_iter().map(|row| row.dish_id).collect())
    }

    async fn add_favorite(&self, user_id: &str, dish_id: &str) -> BackendResult<()> {
        let request = self
            .table(Method::POST, FAVORITES)
            .json(&json!({ "user_id": user_id, "dish_id": dish_id }));
        self.execute(request).await
    }

    async fn remove_favorite(&self, user_id: &str, dish_id: &str) -> BackendResult<()> {
        let request = self
            .table(Method::DELETE, FAVORITES)
            .query(&[("user_id", eq(user_id)), ("dish_id", eq(dish_id))]);
        self.execute(request).await
    }

    async fn profile(&self, user_id: &str) -> BackendResult<Option<Profile>> {
        let request = self
            .table(Method::GET, PROFILES)
            .query(&[("select", "*".to_string()), ("id", eq(user_id))]);
        let rows: Vec<Profile> = self.fetch(request).await?;
        Ok(rows.into_iter().next())
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> BackendResult<Profile> {
        let request = self
            .table(Method::PATCH, PROFILES)
            .query(&[("id", eq(user_id))])
            .json(update);
        self.write_one(request, PROFILES, user_id).await
    }

    async fn profiles(&self) -> BackendResult<Vec<Profile>> {
        let request = self
            .table(Method::GET, PROFILES)
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        self.fetch(request).await
    }

    async fn has_role(&self, user_id: &str, role: &str) -> BackendResult<bool> {
        let request = self.table(Method::GET, USER_ROLES).query(&[
            ("select", "role".to_string()),
            ("user_id", eq(user_id)),
            ("role", eq(role)),
        ]);
        let rows: Vec<IgnoredAny> = self.fetch(request).await?;
        Ok(!rows.is_empty())
    }

    async fn subscribe_order(&self, id: &str) -> BackendResult<OrderFeed> {
        let realtime_url = self
            .realtime_url
            .as_deref()
            .ok_or_else(|| BackendError::NotConfigured("realtime_url is not set".to_string()))?;
        let request = self
            .client
            .get(format!("{realtime_url}/{ORDERS}"))
            .query(&[("id", eq(id))]);
        tracing::debug!(order_id = id, "subscribing to order updates");
        open_order_feed(self.authorize(request), id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn from_config_requires_url_and_key() {
        let mut config = StoreConfig::defaults(PathBuf::from("/tmp/vantalu"));
        assert!(matches!(
            RestBackend::from_config(&config),
            Err(BackendError::NotConfigured(_))
        ));

        config.backend_url = Some("https://db.example.in/".to_string());
        config.anon_key = Some("anon".to_string());
        let backend = RestBackend::from_config(&config).unwrap();
        assert_eq!(backend.rest_url, "https://db.example.in/rest/v1");
        assert_eq!(
            backend.realtime_url.as_deref(),
            Some("https://db.example.in/realtime/v1")
        );
    }

    #[test]
    fn eq_filter_format() {
        assert_eq!(eq("522002"), "eq.522002");
    }
}
