//! Storage seam between the storefront and the hosted database.
//!
//! [`RestBackend`] talks to the remote table API over HTTP and follows order
//! changes through a server-sent event feed. [`MemoryBackend`] keeps every
//! table in process and is what tests and offline seeding run against.

mod memory;
mod realtime;
mod rest;

pub use memory::MemoryBackend;
pub use realtime::{ChangeEvent, parse_change};
pub use rest::RestBackend;

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::model::{
    DeliveryArea, DeliveryAreaInput, Dish, NewOrder, Order, OrderStatus, Profile, ProfileUpdate,
};

/// Role name granting access to the admin console.
pub const ADMIN_ROLE: &str = "admin";

/// Errors from backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Required connection settings are missing.
    #[error("backend not configured: {0}")]
    NotConfigured(String),

    /// Network request failed.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server rejected the request.
    #[error("backend error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("{table} row not found: {id}")]
    NotFound { table: &'static str, id: String },

    /// Realtime feed failed or closed abnormally.
    #[error("realtime feed error: {0}")]
    Realtime(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Typed access to the storefront tables.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Every menu row, available or not, in catalog order.
    async fn menu_items(&self) -> BackendResult<Vec<Dish>>;
    async fn insert_menu_item(&self, dish: &Dish) -> BackendResult<Dish>;
    async fn update_menu_item(&self, dish: &Dish) -> BackendResult<Dish>;
    async fn delete_menu_item(&self, id: &str) -> BackendResult<()>;

    async fn delivery_area(&self, pincode: &str) -> BackendResult<Option<DeliveryArea>>;
    /// All delivery areas ordered by city.
    async fn delivery_areas(&self) -> BackendResult<Vec<DeliveryArea>>;
    async fn insert_delivery_area(&self, area: &DeliveryAreaInput) -> BackendResult<DeliveryArea>;
    async fn update_delivery_area(
        &self,
        id: &str,
        area: &DeliveryAreaInput,
    ) -> BackendResult<DeliveryArea>;
    async fn delete_delivery_area(&self, id: &str) -> BackendResult<()>;

    async fn insert_order(&self, order: &NewOrder) -> BackendResult<Order>;
    async fn order(&self, id: &str) -> BackendResult<Option<Order>>;
    /// Orders newest first, limited to one user when `user_id` is set.
    async fn orders(&self, user_id: Option<&str>) -> BackendResult<Vec<Order>>;
    async fn update_order_status(&self, id: &str, status: OrderStatus) -> BackendResult<Order>;

    /// Dish ids the user has marked as favorite.
    async fn favorites(&self, user_id: &str) -> BackendResult<Vec<String>>;
    async fn add_favorite(&self, user_id: &str, dish_id: &str) -> BackendResult<()>;
    async fn remove_favorite(&self, user_id: &str, dish_id: &str) -> BackendResult<()>;

    async fn profile(&self, user_id: &str) -> BackendResult<Option<Profile>>;
    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate)
    -> BackendResult<Profile>;
    async fn profiles(&self) -> BackendResult<Vec<Profile>>;
    async fn has_role(&self, user_id: &str, role: &str) -> BackendResult<bool>;

    /// Follow changes to a single order row.
    async fn subscribe_order(&self, id: &str) -> BackendResult<OrderFeed>;
}

/// Stream of updated order rows for one subscription.
///
/// Ends when the producer drops its sender, which happens when the
/// underlying connection closes.
pub struct OrderFeed {
    rx: mpsc::Receiver<BackendResult<Order>>,
}

impl OrderFeed {
    /// Creates a feed together with the sender used to push updates into it.
    pub fn channel(buffer: usize) -> (mpsc::Sender<BackendResult<Order>>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self { rx })
    }

    /// Next update, or `None` once the feed has closed.
    pub async fn next_update(&mut self) -> Option<BackendResult<Order>> {
        self.rx.recv().await
    }
}

impl Stream for OrderFeed {
    type Item = BackendResult<Order>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// PostgREST and GoTrue error payloads use different keys for the message.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Turns a non-success response into [`BackendError::Api`], keeping the
/// server's message when the body carries one.
pub(crate) async fn error_from_response(response: reqwest::Response) -> BackendError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    BackendError::Api {
        status,
        message: error_message(&text),
    }
}

pub(crate) fn error_message(text: &str) -> String {
    let body: ErrorBody = serde_json::from_str(text).unwrap_or_default();
    body.message
        .or(body.msg)
        .or(body.error_description)
        .or(body.error)
        .unwrap_or_else(|| text.trim().to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn error_message_prefers_structured_fields() {
        assert_eq!(
            error_message(r#"{"message":"duplicate key","code":"23505"}"#),
            "duplicate key"
        );
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(error_message(r#"{"msg":"User already registered"}"#), "User already registered");
        assert_eq!(error_message("Bad Gateway\n"), "Bad Gateway");
    }

    #[tokio::test]
    async fn feed_ends_when_sender_drops() {
        let (tx, mut feed) = OrderFeed::channel(4);
        tx.send(Err(BackendError::Realtime("boom".to_string())))
            .await
            .unwrap();
        drop(tx);

        assert!(matches!(
            feed.next_update().await,
            Some(Err(BackendError::Realtime(_)))
        ));
        assert!(feed.next_update().await.is_none());
    }

    #[test]
    fn api_error_display() {
        let err = BackendError::Api {
            status: 409,
            message: "conflict".to_string(),
        };
        assert_eq!(err.to_string(), "backend error (409): conflict");
    }
}
