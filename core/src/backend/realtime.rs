//! Server-sent event feed of order row changes.

use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;

use super::{BackendError, BackendResult, OrderFeed, error_from_response};
use crate::model::Order;

/// One row-level change as pushed by the realtime service.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type", alias = "eventType")]
    pub kind: String,
    #[serde(default, alias = "new")]
    pub record: Option<Value>,
}

/// Decodes an event payload. Only `UPDATE` events carrying a record yield an
/// order; inserts, deletes and heartbeats are skipped.
pub fn parse_change(data: &str) -> BackendResult<Option<Order>> {
    let event: ChangeEvent =
        serde_json::from_str(data).map_err(|e| BackendError::Parse(e.to_string()))?;
    if !event.kind.eq_ignore_ascii_case("UPDATE") {
        return Ok(None);
    }
    match event.record {
        Some(record) => serde_json::from_value(record)
            .map(Some)
            .map_err(|e| BackendError::Parse(e.to_string())),
        None => Ok(None),
    }
}

/// Opens the subscription and spawns a task that forwards matching updates.
pub(crate) async fn open_order_feed(
    request: reqwest::RequestBuilder,
    order_id: &str,
) -> BackendResult<OrderFeed> {
    let response = request
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    let (tx, feed) = OrderFeed::channel(16);
    let order_id = order_id.to_string();
    let events = response.bytes_stream().eventsource();
    tokio::spawn(async move {
        if let Err(e) = forward_updates(events, &order_id, tx.clone()).await {
            let _ = tx.send(Err(e)).await;
        }
        tracing::debug!(%order_id, "realtime feed closed");
    });

    Ok(feed)
}

async fn forward_updates<S, E>(
    events: S,
    order_id: &str,
    tx: mpsc::Sender<BackendResult<Order>>,
) -> BackendResult<()>
where
    S: futures::Stream<Item = Result<eventsource_stream::Event, E>>,
    E: std::fmt::Display,
{
    let mut events = std::pin::pin!(events);
    while let Some(event) = events.next().await {
        let event = event.map_err(|e| BackendError::Realtime(e.to_string()))?;
        if event.data.trim().is_empty() {
            continue;
        }
        let order = match parse_change(&event.data) {
            Ok(Some(order)) => order,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(event = %event.event, "skipping malformed realtime event: {e}");
                continue;
            }
        };
        if order.id != order_id {
            continue;
        }
        if tx.send(Ok(order)).await.is_err() {
            // Receiver dropped
            return Ok(());
        }
    }
    Ok(())
}
