//! The completion event bus: publish/subscribe over a shared Redis broker,
//! per-user channels, non-blocking poll with keepalives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisCompletedEvent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub user_id: i64,
    pub game_id: i64,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisCompletedEvent {
    pub fn new(user_id: i64, game_id: i64) -> Self {
        Self {
            kind: "game_analysis_completed",
            user_id,
            game_id,
            timestamp: Utc::now(),
        }
    }
}

pub fn channel_for_user(user_id: i64) -> String {
    format!("analysis_completed:user:{user_id}")
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("broker error: {0}")]
    Broker(String),
}

/// One message observed on a subscription's poll.
#[derive(Debug, Clone)]
pub struct Message {
    pub channel: String,
    pub payload: String,
}

#[async_trait::async_trait]
pub trait Subscription: Send {
    async fn poll(&mut self, timeout: std::time::Duration) -> Option<Message>;
    async fn close(&mut self);
}

#[async_trait::async_trait]
pub trait EventBus: Send + Sync {
    /// Returns the number of live subscribers — informational only, never
    /// load-bearing for correctness.
    async fn publish(&self, channel: &str, payload: &str) -> Result<u32, EventBusError>;
    async fn subscribe(&self, channel: &str) -> Result<Box<dyn Subscription>, EventBusError>;

    /// Publish the `analysis_completed` event for `user_id`, swallowing
    /// any broker failure — a publish failure must never fail the owning
    /// task.
    async fn publish_analysis_completed(&self, user_id: i64, game_id: i64) {
        let event = AnalysisCompletedEvent::new(user_id, game_id);
        let payload = match serde_json::to_string(&event) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize analysis_completed event");
                return;
            }
        };
        if let Err(e) = self.publish(&channel_for_user(user_id), &payload).await {
            tracing::warn!(error = %e, user_id, game_id, "failed to publish analysis_completed event");
        }
    }
}

/// Redis pub/sub backed implementation (`BROKER_URL`).
pub struct RedisEventBus {
    client: redis::Client,
}

impl RedisEventBus {
    pub fn new(broker_url: &str) -> Result<Self, EventBusError> {
        let client = redis::Client::open(broker_url).map_err(|e| EventBusError::Broker(e.to_string()))?;
        Ok(Self { client })
    }
}

pub struct RedisSubscription {
    pubsub: redis::aio::PubSub,
}

#[async_trait::async_trait]
impl Subscription for RedisSubscription {
    async fn poll(&mut self, timeout: std::time::Duration) -> Option<Message> {
        let mut stream = self.pubsub.on_message();
        match tokio::time::timeout(timeout, stream.next()).await {
            Ok(Some(msg)) => {
                let channel = msg.get_channel_name().to_string();
                let payload: String = msg.get_payload().unwrap_or_default();
                Some(Message { channel, payload })
            }
            _ => None,
        }
    }

    async fn close(&mut self) {
        // Dropping the PubSub connection unsubscribes and closes it.
    }
}

#[async_trait::async_trait]
impl EventBus for RedisEventBus {
    async fn publish(&self, channel: &str, payload: &str) -> Result<u32, EventBusError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| EventBusError::Broker(e.to_string()))?;
        let subscribers: u32 = redis::cmd("PUBLISH")
            .arg(channel)
            .arg(payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| EventBusError::Broker(e.to_string()))?;
        Ok(subscribers)
    }

    async fn subscribe(&self, channel: &str) -> Result<Box<dyn Subscription>, EventBusError> {
        let conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| EventBusError::Broker(e.to_string()))?;
        let mut pubsub = conn.into_pubsub();
        pubsub
            .subscribe(channel)
            .await
            .map_err(|e| EventBusError::Broker(e.to_string()))?;
        Ok(Box::new(RedisSubscription { pubsub }))
    }
}

/// Test double backing unit tests without a live Redis instance. Publishes
/// are counted but never delivered — there is no persistence, matching the
/// at-most-once, best-effort contract.
#[derive(Default)]
pub struct NullEventBus {
    pub published: std::sync::atomic::AtomicU64,
}

struct NullSubscription;

#[async_trait::async_trait]
impl Subscription for NullSubscription {
    async fn poll(&mut self, _timeout: std::time::Duration) -> Option<Message> {
        None
    }
    async fn close(&mut self) {}
}

#[async_trait::async_trait]
impl EventBus for NullEventBus {
    async fn publish(&self, _channel: &str, _payload: &str) -> Result<u32, EventBusError> {
        self.published
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(0)
    }

    async fn subscribe(&self, _channel: &str) -> Result<Box<dyn Subscription>, EventBusError> {
        Ok(Box::new(NullSubscription))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_bus_never_fails_and_counts_publishes() {
        let bus = NullEventBus::default();
        bus.publish_analysis_completed(1, 2).await;
        bus.publish_analysis_completed(1, 3).await;
        assert_eq!(bus.published.load(std::sync::atomic::Ordering::Relaxed), 2);
    }

    #[test]
    fn channel_naming_matches_contract() {
        assert_eq!(channel_for_user(42), "analysis_completed:user:42");
    }
}
