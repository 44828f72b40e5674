//! Redis Pub/Sub for cross-instance event distribution.
//!
//! Fans poll events out to every server instance serving the same session
//! group, so connected clients see activations regardless of which instance
//! handled the request.

use async_trait::async_trait;
use fred::clients::{Client, SubscriberClient};
use fred::error::{Error as RedisError, ErrorKind as RedisErrorKind};
use fred::interfaces::{ClientLike, EventInterface, PubsubInterface};
use fred::types::config::Config as RedisConfig;
use pollstar_common::{AppError, AppResult};
use pollstar_core::services::{EventPublisher, PollDetail};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use tracing::{debug, info, warn};

/// Pub/Sub channel names.
pub mod channels {
    use uuid::Uuid;

    /// Session-group events (suffix with session ID).
    pub const SESSION_PREFIX: &str = "pollstar:session:";

    /// Channel carrying one session's events.
    #[must_use]
    pub fn session(session_id: Uuid) -> String {
        format!("{SESSION_PREFIX}{session_id}")
    }
}

/// Pub/Sub event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum PubSubEvent {
    /// A poll became the session's active poll.
    PollActivated {
        /// Owning session.
        session_id: Uuid,
        /// Full detail of the newly active poll.
        poll: PollDetail,
    },
}

/// Redis Pub/Sub manager for event distribution.
#[derive(Clone)]
pub struct RedisPubSub {
    publisher: Client,
    subscriber: SubscriberClient,
    /// Local broadcast channel for events received from Redis.
    local_tx: broadcast::Sender<PubSubEvent>,
}

impl RedisPubSub {
    /// Create a new Redis Pub/Sub manager.
    pub async fn new(redis_url: &str) -> Result<Self, RedisError> {
        let config = RedisConfig::from_url(redis_url)?;

        let publisher = Client::new(config.clone(), None, None, None);
        publisher.init().await?;

        let subscriber = SubscriberClient::new(config, None, None, None);
        subscriber.init().await?;

        let (local_tx, _) = broadcast::channel(1000);

        info!("Redis Pub/Sub initialized");

        Ok(Self {
            publisher,
            subscriber,
            local_tx,
        })
    }

    /// Start the event loop forwarding Redis messages to local subscribers.
    pub fn start(&self) {
        let local_tx = self.local_tx.clone();
        let mut message_stream = self.subscriber.message_rx();

        tokio::spawn(async move {
            while let Ok(message) = message_stream.recv().await {
                if let Some(payload) = message.value.as_string() {
                    match serde_json::from_str::<PubSubEvent>(&payload) {
                        Ok(event) => {
                            debug!(?event, "Received Pub/Sub event");
                            if local_tx.send(event).is_err() {
                                warn!("No local subscribers for Pub/Sub event");
                            }
                        }
                        Err(e) => {
                            warn!("Failed to parse Pub/Sub message: {}", e);
                        }
                    }
                }
            }
            info!("Pub/Sub message stream ended");
        });
    }

    /// Subscribe to a session group's events.
    pub async fn subscribe_session(&self, session_id: Uuid) -> Result<(), RedisError> {
        self.subscriber
            .subscribe(channels::session(session_id))
            .await?;
        debug!(%session_id, "Subscribed to session channel");
        Ok(())
    }

    /// Unsubscribe from a session group's events.
    pub async fn unsubscribe_session(&self, session_id: Uuid) -> Result<(), RedisError> {
        self.subscriber
            .unsubscribe(channels::session(session_id))
            .await?;
        debug!(%session_id, "Unsubscribed from session channel");
        Ok(())
    }

    /// Publish an event to a channel.
    pub async fn publish(&self, channel: &str, event: &PubSubEvent) -> Result<(), RedisError> {
        let payload = serde_json::to_string(event).map_err(|e| {
            RedisError::new(
                RedisErrorKind::InvalidArgument,
                format!("Serialization error: {e}"),
            )
        })?;
        let _: () = self.publisher.publish(channel, payload).await?;
        debug!(channel, ?event, "Published Pub/Sub event");
        Ok(())
    }

    /// Get a receiver for local broadcast events.
    #[must_use]
    pub fn subscribe_local(&self) -> broadcast::Receiver<PubSubEvent> {
        self.local_tx.subscribe()
    }

    /// Get the number of local subscribers.
    #[must_use]
    pub fn local_subscriber_count(&self) -> usize {
        self.local_tx.receiver_count()
    }

    /// Shutdown the Pub/Sub manager.
    pub async fn shutdown(&self) -> Result<(), RedisError> {
        self.subscriber.quit().await?;
        self.publisher.quit().await?;
        info!("Redis Pub/Sub shutdown");
        Ok(())
    }
}

/// Implementation of [`EventPublisher`] for [`RedisPubSub`], so core services
/// can emit events without depending on the realtime crate directly.
#[async_trait]
impl EventPublisher for RedisPubSub {
    async fn publish_poll_activated(&self, session_id: Uuid, poll: &PollDetail) -> AppResult<()> {
        let event = PubSubEvent::PollActivated {
            session_id,
            poll: poll.clone(),
        };
        self.publish(&channels::session(session_id), &event)
            .await
            .map_err(|e| AppError::Redis(e.to_string()))
    }
}
