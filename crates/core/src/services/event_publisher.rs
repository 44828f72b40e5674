//! Event publisher service.
//!
//! Provides an abstraction for publishing real-time events to a session's
//! subscriber group. The actual implementation is provided by the realtime
//! crate (Redis Pub/Sub); delivery and retry semantics belong to the
//! transport.

use async_trait::async_trait;
use pollstar_common::AppResult;
use std::sync::Arc;
use uuid::Uuid;

use crate::services::poll::PollDetail;

/// Trait for publishing real-time events.
///
/// This allows the core services to publish events without directly
/// depending on the pub/sub implementation.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a poll-activated event to the session's subscriber group,
    /// carrying the full poll detail payload.
    async fn publish_poll_activated(&self, session_id: Uuid, poll: &PollDetail) -> AppResult<()>;
}

/// A no-op implementation of [`EventPublisher`] for testing or when
/// real-time events are disabled.
#[derive(Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish_poll_activated(&self, _session_id: Uuid, _poll: &PollDetail) -> AppResult<()> {
        Ok(())
    }
}

/// Wrapper for boxed [`EventPublisher`] trait object.
pub type EventPublisherService = Arc<dyn EventPublisher>;
