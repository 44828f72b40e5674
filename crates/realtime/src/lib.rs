//! Real-time event distribution for pollstar-rs.
//!
//! This crate bridges the core services' event publishing to Redis Pub/Sub:
//!
//! - **Pub/Sub**: Session-group channels, one per session
//! - **Events**: Type-tagged JSON payloads shared with connected clients

pub mod pubsub;

pub use pubsub::{PubSubEvent, RedisPubSub, channels as pubsub_channels};
