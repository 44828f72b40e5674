//! Domain models.
//!
//! A [`Poll`] and its [`PollOption`]s form one aggregate: the poll owns its
//! options for lifecycle purposes, and all mutation goes through setters
//! that keep the per-entity [`crate::TrackingState`] honest.

mod poll;
mod poll_option;

pub use poll::Poll;
pub use poll_option::PollOption;
