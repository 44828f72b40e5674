//! Core business logic for pollstar-rs.
//!
//! The heart of this crate is the change-tracked aggregate: a [`Poll`] and
//! its owned [`PollOption`]s mutate only through setters that record a
//! [`TrackingState`], and the [`PollRepository`] turns that recorded delta
//! into the minimal per-partition batch of store writes.

pub mod models;
pub mod repository;
pub mod services;
pub mod tracking;

pub use models::{Poll, PollOption};
pub use repository::PollRepository;
pub use services::*;
pub use tracking::TrackingState;
