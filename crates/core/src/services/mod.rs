//! Business logic services.

pub mod event_publisher;
pub mod poll;

pub use event_publisher::{EventPublisher, EventPublisherService, NoOpEventPublisher};
pub use poll::{
    CreateOptionInput, CreatePollInput, PollDetail, PollOptionDetail, PollService, PollSummary,
    UpdateOptionInput, UpdatePollInput,
};
