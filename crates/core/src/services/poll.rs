//! Poll service.
//!
//! Service-level flow around the aggregate: building and mutating polls
//! through tracked setters, handing them to the reconciliation repository,
//! and coordinating activation with its notification fan-out.

use pollstar_common::{AppResult, IdGenerator};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::models::{Poll, PollOption};
use crate::repository::PollRepository;
use crate::services::event_publisher::EventPublisherService;
use crate::tracking::TrackingState;

/// Poll service for business logic.
#[derive(Clone)]
pub struct PollService {
    repository: PollRepository,
    events: EventPublisherService,
    id_gen: IdGenerator,
}

/// Input for creating a poll.
#[derive(Debug, Clone)]
pub struct CreatePollInput {
    /// Owning session.
    pub session_id: Uuid,
    /// Poll name (question); must be non-empty.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Ordered options; position in the list becomes the display order.
    pub options: Vec<CreateOptionInput>,
}

/// One option of a create payload.
#[derive(Debug, Clone)]
pub struct CreateOptionInput {
    /// Option name; must be non-empty.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
}

/// Input for updating a poll.
#[derive(Debug, Clone)]
pub struct UpdatePollInput {
    /// New poll name.
    pub name: String,
    /// New description.
    pub description: Option<String>,
    /// The full intended option set. Loaded options absent from this list
    /// are removed (deletion by omission).
    pub options: Vec<UpdateOptionInput>,
}

/// One option of an update payload.
#[derive(Debug, Clone)]
pub struct UpdateOptionInput {
    /// Identity of an existing option, or `None` for a new one.
    pub id: Option<Uuid>,
    /// Option name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
}

/// Poll list entry without options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    /// Poll identity.
    pub id: Uuid,
    /// Poll name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Display order within the session.
    pub display_order: i32,
}

/// Full poll with its ordered options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollDetail {
    /// Poll identity.
    pub id: Uuid,
    /// Owning session.
    pub session_id: Uuid,
    /// Poll name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Display order within the session.
    pub display_order: i32,
    /// Whether this poll is the session's active one.
    pub is_active: bool,
    /// Options ordered by display order ascending, stable on ties.
    pub options: Vec<PollOptionDetail>,
}

/// One option of a poll detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOptionDetail {
    /// Option identity.
    pub id: Uuid,
    /// Option name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Display order within the poll.
    pub display_order: i32,
}

impl PollService {
    /// Create a new poll service.
    #[must_use]
    pub const fn new(repository: PollRepository, events: EventPublisherService) -> Self {
        Self {
            repository,
            events,
            id_gen: IdGenerator::new(),
        }
    }

    /// List a session's polls, ordered by display order.
    pub async fn list_polls(&self, session_id: Uuid) -> AppResult<Vec<PollSummary>> {
        let polls = self.repository.get_list(session_id).await?;
        info!(%session_id, count = polls.len(), "Listed session polls");
        Ok(polls.iter().map(to_summary).collect())
    }

    /// Get one poll with its ordered options.
    pub async fn get_poll(&self, poll_id: Uuid) -> AppResult<PollDetail> {
        let poll = self.repository.get(poll_id).await?;
        Ok(to_detail(&poll))
    }

    /// Get the session's active poll, if any.
    pub async fn get_active_poll(&self, session_id: Uuid) -> AppResult<Option<PollDetail>> {
        let poll = self.repository.get_active(session_id).await?;
        Ok(poll.as_ref().map(to_detail))
    }

    /// Create a poll with its options. The payload position of each option
    /// becomes its display order.
    pub async fn create_poll(&self, input: CreatePollInput) -> AppResult<PollDetail> {
        let mut poll = Poll::new(self.id_gen.generate(), input.session_id, input.name)?;
        poll.set_description(input.description.as_deref());

        for (position, option) in input.options.into_iter().enumerate() {
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let display_order = position as i32;
            poll.add_option(PollOption::new(
                self.id_gen.generate(),
                option.name,
                option.description,
                display_order,
            )?);
        }

        self.repository.create(&poll).await?;
        poll.reset_tracking();
        info!(poll_id = %poll.id(), session_id = %poll.session_id(), "Created poll");
        Ok(to_detail(&poll))
    }

    /// Update a poll from the full intended state.
    ///
    /// Payload options carrying the id of a loaded option are applied to it
    /// through the tracked setters; options without a matching id are
    /// appended as new. Loaded options the payload never referenced are
    /// still `Pristine` after that pass and are removed — omission is
    /// deletion.
    pub async fn update_poll(&self, poll_id: Uuid, input: UpdatePollInput) -> AppResult<PollDetail> {
        let mut poll = self.repository.get(poll_id).await?;

        poll.set_name(&input.name)?;
        poll.set_description(input.description.as_deref());

        for option_input in input.options {
            let existing = option_input.id.and_then(|id| {
                poll.options_mut()
                    .iter_mut()
                    .position(|o| o.id() == id)
            });
            if let Some(index) = existing {
                let option = &mut poll.options_mut()[index];
                option.set_name(&option_input.name)?;
                option.set_description(option_input.description.as_deref());
            } else {
                #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                let display_order = poll.option_count() as i32;
                poll.add_option(PollOption::new(
                    self.id_gen.generate(),
                    option_input.name,
                    option_input.description,
                    display_order,
                )?);
            }
        }

        for option in poll.options_mut() {
            if option.state() == TrackingState::Pristine {
                option.delete();
            }
        }

        self.repository.update(&poll).await?;
        poll.reset_tracking();
        info!(%poll_id, "Updated poll");
        Ok(to_detail(&poll))
    }

    /// Delete a poll by identity. Returns whether it existed; deleting a
    /// missing poll is a successful `false`, not an error.
    pub async fn delete_poll(&self, poll_id: Uuid) -> AppResult<bool> {
        let existed = self.repository.delete(poll_id).await?;
        info!(%poll_id, existed, "Deleted poll");
        Ok(existed)
    }

    /// Activate a poll within its session.
    ///
    /// Deactivates every other active poll of the session first, then flips
    /// the target and persists it, and only after that emits the
    /// poll-activated notification to the session's subscriber group. A
    /// failure at any step aborts the sequence. The deactivate batch and
    /// the target update are separate partitions with no cross-partition
    /// transaction; a crash between them can leave the session with zero
    /// active polls.
    pub async fn activate_poll(&self, poll_id: Uuid) -> AppResult<PollDetail> {
        let mut poll = self.repository.get(poll_id).await?;
        let session_id = poll.session_id();

        self.repository
            .deactivate_all(session_id, Some(poll_id))
            .await?;

        poll.activate();
        self.repository.update(&poll).await?;
        poll.reset_tracking();

        let detail = to_detail(&poll);
        self.events
            .publish_poll_activated(session_id, &detail)
            .await?;
        info!(%poll_id, %session_id, "Activated poll");
        Ok(detail)
    }
}

fn to_summary(poll: &Poll) -> PollSummary {
    PollSummary {
        id: poll.id(),
        name: poll.name().to_string(),
        description: poll.description().map(ToString::to_string),
        display_order: poll.display_order(),
    }
}

fn to_detail(poll: &Poll) -> PollDetail {
    let mut options: Vec<PollOptionDetail> = poll
        .options()
        .iter()
        .filter(|o| o.state() != TrackingState::Deleted)
        .map(|o| PollOptionDetail {
            id: o.id(),
            name: o.name().to_string(),
            description: o.description().map(ToString::to_string),
            display_order: o.display_order(),
        })
        .collect();
    // Stable sort: equal display orders keep collection order.
    options.sort_by_key(|o| o.display_order);

    PollDetail {
        id: poll.id(),
        session_id: poll.session_id(),
        name: poll.name().to_string(),
        description: poll.description().map(ToString::to_string),
        display_order: poll.display_order(),
        is_active: poll.is_active(),
        options,
    }
}
