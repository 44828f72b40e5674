//! Poll domain model.

use pollstar_common::{AppError, AppResult};
use uuid::Uuid;

use crate::models::PollOption;
use crate::tracking::TrackingState;

/// A poll scoped to a session, with an ordered collection of options.
///
/// At most one poll per session may be active at any committed instant; the
/// activation coordinator in the service layer enforces that invariant.
#[derive(Debug, Clone)]
pub struct Poll {
    id: Uuid,
    session_id: Uuid,
    name: String,
    description: Option<String>,
    display_order: i32,
    is_active: bool,
    options: Vec<PollOption>,
    state: TrackingState,
}

impl Poll {
    /// Create a poll that has never been persisted.
    pub fn new(id: Uuid, session_id: Uuid, name: impl Into<String>) -> AppResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AppError::Validation(
                "poll name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id,
            session_id,
            name,
            description: None,
            display_order: 0,
            is_active: false,
            options: Vec::new(),
            state: TrackingState::New,
        })
    }

    /// Rehydrate a poll from storage.
    #[must_use]
    pub const fn hydrate(
        id: Uuid,
        session_id: Uuid,
        name: String,
        description: Option<String>,
        display_order: i32,
        options: Vec<PollOption>,
        is_active: bool,
    ) -> Self {
        Self {
            id,
            session_id,
            name,
            description,
            display_order,
            is_active,
            options,
            state: TrackingState::Pristine,
        }
    }

    /// Poll identity.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Owning session.
    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Poll name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Display order within the session.
    #[must_use]
    pub const fn display_order(&self) -> i32 {
        self.display_order
    }

    /// Whether this poll is the session's active one.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.is_active
    }

    /// Owned options, in collection order (deleted ones included until
    /// reconciliation processes them).
    #[must_use]
    pub fn options(&self) -> &[PollOption] {
        &self.options
    }

    /// Mutable access to the owned options.
    pub fn options_mut(&mut self) -> &mut [PollOption] {
        &mut self.options
    }

    /// Current tracking state.
    #[must_use]
    pub const fn state(&self) -> TrackingState {
        self.state
    }

    /// Set the poll name; rejects empty or whitespace-only values before
    /// any state change.
    pub fn set_name(&mut self, value: &str) -> AppResult<()> {
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "poll name must not be empty".to_string(),
            ));
        }
        self.state.touch();
        if self.name != value {
            self.name = value.to_string();
            self.state.modify();
        }
        Ok(())
    }

    /// Set the poll description.
    pub fn set_description(&mut self, value: Option<&str>) {
        self.state.touch();
        if self.description.as_deref() != value {
            self.description = value.map(ToString::to_string);
            self.state.modify();
        }
    }

    /// Append an option to the ordered collection. Options track their own
    /// state; adding one does not change the poll's.
    pub fn add_option(&mut self, option: PollOption) {
        self.options.push(option);
    }

    /// Number of options, including ones marked deleted.
    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    /// Mark this poll as the session's active one.
    pub const fn activate(&mut self) {
        self.set_active(true);
    }

    /// Clear the active flag.
    pub const fn deactivate(&mut self) {
        self.set_active(false);
    }

    const fn set_active(&mut self, value: bool) {
        self.state.touch();
        if self.is_active != value {
            self.is_active = value;
            self.state.modify();
        }
    }

    /// Reset tracking on the poll and every option after a successful
    /// persistence round-trip.
    pub fn reset_tracking(&mut self) {
        self.state.reset();
        self.options.retain(|o| o.state() != TrackingState::Deleted);
        for option in &mut self.options {
            option.reset_tracking();
        }
    }
}
