//! Poll option domain model.

use pollstar_common::{AppError, AppResult};
use uuid::Uuid;

use crate::tracking::TrackingState;

/// One option of a poll.
///
/// Exclusively owned by its [`crate::Poll`]; options are never shared
/// between polls. A deleted option stays in the parent's collection so the
/// reconciliation pass can still enumerate it.
#[derive(Debug, Clone)]
pub struct PollOption {
    id: Uuid,
    name: String,
    description: Option<String>,
    display_order: i32,
    state: TrackingState,
}

impl PollOption {
    /// Create an option that has never been persisted.
    pub fn new(
        id: Uuid,
        name: impl Into<String>,
        description: Option<String>,
        display_order: i32,
    ) -> AppResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AppError::Validation(
                "option name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id,
            name,
            description,
            display_order,
            state: TrackingState::New,
        })
    }

    /// Rehydrate an option from storage.
    #[must_use]
    pub const fn hydrate(
        id: Uuid,
        name: String,
        description: Option<String>,
        display_order: i32,
    ) -> Self {
        Self {
            id,
            name,
            description,
            display_order,
            state: TrackingState::Pristine,
        }
    }

    /// Option identity.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Option name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Display order within the poll.
    #[must_use]
    pub const fn display_order(&self) -> i32 {
        self.display_order
    }

    /// Current tracking state.
    #[must_use]
    pub const fn state(&self) -> TrackingState {
        self.state
    }

    /// Set the option name; rejects empty or whitespace-only values before
    /// any state change.
    pub fn set_name(&mut self, value: &str) -> AppResult<()> {
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "option name must not be empty".to_string(),
            ));
        }
        self.state.touch();
        if self.name != value {
            self.name = value.to_string();
            self.state.modify();
        }
        Ok(())
    }

    /// Set the option description.
    pub fn set_description(&mut self, value: Option<&str>) {
        self.state.touch();
        if self.description.as_deref() != value {
            self.description = value.map(ToString::to_string);
            self.state.modify();
        }
    }

    /// Mark this option for removal. It stays in the parent collection until
    /// reconciliation processes it.
    pub const fn delete(&mut self) {
        self.state.mark_deleted();
    }

    /// Reset tracking after a successful persistence round-trip.
    pub const fn reset_tracking(&mut self) {
        self.state.reset();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_option_starts_new() {
        let option = PollOption::new(Uuid::new_v4(), "Yes", None, 0).unwrap();
        assert_eq!(option.state(), TrackingState::New);
    }

    #[test]
    fn test_hydrated_option_starts_pristine() {
        let option = PollOption::hydrate(Uuid::new_v4(), "Yes".to_string(), None, 0);
        assert_eq!(option.state(), TrackingState::Pristine);
    }

    #[test]
    fn test_set_name_rejects_whitespace() {
        let mut option = PollOption::hydrate(Uuid::new_v4(), "Yes".to_string(), None, 0);
        assert!(option.set_name("   ").is_err());
        // Failed validation leaves the state untouched.
        assert_eq!(option.state(), TrackingState::Pristine);
    }

    #[test]
    fn test_same_value_touches_changed_value_modifies() {
        let mut option = PollOption::hydrate(Uuid::new_v4(), "Yes".to_string(), None, 0);
        option.set_name("Yes").unwrap();
        assert_eq!(option.state(), TrackingState::Touched);

        option.set_name("No").unwrap();
        assert_eq!(option.state(), TrackingState::Modified);
    }

    #[test]
    fn test_new_does_not_regress_on_mutation() {
        let mut option = PollOption::new(Uuid::new_v4(), "Yes", None, 0).unwrap();
        option.set_name("No").unwrap();
        option.set_description(Some("changed"));
        assert_eq!(option.state(), TrackingState::New);
    }

    #[test]
    fn test_delete_is_sticky() {
        let mut option = PollOption::hydrate(Uuid::new_v4(), "Yes".to_string(), None, 0);
        option.delete();
        option.set_name("No").unwrap();
        assert_eq!(option.state(), TrackingState::Deleted);
    }
}
