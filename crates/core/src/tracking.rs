//! Change tracking for domain entities.

/// Per-entity marker of what happened to it since it was loaded.
///
/// Every transition is total; none of the operations can fail. The state
/// drives reconciliation: `New` becomes an insert, `Modified` a replace,
/// `Deleted` a delete, and `Pristine`/`Touched` produce no write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingState {
    /// Unmodified, as loaded from storage.
    #[default]
    Pristine,
    /// Created this session, never persisted.
    New,
    /// A setter ran but produced no value change.
    Touched,
    /// A setter changed a value.
    Modified,
    /// Marked for removal, not yet persisted as such.
    Deleted,
}

impl TrackingState {
    /// Record that a setter was invoked, whether or not it changed anything.
    pub const fn touch(&mut self) {
        if matches!(self, Self::Pristine) {
            *self = Self::Touched;
        }
    }

    /// Record that a setter changed a value.
    ///
    /// `New` entities stay `New` until persisted, and `Deleted` stays
    /// `Deleted`; mutation does not resurrect either.
    pub const fn modify(&mut self) {
        if matches!(self, Self::Pristine | Self::Touched) {
            *self = Self::Modified;
        }
    }

    /// Mark for deletion, regardless of prior state.
    pub const fn mark_deleted(&mut self) {
        *self = Self::Deleted;
    }

    /// Reset after a successful persistence round-trip.
    pub const fn reset(&mut self) {
        *self = Self::Pristine;
    }
}
