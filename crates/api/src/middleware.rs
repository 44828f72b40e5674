//! API middleware and shared state.

use pollstar_core::services::PollService;
use pollstar_db::table::TableStoreHandle;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// Poll business logic.
    pub poll_service: PollService,
    /// Store handle used by the readiness probe.
    pub store: TableStoreHandle,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(poll_service: PollService, store: TableStoreHandle) -> Self {
        Self {
            poll_service,
            store,
        }
    }
}
