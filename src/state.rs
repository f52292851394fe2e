//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` bundles the collaborators every service needs: the local
//! board store, the remote API client and the id generator. It is cheap to
//! clone; all inner fields are `Arc`-wrapped.

use std::sync::Arc;

use crate::ids::{IdGenerator, ShortIdGenerator};
use crate::remote::RemoteBoardClient;
use crate::store::BoardStore;

#[derive(Clone)]
pub struct AppState {
    pub store: BoardStore,
    pub remote: Arc<dyn RemoteBoardClient>,
    pub ids: Arc<dyn IdGenerator>,
}

impl AppState {
    #[must_use]
    pub fn new(store: BoardStore, remote: Arc<dyn RemoteBoardClient>) -> Self {
        Self { store, remote, ids: Arc::new(ShortIdGenerator::new()) }
    }

    #[must_use]
    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
