//! Board resolver — pick the board to display for a navigation request.
//!
//! DESIGN
//! ======
//! First match wins:
//!
//! | requested            | active   | rule                                            |
//! |----------------------|----------|-------------------------------------------------|
//! | = active             | present  | active board, if still stored                   |
//! | ≠ active             | present  | local match, else remote, else active board     |
//! | present              | none     | local match, else remote, else nothing          |
//! | none                 | present  | active board                                    |
//! | none                 | none     | communicator root board                         |
//! | resolved to nothing  |          | communicator root, then any stored board        |
//!
//! A remotely fetched board is only displayed when the acting user authored
//! it. A public board owned by someone else is offered for copying instead,
//! and a private one is reported as blocked. Neither case is an error.

use tracing::{debug, info, warn};

use crate::model::{Board, OwnerContext};
use crate::state::AppState;

/// What the UI should show after a navigation request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resolution {
    pub board: Option<Board>,
    /// Public board owned by someone else; offer to copy it.
    pub prompt_copy: Option<Board>,
    /// Private board owned by someone else was requested.
    pub prompt_blocked: bool,
}

/// Ownership/visibility decision for a remotely fetched board.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteAccess {
    Owned(Board),
    OfferCopy(Board),
    Blocked,
}

#[must_use]
pub fn check_remote_access(board: Board, owner: &OwnerContext) -> RemoteAccess {
    if board.is_authored_by(owner) {
        RemoteAccess::Owned(board)
    } else if board.is_public {
        RemoteAccess::OfferCopy(board)
    } else {
        RemoteAccess::Blocked
    }
}

/// Resolve `requested` against the local store, the remote API and the
/// active communicator, and make the result the active board.
pub async fn resolve_board_for_request(state: &AppState, requested: Option<&str>, owner: &OwnerContext) -> Resolution {
    let mut resolution = Resolution::default();
    let active = state.store.active_board().await;

    let found = match (requested, active.as_deref()) {
        (Some(id), Some(active_id)) if id == active_id => state.store.get(active_id).await,
        (Some(id), Some(active_id)) => match state.store.get(id).await {
            Some(board) => Some(board),
            None => match try_remote(state, id, owner, &mut resolution).await {
                Some(board) => Some(board),
                None => state.store.get(active_id).await,
            },
        },
        (Some(id), None) => match state.store.get(id).await {
            Some(board) => Some(board),
            None => try_remote(state, id, owner, &mut resolution).await,
        },
        (None, Some(active_id)) => state.store.get(active_id).await,
        (None, None) => communicator_root(state).await,
    };

    let board = match found {
        Some(board) => Some(board),
        None => match communicator_root(state).await {
            Some(board) => Some(board),
            None => state.store.first_available().await,
        },
    };

    match &board {
        Some(b) => {
            debug!(requested = ?requested, board_id = %b.id, "board resolved");
            state.store.set_active_board(Some(b.id.clone())).await;
        }
        None => warn!(requested = ?requested, "no board available to display"),
    }
    resolution.board = board;
    resolution
}

async fn communicator_root(state: &AppState) -> Option<Board> {
    let communicator = state.store.active_communicator().await?;
    state.store.get(&communicator.root_board).await
}

/// Fetch a board that is not stored locally. An owned board is cached in
/// the store; other outcomes set the prompt fields and yield nothing.
async fn try_remote(state: &AppState, id: &str, owner: &OwnerContext, resolution: &mut Resolution) -> Option<Board> {
    let fetched = match state.remote.fetch_board(id).await {
        Ok(board) => board,
        Err(e) => {
            debug!(error = %e, board_id = %id, "remote board unavailable; falling back");
            return None;
        }
    };

    match check_remote_access(fetched, owner) {
        RemoteAccess::Owned(board) => {
            state.store.insert(board.clone()).await;
            Some(board)
        }
        RemoteAccess::OfferCopy(board) => {
            info!(board_id = %board.id, "public board owned by another user; offering copy");
            resolution.prompt_copy = Some(board);
            None
        }
        RemoteAccess::Blocked => {
            info!(board_id = %id, "private board owned by another user; access blocked");
            resolution.prompt_blocked = true;
            None
        }
    }
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;
