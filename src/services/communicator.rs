//! Communicator service — manage the boards of the active communicator.
//!
//! Every operation updates local state first. For authenticated users the
//! change is then pushed; push failures are logged and otherwise ignored,
//! the local state stays authoritative until the next push.

use tracing::{info, warn};

use crate::model::{Board, OwnerContext};
use crate::state::AppState;

/// Result of deleting a board.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeleteOutcome {
    pub removed: bool,
    /// Communicators that referenced the board and were updated.
    pub communicators: Vec<String>,
}

async fn push_active(state: &AppState, owner: &OwnerContext) {
    if !owner.is_authenticated() {
        return;
    }
    let Some(communicator) = state.store.active_communicator().await else {
        return;
    };
    if let Err(e) = state.remote.update_communicator(&communicator).await {
        warn!(error = %e, communicator_id = %communicator.id, "communicator update failed");
    }
}

/// Add a board to the active communicator, fetching it when it is not
/// stored locally. Returns `false` if it was already there or there is no
/// active communicator.
pub async fn add_board(state: &AppState, board_id: &str, owner: &OwnerContext) -> bool {
    let mut added = false;
    if state
        .store
        .modify_active_communicator(|c| added = c.add_board(board_id))
        .await
        .is_none()
    {
        return false;
    }
    if !added {
        return false;
    }

    if !state.store.contains(board_id).await {
        match state.remote.fetch_board(board_id).await {
            Ok(board) => state.store.insert(board).await,
            Err(e) => warn!(error = %e, %board_id, "added board is not available locally"),
        }
    }
    push_active(state, owner).await;
    true
}

/// Remove a board from the active communicator (the board itself stays).
pub async fn remove_board(state: &AppState, board_id: &str, owner: &OwnerContext) -> bool {
    let mut removed = false;
    state
        .store
        .modify_active_communicator(|c| removed = c.remove_board(board_id))
        .await;
    if removed {
        push_active(state, owner).await;
    }
    removed
}

/// Make `board_id` the root of the active communicator.
pub async fn set_root_board(state: &AppState, board_id: &str, owner: &OwnerContext) -> bool {
    let updated = state
        .store
        .modify_active_communicator(|c| {
            c.add_board(board_id);
            c.root_board = board_id.to_string();
        })
        .await
        .is_some();
    if updated {
        push_active(state, owner).await;
    }
    updated
}

/// Toggle a board's public flag. The remote response, when there is one,
/// replaces the local board.
pub async fn publish_board(state: &AppState, board_id: &str, owner: &OwnerContext) -> Option<Board> {
    let toggled = state.store.modify(board_id, |b| b.is_public = !b.is_public).await?;
    info!(%board_id, is_public = toggled.is_public, "board publication toggled");
    if !owner.is_authenticated() {
        return Some(toggled);
    }

    match state.remote.update_board(&toggled).await {
        Ok(stored) => {
            state.store.replace_id(board_id, stored.clone()).await;
            Some(stored)
        }
        Err(e) => {
            warn!(error = %e, %board_id, "publish push failed");
            Some(toggled)
        }
    }
}

/// Delete a board locally and remotely and sever it from every
/// communicator.
pub async fn delete_board(state: &AppState, board_id: &str, owner: &OwnerContext) -> DeleteOutcome {
    let (removed, changed) = state.store.delete(board_id).await;

    if owner.is_authenticated() {
        if let Err(e) = state.remote.delete_board(board_id).await {
            warn!(error = %e, %board_id, "remote board delete failed");
        }
        for communicator in &changed {
            if let Err(e) = state.remote.update_communicator(communicator).await {
                warn!(error = %e, communicator_id = %communicator.id, "communicator update failed");
            }
        }
    }

    info!(%board_id, communicators = changed.len(), "board deleted");
    DeleteOutcome { removed: removed.is_some(), communicators: changed.into_iter().map(|c| c.id).collect() }
}

/// Case-insensitive search over name (or id when unnamed) and author.
pub async fn search_local_boards(state: &AppState, query: &str) -> Vec<Board> {
    let needle = query.to_lowercase();
    state
        .store
        .boards()
        .await
        .into_iter()
        .filter(|b| {
            let title = if b.name.is_empty() { &b.id } else { &b.name };
            title.to_lowercase().contains(&needle) || b.author.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Boards listed by the active communicator, in communicator order.
pub async fn communicator_boards(state: &AppState) -> Vec<Board> {
    let Some(communicator) = state.store.active_communicator().await else {
        return Vec::new();
    };
    let mut boards = Vec::with_capacity(communicator.boards.len());
    for id in &communicator.boards {
        if let Some(board) = state.store.get(id).await {
            boards.push(board);
        }
    }
    boards
}

#[cfg(test)]
#[path = "communicator_test.rs"]
mod tests;
