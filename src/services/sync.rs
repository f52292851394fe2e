//! Remote sync — push local boards and communicators to the remote API.
//!
//! DESIGN
//! ======
//! Local state is always written first; the remote call follows. When the
//! remote store assigns a new id on create, the local board is re-identified
//! (`BoardStore::replace_id`) so communicators follow it.
//!
//! ERROR HANDLING
//! ==============
//! Remote failures are logged and returned, never rolled back: the board
//! simply stays local-only until the next successful push.

use tracing::{info, warn};

use crate::model::{Board, BoardId, Communicator, OwnerContext};
use crate::remote::RemoteError;
use crate::state::AppState;

/// Whether a push creates a new remote board or updates an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardWrite {
    Create,
    Update,
}

/// The active communicator after ownership has been settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnCommunicator {
    pub communicator: Communicator,
    /// `true` when a personal copy was just cloned and must be created remotely.
    pub created: bool,
}

/// Make sure the active communicator belongs to `owner`, cloning it under a
/// fresh id when it belongs to someone else. Anonymous users keep whatever
/// is active.
pub async fn ensure_own_communicator(state: &AppState, owner: &OwnerContext) -> Option<OwnCommunicator> {
    let current = state.store.active_communicator().await?;
    if !owner.is_authenticated() || current.is_owned_by(owner) {
        return Some(OwnCommunicator { communicator: current, created: false });
    }

    let communicator = Communicator {
        id: state.ids.generate(),
        author: owner.name().to_string(),
        email: owner.email().to_string(),
        ..current
    };
    state.store.upsert_communicator(communicator.clone()).await;
    state.store.set_active_communicator(&communicator.id).await;
    info!(communicator_id = %communicator.id, "cloned communicator for owner");
    Some(OwnCommunicator { communicator, created: true })
}

/// Push the active communicator. A freshly cloned one is created remotely
/// and re-identified locally with the assigned id.
///
/// # Errors
///
/// Returns the remote error; local state is left as is.
pub async fn push_active_communicator(state: &AppState, created: bool) -> Result<(), RemoteError> {
    let Some(communicator) = state.store.active_communicator().await else {
        return Ok(());
    };

    if created {
        match state.remote.create_communicator(&communicator).await {
            Ok(assigned) => {
                if assigned != communicator.id {
                    state.store.rename_communicator(&communicator.id, &assigned).await;
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, communicator_id = %communicator.id, "communicator create failed; kept local");
                Err(e)
            }
        }
    } else {
        state.remote.update_communicator(&communicator).await.map_err(|e| {
            warn!(error = %e, communicator_id = %communicator.id, "communicator update failed");
            e
        })
    }
}

/// Push one board. Returns the id the board has after the push.
///
/// # Errors
///
/// Returns the remote error; the board stays local-only under its
/// current id.
pub async fn push_board(state: &AppState, board: &Board, write: BoardWrite) -> Result<BoardId, RemoteError> {
    match write {
        BoardWrite::Create => {
            let assigned = state.remote.create_board(board).await.map_err(|e| {
                warn!(error = %e, board_id = %board.id, "board create failed; kept local");
                e
            })?;
            if assigned != board.id {
                let Some(mut stored) = state.store.get(&board.id).await else {
                    return Ok(assigned);
                };
                stored.id.clone_from(&assigned);
                state.store.replace_id(&board.id, stored).await;
                info!(local_id = %board.id, remote_id = %assigned, "board re-identified by remote store");
            }
            Ok(assigned)
        }
        BoardWrite::Update => {
            state.remote.update_board(board).await.map_err(|e| {
                warn!(error = %e, board_id = %board.id, "board update failed");
                e
            })?;
            Ok(board.id.clone())
        }
    }
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
