//! Navigation — tile activation and the board history stack.
//!
//! Activating a tile that points at a board navigates to it: by id when the
//! target is stored, otherwise by a board whose name equals the tile label.
//! Anything else produces output (speech unless the action starts with `+`).

use tracing::{debug, warn};

use crate::model::{BoardId, Tile};
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileActivation {
    Navigate(BoardId),
    /// The tile points at a board that cannot be found.
    Missing,
    Output { speech: Option<String>, sound: Option<String> },
}

/// Stack of visited board ids; the last entry is the current board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavHistory {
    stack: Vec<BoardId>,
}

impl NavHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Visit a board. Re-visiting the current board is a no-op.
    pub fn push(&mut self, board_id: impl Into<BoardId>) {
        let board_id = board_id.into();
        if self.current() != Some(board_id.as_str()) {
            self.stack.push(board_id);
        }
    }

    /// Leave the current board; returns the board to go back to.
    pub fn back(&mut self) -> Option<BoardId> {
        if self.stack.len() < 2 {
            return None;
        }
        self.stack.pop();
        self.stack.last().cloned()
    }

    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }

    #[must_use]
    pub fn previous(&self) -> Option<&str> {
        self.stack.len().checked_sub(2).map(|i| self.stack[i].as_str())
    }

    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.stack.len() > 1
    }

    /// Forget every visit to a board (e.g. after it was deleted).
    pub fn prune(&mut self, board_id: &str) {
        self.stack.retain(|id| id != board_id);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

/// Work out what activating `tile` does. Navigation also makes the target
/// the active board and records it in `history`.
pub async fn activate_tile(state: &AppState, tile: &Tile, history: &mut NavHistory) -> TileActivation {
    let Some(target) = tile.load_board() else {
        return TileActivation::Output {
            speech: tile.speech().map(str::to_owned),
            sound: tile.sound.clone().filter(|s| !s.is_empty()),
        };
    };

    let board = match state.store.get(target).await {
        Some(board) => Some(board),
        None => state.store.find_by_name(&tile.label).await,
    };
    let Some(board) = board else {
        warn!(tile_id = %tile.id, board_id = %target, "tile points at a missing board");
        return TileActivation::Missing;
    };

    debug!(tile_id = %tile.id, board_id = %board.id, "navigating");
    state.store.set_active_board(Some(board.id.clone())).await;
    history.push(board.id.clone());
    TileActivation::Navigate(board.id)
}

/// Handle an explicit request to show `requested` given the history: going
/// to the previous board is a back step, and a previous board that no
/// longer exists is dropped from the history. Returns the board to show.
pub async fn follow_history(state: &AppState, history: &mut NavHistory, requested: &str) -> Option<BoardId> {
    let exists = state.store.contains(requested).await;
    if history.previous() == Some(requested) {
        if exists {
            return history.back();
        }
        history.prune(requested);
        return history.current().map(str::to_owned);
    }
    if !exists {
        return None;
    }
    history.push(requested);
    Some(requested.to_string())
}

#[cfg(test)]
#[path = "navigation_test.rs"]
mod tests;
