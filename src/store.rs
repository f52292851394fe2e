//! Local board collection.
//!
//! DESIGN
//! ======
//! `BoardStore` is the authoritative local view: boards in insertion order,
//! communicators, and the active communicator/board ids. It is cheap to
//! clone (shared `Arc<RwLock<..>>`) and every accessor hands out owned
//! clones, so a caller can never alias a stored board. Mutation is
//! read-clone-write under a single write lock; no lock is held across
//! remote I/O.
//!
//! Deleting or re-identifying a board also rewrites communicator board
//! lists so no communicator keeps a dangling id.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::model::{Board, BoardId, Communicator};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl crate::error::ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "E_STORE_IO",
            Self::Json(_) => "E_STORE_JSON",
        }
    }
}

/// Serializable contents of the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalSnapshot {
    #[serde(default)]
    pub boards: Vec<Board>,
    #[serde(default)]
    pub communicators: Vec<Communicator>,
    #[serde(default)]
    pub active_communicator: Option<String>,
    #[serde(default)]
    pub active_board: Option<BoardId>,
}

impl LocalSnapshot {
    fn board_index(&self, id: &str) -> Option<usize> {
        self.boards.iter().position(|b| b.id == id)
    }

    fn communicator_mut(&mut self, id: &str) -> Option<&mut Communicator> {
        self.communicators.iter_mut().find(|c| c.id == id)
    }
}

#[derive(Clone, Default)]
pub struct BoardStore {
    inner: Arc<RwLock<LocalSnapshot>>,
}

impl BoardStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_snapshot(snapshot: LocalSnapshot) -> Self {
        Self { inner: Arc::new(RwLock::new(snapshot)) }
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load_json(path: &Path) -> Result<Self, StoreError> {
        let text = tokio::fs::read_to_string(path).await?;
        let snapshot: LocalSnapshot = serde_json::from_str(&text)?;
        debug!(path = %path.display(), boards = snapshot.boards.len(), "loaded board store");
        Ok(Self::from_snapshot(snapshot))
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save_json(&self, path: &Path) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(&*self.inner.read().await)?;
        tokio::fs::write(path, text).await?;
        Ok(())
    }

    pub async fn snapshot(&self) -> LocalSnapshot {
        self.inner.read().await.clone()
    }

    // =========================================================================
    // BOARDS
    // =========================================================================

    pub async fn get(&self, id: &str) -> Option<Board> {
        self.inner.read().await.boards.iter().find(|b| b.id == id).cloned()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.inner.read().await.board_index(id).is_some()
    }

    pub async fn find_by_name(&self, name: &str) -> Option<Board> {
        self.inner.read().await.boards.iter().find(|b| b.name == name).cloned()
    }

    pub async fn boards(&self) -> Vec<Board> {
        self.inner.read().await.boards.clone()
    }

    /// First board with a non-empty id, the last-resort display fallback.
    pub async fn first_available(&self) -> Option<Board> {
        self.inner.read().await.boards.iter().find(|b| !b.id.is_empty()).cloned()
    }

    /// Insert a board, replacing any board with the same id.
    pub async fn insert(&self, board: Board) {
        let mut state = self.inner.write().await;
        match state.board_index(&board.id) {
            Some(idx) => state.boards[idx] = board,
            None => state.boards.push(board),
        }
    }

    /// Replace an existing board. Returns `false` if the id is unknown.
    pub async fn update(&self, board: Board) -> bool {
        let mut state = self.inner.write().await;
        let Some(idx) = state.board_index(&board.id) else {
            return false;
        };
        state.boards[idx] = board;
        true
    }

    /// Clone the stored board, apply `f` to the clone, write it back.
    /// Returns the written board.
    pub async fn modify<F>(&self, id: &str, f: F) -> Option<Board>
    where
        F: FnOnce(&mut Board),
    {
        let mut state = self.inner.write().await;
        let idx = state.board_index(id)?;
        let mut next = state.boards[idx].clone();
        f(&mut next);
        state.boards[idx] = next.clone();
        Some(next)
    }

    /// Re-identify a board: the entry under `old_id` becomes `board`;
    /// communicators, tiles pointing at it and the active board follow the
    /// new id.
    pub async fn replace_id(&self, old_id: &str, board: Board) -> bool {
        let mut state = self.inner.write().await;
        let Some(idx) = state.board_index(old_id) else {
            return false;
        };
        let new_id = board.id.clone();
        state.boards[idx] = board;
        if old_id != new_id {
            if let Some(dup) = state.boards.iter().enumerate().position(|(i, b)| i != idx && b.id == new_id) {
                state.boards.remove(dup);
            }
            for communicator in &mut state.communicators {
                communicator.rename_board(old_id, &new_id);
            }
            for other in &mut state.boards {
                for tile in &mut other.tiles {
                    if tile.load_board() == Some(old_id) {
                        tile.set_load_board(new_id.clone());
                    }
                }
            }
            if state.active_board.as_deref() == Some(old_id) {
                state.active_board = Some(new_id);
            }
        }
        true
    }

    /// Remove a board and sever it from every communicator. Returns the
    /// communicators that changed.
    pub async fn delete(&self, id: &str) -> (Option<Board>, Vec<Communicator>) {
        let mut state = self.inner.write().await;
        let removed = state.board_index(id).map(|idx| state.boards.remove(idx));
        let mut changed = Vec::new();
        for communicator in &mut state.communicators {
            if communicator.remove_board(id) {
                changed.push(communicator.clone());
            }
        }
        if state.active_board.as_deref() == Some(id) {
            state.active_board = None;
        }
        (removed, changed)
    }

    pub async fn active_board(&self) -> Option<BoardId> {
        self.inner.read().await.active_board.clone()
    }

    pub async fn set_active_board(&self, id: Option<BoardId>) {
        self.inner.write().await.active_board = id;
    }

    // =========================================================================
    // COMMUNICATORS
    // =========================================================================

    pub async fn communicators(&self) -> Vec<Communicator> {
        self.inner.read().await.communicators.clone()
    }

    pub async fn active_communicator(&self) -> Option<Communicator> {
        let state = self.inner.read().await;
        let id = state.active_communicator.as_deref()?;
        state.communicators.iter().find(|c| c.id == id).cloned()
    }

    pub async fn upsert_communicator(&self, communicator: Communicator) {
        let mut state = self.inner.write().await;
        match state.communicator_mut(&communicator.id) {
            Some(existing) => *existing = communicator,
            None => state.communicators.push(communicator),
        }
    }

    pub async fn set_active_communicator(&self, id: &str) -> bool {
        let mut state = self.inner.write().await;
        if state.communicators.iter().all(|c| c.id != id) {
            return false;
        }
        state.active_communicator = Some(id.to_string());
        true
    }

    /// Clone-modify-write the active communicator. Returns the written copy.
    pub async fn modify_active_communicator<F>(&self, f: F) -> Option<Communicator>
    where
        F: FnOnce(&mut Communicator),
    {
        let mut state = self.inner.write().await;
        let id = state.active_communicator.clone()?;
        let existing = state.communicator_mut(&id)?;
        let mut next = existing.clone();
        f(&mut next);
        *existing = next.clone();
        Some(next)
    }

    /// Swap a communicator's id after the remote store assigned one.
    pub async fn rename_communicator(&self, old_id: &str, new_id: &str) {
        let mut state = self.inner.write().await;
        if let Some(communicator) = state.communicator_mut(old_id) {
            communicator.id = new_id.to_string();
        }
        if state.active_communicator.as_deref() == Some(old_id) {
            state.active_communicator = Some(new_id.to_string());
        }
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
