//! Board controller — edit operations behind the board UI.
//!
//! DESIGN
//! ======
//! Every edit loads a clone of the board, changes the clone and hands it to
//! `commit_edit`, which settles ownership before anything is written:
//!
//! - an authenticated user editing someone else's board takes it over
//!   (author/email, private, visible, with a display name);
//! - a system/template board (short id) is never changed in place: the edit
//!   lands on a copy under a fresh id, and the communicator and the user's
//!   own boards are repointed at the copy;
//! - otherwise the stored board is replaced.
//!
//! Authenticated edits are then pushed (board, then communicator). A push
//! failure leaves the edit local-only; the returned `EditOutcome` still
//! names the board to navigate to and carries the remote errors so the
//! caller can tell the user the change was not saved remotely.

use tracing::{debug, info, warn};

use crate::grid::{self, Grid};
use crate::model::{Board, BoardId, OwnerContext, Tile, TileId};
use crate::remote::RemoteError;
use crate::services::copy::{CopyOutcome, copy_subgraph};
use crate::services::resolver::{RemoteAccess, check_remote_access};
use crate::services::sync::{BoardWrite, ensure_own_communicator, push_active_communicator, push_board};
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("board not found: {0}")]
    BoardNotFound(BoardId),
    #[error("tile not found: {0}")]
    TileNotFound(TileId),
    #[error("grid cannot {0}")]
    GridBounds(&'static str),
    #[error("board {0} has no grid")]
    NoGrid(BoardId),
    #[error("board {0} is private to another user")]
    Blocked(BoardId),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl crate::error::ErrorCode for ControllerError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::BoardNotFound(_) => "E_BOARD_NOT_FOUND",
            Self::TileNotFound(_) => "E_TILE_NOT_FOUND",
            Self::GridBounds(_) => "E_GRID_BOUNDS",
            Self::NoGrid(_) => "E_NO_GRID",
            Self::Blocked(_) => "E_BOARD_BLOCKED",
            Self::Remote(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Remote(e) => e.retryable(),
            _ => false,
        }
    }
}

/// Where an edit ended up.
#[derive(Debug)]
pub struct EditOutcome {
    /// Board to navigate to.
    pub board_id: BoardId,
    /// Set when the edit was applied to a fresh copy of a template board.
    pub copied_from: Option<BoardId>,
    /// Remote pushes that failed; the edit is kept locally regardless.
    pub failures: Vec<RemoteError>,
}

impl EditOutcome {
    fn local(board_id: BoardId) -> Self {
        Self { board_id, copied_from: None, failures: Vec::new() }
    }

    /// `true` when every remote push for the edit succeeded.
    #[must_use]
    pub fn synced(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridAxis {
    Rows,
    Columns,
}

/// Tiles copied from one board, waiting to be pasted into another.
#[derive(Debug, Clone, PartialEq)]
pub struct TileClipboard {
    pub source_board: BoardId,
    pub tiles: Vec<Tile>,
}

#[derive(Debug, Default)]
pub struct PasteOutcome {
    pub edit: Option<EditOutcome>,
    pub pasted: Vec<TileId>,
    /// Deep copies made for pasted folder tiles.
    pub copies: Vec<CopyOutcome>,
    /// Folder tiles whose board could not be found locally.
    pub skipped: Vec<TileId>,
}

// =============================================================================
// COMMIT
// =============================================================================

async fn load(state: &AppState, board_id: &str) -> Result<Board, ControllerError> {
    state
        .store
        .get(board_id)
        .await
        .ok_or_else(|| ControllerError::BoardNotFound(board_id.to_string()))
}

/// Boards whose references may be repointed at a user's copy.
fn editable_by(board: &Board, owner: &OwnerContext) -> bool {
    if board.is_default() {
        return false;
    }
    match owner {
        OwnerContext::Anonymous => board.email.is_empty(),
        OwnerContext::Authenticated { .. } => board.is_owned_by(owner),
    }
}

/// Persist an edited board with ownership and copy-on-write rules applied.
pub async fn commit_edit(state: &AppState, edited: Board, owner: &OwnerContext) -> EditOutcome {
    let mut board = edited;
    if owner.is_authenticated() && !board.is_owned_by(owner) {
        board.name = board.display_name();
        board.assign_owner(owner);
    }
    let own = if owner.is_authenticated() { ensure_own_communicator(state, owner).await } else { None };

    let (write, copied_from) = if board.is_default() {
        let original_id = std::mem::replace(&mut board.id, state.ids.generate());
        board.assign_owner(owner);
        state.store.insert(board.clone()).await;
        adopt_copy(state, &original_id, &board.id, owner).await;
        info!(original_id = %original_id, copy_id = %board.id, "template board copied on write");
        (BoardWrite::Create, Some(original_id))
    } else {
        state.store.insert(board.clone()).await;
        (BoardWrite::Update, None)
    };

    let mut board_id = board.id.clone();
    let mut failures = Vec::new();
    if owner.is_authenticated() {
        match push_board(state, &board, write).await {
            Ok(id) => board_id = id,
            Err(e) => failures.push(e),
        }
        let created = own.is_some_and(|o| o.created);
        if let Err(e) = push_active_communicator(state, created).await {
            failures.push(e);
        }
    }

    if let Some(original_id) = &copied_from {
        if state.store.active_board().await.as_deref() == Some(original_id.as_str()) {
            state.store.set_active_board(Some(board_id.clone())).await;
        }
    }
    EditOutcome { board_id, copied_from, failures }
}

/// Point the communicator and the user's own boards at a template's copy.
async fn adopt_copy(state: &AppState, original_id: &str, copy_id: &str, owner: &OwnerContext) {
    state
        .store
        .modify_active_communicator(|c| {
            if !c.rename_board(original_id, copy_id) {
                c.add_board(copy_id);
            }
        })
        .await;

    let parents: Vec<BoardId> = state
        .store
        .boards()
        .await
        .into_iter()
        .filter(|b| editable_by(b, owner) && b.references(original_id))
        .map(|b| b.id)
        .collect();
    for parent_id in parents {
        state
            .store
            .modify(&parent_id, |b| {
                for tile in &mut b.tiles {
                    if tile.load_board() == Some(original_id) {
                        tile.set_load_board(copy_id);
                    }
                }
            })
            .await;
        debug!(%parent_id, %copy_id, "parent repointed at template copy");
    }
}

// =============================================================================
// BOARD EDITS
// =============================================================================

/// # Errors
///
/// Returns an error if the board does not exist.
pub async fn rename_board(
    state: &AppState,
    board_id: &str,
    name: &str,
    owner: &OwnerContext,
) -> Result<EditOutcome, ControllerError> {
    let mut board = load(state, board_id).await?;
    board.name = name.to_string();
    Ok(commit_edit(state, board, owner).await)
}

/// Toggle between free and fixed layout; a fixed board without a grid gets
/// the default one.
///
/// # Errors
///
/// Returns an error if the board does not exist.
pub async fn toggle_fixed(state: &AppState, board_id: &str, owner: &OwnerContext) -> Result<EditOutcome, ControllerError> {
    let mut board = load(state, board_id).await?;
    board.is_fixed = !board.is_fixed;
    if board.grid.is_none() {
        board.grid = Some(Grid::from_tiles(&board.tiles));
    }
    Ok(commit_edit(state, board, owner).await)
}

/// Add or remove one row or column.
///
/// # Errors
///
/// Returns an error if the board does not exist or the grid is already at
/// its bound.
pub async fn resize_grid(
    state: &AppState,
    board_id: &str,
    axis: GridAxis,
    grow: bool,
    owner: &OwnerContext,
) -> Result<EditOutcome, ControllerError> {
    let mut board = load(state, board_id).await?;
    let mut grid = board.grid.clone().unwrap_or_else(|| Grid::from_tiles(&board.tiles));
    let stepped = match axis {
        GridAxis::Rows => grid.step_rows(grow, &board.tiles),
        GridAxis::Columns => grid.step_columns(grow, &board.tiles),
    };
    if !stepped {
        return Err(ControllerError::GridBounds(if grow { "grow" } else { "shrink" }));
    }
    board.grid = Some(grid);
    Ok(commit_edit(state, board, owner).await)
}

/// # Errors
///
/// See [`resize_grid`].
pub async fn add_row(state: &AppState, board_id: &str, owner: &OwnerContext) -> Result<EditOutcome, ControllerError> {
    resize_grid(state, board_id, GridAxis::Rows, true, owner).await
}

/// # Errors
///
/// See [`resize_grid`].
pub async fn remove_row(state: &AppState, board_id: &str, owner: &OwnerContext) -> Result<EditOutcome, ControllerError> {
    resize_grid(state, board_id, GridAxis::Rows, false, owner).await
}

/// # Errors
///
/// See [`resize_grid`].
pub async fn add_column(state: &AppState, board_id: &str, owner: &OwnerContext) -> Result<EditOutcome, ControllerError> {
    resize_grid(state, board_id, GridAxis::Columns, true, owner).await
}

/// # Errors
///
/// See [`resize_grid`].
pub async fn remove_column(state: &AppState, board_id: &str, owner: &OwnerContext) -> Result<EditOutcome, ControllerError> {
    resize_grid(state, board_id, GridAxis::Columns, false, owner).await
}

/// Drop a tile on a grid cell, swapping with its occupant.
///
/// # Errors
///
/// Returns an error if the board or tile does not exist or the board has
/// no grid.
pub async fn move_tile(
    state: &AppState,
    board_id: &str,
    tile_id: &str,
    position: (usize, usize),
    owner: &OwnerContext,
) -> Result<EditOutcome, ControllerError> {
    let mut board = load(state, board_id).await?;
    if board.tiles.iter().all(|t| t.id != tile_id) {
        return Err(ControllerError::TileNotFound(tile_id.to_string()));
    }
    let Some(grid) = board.grid.as_mut() else {
        return Err(ControllerError::NoGrid(board_id.to_string()));
    };
    grid.order = grid::move_order_item(&grid.order, tile_id, position);
    Ok(commit_edit(state, board, owner).await)
}

/// Reorder tiles after a free-layout drag. Ids not on the board are
/// ignored; tiles not named keep their relative order at the end. An
/// unchanged order commits nothing.
///
/// # Errors
///
/// Returns an error if the board does not exist.
pub async fn reorder_tiles(
    state: &AppState,
    board_id: &str,
    order: &[TileId],
    owner: &OwnerContext,
) -> Result<EditOutcome, ControllerError> {
    let mut board = load(state, board_id).await?;
    let mut remaining = board.tiles.clone();
    let mut tiles = Vec::with_capacity(remaining.len());
    for id in order {
        if let Some(idx) = remaining.iter().position(|t| &t.id == id) {
            tiles.push(remaining.remove(idx));
        }
    }
    tiles.extend(remaining);

    if tiles == board.tiles {
        return Ok(EditOutcome::local(board.id));
    }
    board.tiles = tiles;
    Ok(commit_edit(state, board, owner).await)
}

/// Toggle the public flag through the ownership rules.
///
/// # Errors
///
/// Returns an error if the board does not exist.
pub async fn publish(state: &AppState, board_id: &str, owner: &OwnerContext) -> Result<EditOutcome, ControllerError> {
    let mut board = load(state, board_id).await?;
    board.is_public = !board.is_public;
    Ok(commit_edit(state, board, owner).await)
}

// =============================================================================
// TILE EDITS
// =============================================================================

/// Add a tile. A folder tile also creates its (empty) owned sub-board and
/// adds it to the active communicator.
///
/// # Errors
///
/// Returns an error if the board does not exist.
pub async fn add_tile(
    state: &AppState,
    board_id: &str,
    tile: Tile,
    owner: &OwnerContext,
) -> Result<EditOutcome, ControllerError> {
    let mut board = load(state, board_id).await?;
    let mut tile = tile;
    let mut child_failure = None;

    if let Some(requested) = tile.owned_board().map(str::to_owned) {
        let (child_id, failure) = create_child_board(state, &board, &tile, &requested, owner).await;
        tile.set_load_board(child_id);
        child_failure = failure;
    }

    if let Some(grid) = board.grid.as_mut() {
        if !grid::place_in_first_empty(&mut grid.order, &tile.id) {
            debug!(board_id = %board.id, tile_id = %tile.id, "grid full; tile kept off-grid");
        }
    }
    board.tiles.push(tile);
    let mut outcome = commit_edit(state, board, owner).await;
    outcome.failures.extend(child_failure);
    Ok(outcome)
}

/// Create the sub-board behind a new folder tile. Returns its final id and
/// the remote create error, if any.
async fn create_child_board(
    state: &AppState,
    parent: &Board,
    tile: &Tile,
    child_id: &str,
    owner: &OwnerContext,
) -> (BoardId, Option<RemoteError>) {
    let mut child = Board::new(child_id, tile.label.clone());
    child.name_key.clone_from(&tile.label_key);
    if owner.is_authenticated() {
        child.assign_owner(owner);
    } else {
        child.author.clone_from(&parent.author);
        child.email.clone_from(&parent.email);
    }
    state.store.insert(child.clone()).await;
    state
        .store
        .modify_active_communicator(|c| {
            c.add_board(child_id);
        })
        .await;

    if !owner.is_authenticated() {
        return (child.id, None);
    }
    match push_board(state, &child, BoardWrite::Create).await {
        Ok(id) => (id, None),
        Err(e) => (child.id, Some(e)),
    }
}

/// Replace tiles by id.
///
/// # Errors
///
/// Returns an error if the board or any tile does not exist.
pub async fn edit_tiles(
    state: &AppState,
    board_id: &str,
    edited: Vec<Tile>,
    owner: &OwnerContext,
) -> Result<EditOutcome, ControllerError> {
    let mut board = load(state, board_id).await?;
    for tile in edited {
        let Some(slot) = board.tiles.iter_mut().find(|t| t.id == tile.id) else {
            return Err(ControllerError::TileNotFound(tile.id));
        };
        *slot = tile;
    }
    Ok(commit_edit(state, board, owner).await)
}

/// Remove tiles and their grid cells.
///
/// # Errors
///
/// Returns an error if the board does not exist.
pub async fn delete_tiles(
    state: &AppState,
    board_id: &str,
    tile_ids: &[TileId],
    owner: &OwnerContext,
) -> Result<EditOutcome, ControllerError> {
    let mut board = load(state, board_id).await?;
    board.tiles.retain(|t| !tile_ids.contains(&t.id));
    if let Some(grid) = board.grid.as_mut() {
        grid::clear_cells(&mut grid.order, tile_ids);
    }
    Ok(commit_edit(state, board, owner).await)
}

// =============================================================================
// COPY / PASTE
// =============================================================================

/// Capture the selected tiles of a board. Unknown ids are ignored.
///
/// # Errors
///
/// Returns an error if the board does not exist.
pub async fn copy_tiles(state: &AppState, board_id: &str, tile_ids: &[TileId]) -> Result<TileClipboard, ControllerError> {
    let board = load(state, board_id).await?;
    let tiles = tile_ids
        .iter()
        .filter_map(|id| board.tiles.iter().find(|t| &t.id == id).cloned())
        .collect();
    Ok(TileClipboard { source_board: board.id, tiles })
}

/// Paste clipboard tiles into another board. Folder tiles deep-copy their
/// sub-board and land as folder tiles pointing at the copy; other tiles get
/// fresh ids. Pasting into the source board does nothing.
///
/// # Errors
///
/// Returns an error if the target board does not exist.
pub async fn paste_tiles(
    state: &AppState,
    target_board: &str,
    clipboard: &TileClipboard,
    owner: &OwnerContext,
) -> Result<PasteOutcome, ControllerError> {
    let mut outcome = PasteOutcome::default();
    if clipboard.source_board == target_board {
        return Ok(outcome);
    }
    load(state, target_board).await?;

    let mut new_tiles = Vec::new();
    for tile in &clipboard.tiles {
        let mut pasted = tile.clone();
        pasted.id = state.ids.generate();

        if let Some(source_id) = tile.owned_board() {
            let Some(source) = state.store.get(source_id).await else {
                warn!(tile_id = %tile.id, board_id = %source_id, "pasted folder board not found locally");
                outcome.skipped.push(tile.id.clone());
                continue;
            };
            let Some(copy) = copy_subgraph(state, Some(&source), owner).await else {
                continue;
            };
            pasted.set_load_board(copy.new_root_id.clone());
            pasted.sound = None;
            pasted.vocalization = None;
            outcome.copies.push(copy);
        }
        outcome.pasted.push(pasted.id.clone());
        new_tiles.push(pasted);
    }

    if new_tiles.is_empty() {
        return Ok(outcome);
    }
    // Re-read: the copies above may have touched the communicator, not the target.
    let mut board = load(state, target_board).await?;
    for tile in new_tiles {
        if let Some(grid) = board.grid.as_mut() {
            grid::place_in_first_empty(&mut grid.order, &tile.id);
        }
        board.tiles.push(tile);
    }
    outcome.edit = Some(commit_edit(state, board, owner).await);
    Ok(outcome)
}

/// Accept a copy prompt from the resolver: copy the public board and make
/// the copy the active board.
pub async fn copy_public_board(state: &AppState, board: &Board, owner: &OwnerContext) -> Option<CopyOutcome> {
    let outcome = copy_subgraph(state, Some(board), owner).await?;
    state.store.set_active_board(Some(outcome.new_root_id.clone())).await;
    Some(outcome)
}

/// Copy a board by id. A board missing locally is fetched remotely; a
/// public board of another user goes through [`copy_public_board`], which
/// is how a copy prompt from the resolver is accepted by id.
///
/// # Errors
///
/// Returns an error if the board exists nowhere, is private to another
/// user, or cannot be fetched.
pub async fn copy_board_by_id(state: &AppState, board_id: &str, owner: &OwnerContext) -> Result<CopyOutcome, ControllerError> {
    let not_found = || ControllerError::BoardNotFound(board_id.to_string());
    if let Some(local) = state.store.get(board_id).await {
        return copy_subgraph(state, Some(&local), owner).await.ok_or_else(not_found);
    }

    let fetched = state.remote.fetch_board(board_id).await.map_err(|e| {
        if e.is_not_found() { not_found() } else { ControllerError::Remote(e) }
    })?;
    let outcome = match check_remote_access(fetched, owner) {
        RemoteAccess::Owned(board) => copy_subgraph(state, Some(&board), owner).await,
        RemoteAccess::OfferCopy(board) => copy_public_board(state, &board, owner).await,
        RemoteAccess::Blocked => return Err(ControllerError::Blocked(board_id.to_string())),
    };
    outcome.ok_or_else(not_found)
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
