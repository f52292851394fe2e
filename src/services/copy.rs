//! Graph copy engine — deep, de-duplicated copy of a board subgraph.
//!
//! DESIGN
//! ======
//! Copying board R copies R and every board reachable from it through owned
//! (`Folder`) tiles; `Link` tiles are followed by nobody. Each branch runs
//! its own steps in order:
//!
//! 1. claim the original id in the shared `CopyLog` (skip if already claimed
//!    or if the id is itself a copy made by this operation),
//! 2. mint an id, build the copy under the acting owner, insert it locally,
//! 3. create it remotely when the owner is authenticated, adopting the id
//!    the remote store assigns,
//! 4. append `{prev, next}` and rewrite references to the original inside
//!    the copied boards,
//! 5. resolve every owned child (local first, then remote, then local again
//!    on a remote 404) and recurse.
//!
//! Sibling branches run concurrently and are joined with `join_all` before
//! the operation reports, so the caller always sees the finished graph.
//! Once everything has joined, a repair pass maps every remaining original
//! id to its copy inside the new subgraph (back edges of cycles, diamonds
//! whose shared child finished first), and boards rewritten after their
//! remote create are pushed again.
//!
//! CONCURRENCY
//! ===========
//! The log is a `std::sync::Mutex`; claim is an atomic check-and-insert and
//! no guard is ever held across an await.
//!
//! ERROR HANDLING
//! ==============
//! Best-effort, not atomic. A failed remote create leaves that board
//! local-only, a failed child fetch skips that branch; both are collected
//! in `CopyOutcome::failures` and never abort siblings.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use futures::future::{BoxFuture, join_all};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::model::{Board, BoardId, CopyRecord, OwnerContext};
use crate::remote::RemoteError;
use crate::services::rewrite::{repair_references, rewrite_references};
use crate::services::sync::{BoardWrite, ensure_own_communicator, push_active_communicator, push_board};
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

/// Which step of a branch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStage {
    Fetch,
    Create,
    Update,
    Communicator,
}

#[derive(Debug)]
pub struct CopyFailure {
    pub board_id: BoardId,
    pub stage: CopyStage,
    pub error: RemoteError,
}

#[derive(Debug)]
pub struct CopyOutcome {
    pub new_root_id: BoardId,
    pub records: Vec<CopyRecord>,
    pub failures: Vec<CopyFailure>,
}

impl CopyOutcome {
    /// Copy id for an original board id.
    #[must_use]
    pub fn next_of(&self, prev: &str) -> Option<&str> {
        self.records
            .iter()
            .find(|r| r.prev == prev)
            .map(|r| r.next.as_str())
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

// =============================================================================
// COPY LOG
// =============================================================================

#[derive(Default)]
struct CopyLog {
    inner: Mutex<CopyLogInner>,
}

#[derive(Default)]
struct CopyLogInner {
    claimed: HashSet<BoardId>,
    records: Vec<CopyRecord>,
    remote_created: HashSet<BoardId>,
    rewritten: HashSet<BoardId>,
    failures: Vec<CopyFailure>,
}

impl CopyLog {
    fn lock(&self) -> std::sync::MutexGuard<'_, CopyLogInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Atomically claim an original id. `false` if it was claimed before or
    /// is a copy produced by this operation.
    fn claim(&self, id: &str) -> bool {
        let mut inner = self.lock();
        if inner.records.iter().any(|r| r.next == id) {
            return false;
        }
        inner.claimed.insert(id.to_string())
    }

    fn is_claimed(&self, id: &str) -> bool {
        self.lock().claimed.contains(id)
    }

    /// Append a record and return the log as it stands afterwards.
    fn append(&self, record: CopyRecord) -> Vec<CopyRecord> {
        let mut inner = self.lock();
        inner.records.push(record);
        inner.records.clone()
    }

    fn records(&self) -> Vec<CopyRecord> {
        self.lock().records.clone()
    }

    fn mark_remote(&self, id: &str) {
        self.lock().remote_created.insert(id.to_string());
    }

    fn mark_rewritten(&self, ids: Vec<BoardId>) {
        self.lock().rewritten.extend(ids);
    }

    /// Boards that exist remotely but were rewritten locally afterwards.
    fn stale_remote(&self) -> Vec<BoardId> {
        let inner = self.lock();
        inner
            .records
            .iter()
            .map(|r| &r.next)
            .filter(|id| inner.remote_created.contains(*id) && inner.rewritten.contains(*id))
            .cloned()
            .collect()
    }

    fn fail(&self, board_id: &str, stage: CopyStage, error: RemoteError) {
        self.lock().failures.push(CopyFailure { board_id: board_id.to_string(), stage, error });
    }

    fn into_parts(self) -> (Vec<CopyRecord>, Vec<CopyFailure>) {
        let inner = self.inner.into_inner().unwrap_or_else(PoisonError::into_inner);
        (inner.records, inner.failures)
    }
}

// =============================================================================
// ENTRY POINT
// =============================================================================

/// Deep-copy `root` and its owned subgraph for `owner`, then add the new
/// root to the active communicator. `None` root is a no-op.
///
/// Returns `None` only for a `None` root.
pub async fn copy_subgraph(state: &AppState, root: Option<&Board>, owner: &OwnerContext) -> Option<CopyOutcome> {
    let root = root?;
    let op_id = Uuid::new_v4();
    let span = info_span!("copy_subgraph", %op_id, root_id = %root.id);

    async move {
        let own = if owner.is_authenticated() { ensure_own_communicator(state, owner).await } else { None };

        let log = CopyLog::default();
        let new_root_id = copy_branch(state, root.clone(), owner, &log)
            .await
            .unwrap_or_else(|| root.id.clone());

        let records = log.records();
        log.mark_rewritten(repair_references(&state.store, &records).await);

        if owner.is_authenticated() {
            for board_id in log.stale_remote() {
                let Some(board) = state.store.get(&board_id).await else {
                    continue;
                };
                if let Err(e) = push_board(state, &board, BoardWrite::Update).await {
                    log.fail(&board_id, CopyStage::Update, e);
                }
            }
        }

        state
            .store
            .modify_active_communicator(|c| {
                c.add_board(&new_root_id);
            })
            .await;
        if owner.is_authenticated() {
            let created = own.is_some_and(|o| o.created);
            if let Err(e) = push_active_communicator(state, created).await {
                log.fail(&new_root_id, CopyStage::Communicator, e);
            }
        }

        let (records, failures) = log.into_parts();
        if failures.is_empty() {
            info!(copies = records.len(), %new_root_id, "subgraph copied");
        } else {
            warn!(copies = records.len(), failures = failures.len(), %new_root_id, "subgraph copied with failures");
        }
        Some(CopyOutcome { new_root_id, records, failures })
    }
    .instrument(span)
    .await
}

// =============================================================================
// RECURSION
// =============================================================================

fn copy_branch<'a>(
    state: &'a AppState,
    original: Board,
    owner: &'a OwnerContext,
    log: &'a CopyLog,
) -> BoxFuture<'a, Option<BoardId>> {
    Box::pin(async move {
        if !log.claim(&original.id) {
            debug!(board_id = %original.id, "already copied in this operation");
            return None;
        }

        let mut copy = build_copy(&original, state.ids.generate(), owner);
        state.store.insert(copy.clone()).await;

        if owner.is_authenticated() {
            match push_board(state, &copy, BoardWrite::Create).await {
                Ok(assigned) => {
                    copy.id = assigned;
                    log.mark_remote(&copy.id);
                }
                Err(e) => log.fail(&copy.id, CopyStage::Create, e),
            }
        }

        let records = log.append(CopyRecord { prev: original.id.clone(), next: copy.id.clone() });
        log.mark_rewritten(rewrite_references(&state.store, &original, &copy, &records).await);
        debug!(prev = %original.id, next = %copy.id, "board copied");

        let mut seen = HashSet::new();
        let children: Vec<BoardId> = original
            .owned_references()
            .filter(|id| seen.insert(*id))
            .map(str::to_owned)
            .collect();

        let branches = children.into_iter().map(|child_id| async move {
            if log.is_claimed(&child_id) {
                return;
            }
            let Some(child) = resolve_child(state, &child_id, log).await else {
                return;
            };
            copy_branch(state, child, owner, log).await;
        });
        join_all(branches).await;

        Some(copy.id)
    })
}

/// Local collection first, then remote; a remote 404 re-checks locally.
async fn resolve_child(state: &AppState, id: &str, log: &CopyLog) -> Option<Board> {
    if let Some(board) = state.store.get(id).await {
        return Some(board);
    }
    match state.remote.fetch_board(id).await {
        Ok(board) => Some(board),
        Err(e) if e.is_not_found() => {
            let local = state.store.get(id).await;
            if local.is_none() {
                debug!(board_id = %id, "referenced board missing locally and remotely; branch skipped");
            }
            local
        }
        Err(e) => {
            warn!(error = %e, board_id = %id, "referenced board fetch failed; branch skipped");
            log.fail(id, CopyStage::Fetch, e);
            None
        }
    }
}

/// The copy of `original` under `new_id`, owned by `owner` (blank when
/// anonymous), private, visible, and always carrying a display name.
#[must_use]
pub fn build_copy(original: &Board, new_id: BoardId, owner: &OwnerContext) -> Board {
    let mut copy = original.clone();
    copy.id = new_id;
    copy.name = original.display_name();
    copy.assign_owner(owner);
    copy
}

#[cfg(test)]
#[path = "copy_test.rs"]
mod tests;
