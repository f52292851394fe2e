//! Reference rewrite — repoint tiles at freshly copied boards.
//!
//! DESIGN
//! ======
//! After board X is copied to X′, tiles that still load X must load X′, but
//! only inside boards created by the same copy operation (the `next` side
//! of its records). Boards outside the operation keep their references, so
//! a copy never rewires the user's unrelated boards or the source graph.
//!
//! Each board is rewritten through `BoardStore::modify`, which clones the
//! stored board before mutating it and re-evaluates against the latest
//! stored version, so concurrent copy branches cannot lose each other's
//! edits. Both entry points are idempotent.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::model::{Board, BoardId, CopyRecord};
use crate::store::BoardStore;

/// Repoint every tile loading `original` at `replacement`, within the
/// boards named as `next` in `records`. Returns the ids of changed boards.
pub async fn rewrite_references(
    store: &BoardStore,
    original: &Board,
    replacement: &Board,
    records: &[CopyRecord],
) -> Vec<BoardId> {
    if original.id == replacement.id {
        return Vec::new();
    }
    let mapping = HashMap::from([(original.id.as_str(), replacement.id.as_str())]);
    apply_mapping(store, &mapping, records).await
}

/// Repoint every reference to any `prev` id at its `next` id, within the
/// boards of the operation. Used once all branches of a copy have joined.
pub async fn repair_references(store: &BoardStore, records: &[CopyRecord]) -> Vec<BoardId> {
    let mapping: HashMap<&str, &str> = records
        .iter()
        .filter(|r| r.prev != r.next)
        .map(|r| (r.prev.as_str(), r.next.as_str()))
        .collect();
    if mapping.is_empty() {
        return Vec::new();
    }
    apply_mapping(store, &mapping, records).await
}

async fn apply_mapping(store: &BoardStore, mapping: &HashMap<&str, &str>, records: &[CopyRecord]) -> Vec<BoardId> {
    let scope: HashSet<&str> = records.iter().map(|r| r.next.as_str()).collect();
    let candidates: Vec<BoardId> = store
        .boards()
        .await
        .into_iter()
        .filter(|b| scope.contains(b.id.as_str()) && needs_rewrite(b, mapping))
        .map(|b| b.id)
        .collect();

    let mut changed = Vec::new();
    for board_id in candidates {
        let mut touched = false;
        store
            .modify(&board_id, |board| touched = rewrite_tiles(board, mapping))
            .await;
        if touched {
            debug!(%board_id, "rewrote board references");
            changed.push(board_id);
        }
    }
    changed
}

fn needs_rewrite(board: &Board, mapping: &HashMap<&str, &str>) -> bool {
    board
        .tiles
        .iter()
        .filter_map(|t| t.load_board())
        .any(|target| mapping.contains_key(target))
}

fn rewrite_tiles(board: &mut Board, mapping: &HashMap<&str, &str>) -> bool {
    let mut touched = false;
    for tile in &mut board.tiles {
        let Some(next) = tile.load_board().and_then(|target| mapping.get(target)).copied() else {
            continue;
        };
        tile.set_load_board(next);
        touched = true;
    }
    touched
}

#[cfg(test)]
#[path = "rewrite_test.rs"]
mod tests;
