use super::*;
use crate::error::ErrorCode;
use crate::services::resolver::resolve_board_for_request;
use crate::state::test_helpers::{self, board_with_folders, other_user, owned_board, seed_boards, seed_communicator, user};

fn targets(board: &Board) -> Vec<String> {
    board.tiles.iter().filter_map(Tile::load_board).map(str::to_owned).collect()
}

async fn stored(state: &AppState, id: &str) -> Board {
    state.store.get(id).await.expect("board should be stored")
}

fn grid_board(id: &str, owner: &OwnerContext, tile_ids: &[&str]) -> Board {
    let tiles: Vec<Tile> = tile_ids.iter().map(|t| Tile::symbol(*t, *t)).collect();
    let mut board = owned_board(id, owner).with_tiles(tiles.clone());
    board.is_fixed = true;
    board.grid = Some(Grid { rows: 1, columns: 3, order: grid::default_order(&tiles, 1, 3) });
    board
}

// =========================================================================
// commit_edit
// =========================================================================

#[tokio::test]
async fn template_edit_copies_on_write() {
    let (state, remote) = test_helpers::test_app_state();
    seed_boards(
        &state,
        vec![
            Board::new("abc", "Animals").with_tiles(vec![Tile::symbol("dog", "dog")]),
            board_with_folders("root", &["abc"]),
            board_with_folders("user-board-00001", &["abc"]),
        ],
    )
    .await;
    seed_communicator(&state, "local", "abc", &["abc", "root"], &OwnerContext::Anonymous).await;
    state.store.set_active_board(Some("abc".into())).await;

    let outcome = rename_board(&state, "abc", "My animals", &OwnerContext::Anonymous).await.unwrap();

    assert_eq!(outcome.board_id, "generated-0001");
    assert_eq!(outcome.copied_from.as_deref(), Some("abc"));
    assert!(outcome.synced());
    assert_eq!(stored(&state, "abc").await.name, "Animals");
    let copy = stored(&state, "generated-0001").await;
    assert_eq!(copy.name, "My animals");
    assert_eq!(copy.tiles.len(), 1);

    let communicator = state.store.active_communicator().await.unwrap();
    assert_eq!(communicator.root_board, "generated-0001");
    assert_eq!(communicator.boards, vec!["generated-0001", "root"]);
    assert_eq!(targets(&stored(&state, "user-board-00001").await), vec!["generated-0001"]);
    assert_eq!(targets(&stored(&state, "root").await), vec!["abc"]);
    assert_eq!(state.store.active_board().await.as_deref(), Some("generated-0001"));
    assert!(remote.created_ids().is_empty());
}

#[tokio::test]
async fn owned_board_updates_in_place() {
    let (state, remote) = test_helpers::test_app_state();
    seed_boards(&state, vec![owned_board("my-board-000001", &user())]).await;
    seed_communicator(&state, "mine", "my-board-000001", &["my-board-000001"], &user()).await;

    let outcome = rename_board(&state, "my-board-000001", "Renamed", &user()).await.unwrap();

    assert_eq!(outcome.board_id, "my-board-000001");
    assert_eq!(outcome.copied_from, None);
    assert!(outcome.synced());
    assert_eq!(stored(&state, "my-board-000001").await.name, "Renamed");
    assert_eq!(remote.updated_ids(), vec!["my-board-000001"]);
    assert_eq!(remote.communicators_updated.lock().unwrap().len(), 1);
    assert_eq!(state.store.boards().await.len(), 1);
}

#[tokio::test]
async fn foreign_board_is_claimed_by_editor() {
    let (state, _remote) = test_helpers::test_app_state();
    let mut theirs = owned_board("their-board-0001", &other_user());
    theirs.name = String::new();
    theirs.name_key = Some("boards.school".into());
    theirs.is_public = true;
    seed_boards(&state, vec![theirs]).await;

    let outcome = toggle_fixed(&state, "their-board-0001", &user()).await.unwrap();

    assert_eq!(outcome.board_id, "their-board-0001");
    let board = stored(&state, "their-board-0001").await;
    assert_eq!(board.author, test_helpers::USER_NAME);
    assert_eq!(board.email, test_helpers::USER_EMAIL);
    assert_eq!(board.name, "school");
    assert!(!board.is_public);
}

#[tokio::test]
async fn authenticated_template_edit_creates_remote_copy() {
    let (state, remote) = test_helpers::test_app_state();
    remote.assign_ids("remote-board-");
    seed_boards(&state, vec![Board::new("abc", "Animals")]).await;
    seed_communicator(&state, "default", "abc", &["abc"], &OwnerContext::Anonymous).await;

    let outcome = rename_board(&state, "abc", "Mine", &user()).await.unwrap();

    assert_eq!(outcome.board_id, "remote-board-00000001");
    assert_eq!(outcome.copied_from.as_deref(), Some("abc"));
    let copy = stored(&state, "remote-board-00000001").await;
    assert_eq!(copy.email, test_helpers::USER_EMAIL);
    assert!(state.store.contains("abc").await);

    let communicator = state.store.active_communicator().await.unwrap();
    assert_eq!(communicator.id, "remote-board-00000002");
    assert_eq!(communicator.root_board, "remote-board-00000001");
    assert_eq!(communicator.email, test_helpers::USER_EMAIL);
    assert_eq!(remote.communicators_created.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_push_still_names_the_local_board() {
    let (state, remote) = test_helpers::test_app_state();
    remote.fail_writes();
    seed_boards(&state, vec![Board::new("abc", "Animals")]).await;

    let outcome = rename_board(&state, "abc", "Mine", &user()).await.unwrap();

    assert_eq!(outcome.board_id, "generated-0001");
    assert!(state.store.contains("generated-0001").await);
    assert!(!outcome.synced());
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].error_code(), "E_NETWORK");
}

#[tokio::test]
async fn failed_pushes_of_board_and_communicator_are_both_reported() {
    let (state, remote) = test_helpers::test_app_state();
    seed_boards(&state, vec![owned_board("my-board-000001", &user())]).await;
    seed_communicator(&state, "mine", "my-board-000001", &["my-board-000001"], &user()).await;
    remote.fail_writes();

    let outcome = rename_board(&state, "my-board-000001", "Renamed", &user()).await.unwrap();

    assert_eq!(outcome.board_id, "my-board-000001");
    assert_eq!(outcome.failures.len(), 2);
    assert!(outcome.failures.iter().all(|e| matches!(e, RemoteError::Network(_))));
    assert_eq!(stored(&state, "my-board-000001").await.name, "Renamed");
}

#[tokio::test]
async fn missing_board_is_an_error() {
    let (state, _remote) = test_helpers::test_app_state();
    let err = rename_board(&state, "nope", "x", &user()).await.unwrap_err();
    assert!(matches!(err, ControllerError::BoardNotFound(ref id) if id == "nope"));
    assert_eq!(err.error_code(), "E_BOARD_NOT_FOUND");
}

// =========================================================================
// grid edits
// =========================================================================

#[tokio::test]
async fn toggle_fixed_builds_default_grid() {
    let (state, _remote) = test_helpers::test_app_state();
    let board = owned_board("my-board-000001", &user())
        .with_tiles(vec![Tile::symbol("a", "a"), Tile::symbol("b", "b"), Tile::symbol("c", "c")]);
    seed_boards(&state, vec![board]).await;

    toggle_fixed(&state, "my-board-000001", &user()).await.unwrap();

    let board = stored(&state, "my-board-000001").await;
    assert!(board.is_fixed);
    let grid = board.grid.unwrap();
    assert_eq!((grid.rows, grid.columns), (grid::DEFAULT_ROWS, grid::DEFAULT_COLUMNS));
    assert_eq!(grid.order[0][..3], [Some("a".to_string()), Some("b".to_string()), Some("c".to_string())]);
    assert!(grid.is_consistent(&board.tiles));
}

#[tokio::test]
async fn rows_and_columns_respect_bounds() {
    let (state, _remote) = test_helpers::test_app_state();
    seed_boards(&state, vec![grid_board("my-board-000001", &user(), &["a", "b"])]).await;

    let err = remove_row(&state, "my-board-000001", &user()).await.unwrap_err();
    assert!(matches!(err, ControllerError::GridBounds(_)));

    add_column(&state, "my-board-000001", &user()).await.unwrap();
    add_row(&state, "my-board-000001", &user()).await.unwrap();
    remove_column(&state, "my-board-000001", &user()).await.unwrap();

    let board = stored(&state, "my-board-000001").await;
    let grid = board.grid.clone().unwrap();
    assert_eq!((grid.rows, grid.columns), (2, 3));
    assert!(grid.is_consistent(&board.tiles));
}

#[tokio::test]
async fn move_tile_swaps_cells() {
    let (state, _remote) = test_helpers::test_app_state();
    seed_boards(&state, vec![grid_board("my-board-000001", &user(), &["a", "b"])]).await;

    move_tile(&state, "my-board-000001", "a", (0, 1), &user()).await.unwrap();

    let grid = stored(&state, "my-board-000001").await.grid.unwrap();
    assert_eq!(grid.order[0], vec![Some("b".to_string()), Some("a".to_string()), None]);

    let err = move_tile(&state, "my-board-000001", "ghost", (0, 0), &user()).await.unwrap_err();
    assert!(matches!(err, ControllerError::TileNotFound(_)));
}

#[tokio::test]
async fn move_tile_needs_a_grid() {
    let (state, _remote) = test_helpers::test_app_state();
    seed_boards(&state, vec![owned_board("my-board-000001", &user()).with_tiles(vec![Tile::symbol("a", "a")])]).await;

    let err = move_tile(&state, "my-board-000001", "a", (0, 0), &user()).await.unwrap_err();
    assert!(matches!(err, ControllerError::NoGrid(_)));
    assert_eq!(err.error_code(), "E_NO_GRID");
}

// =========================================================================
// tile edits
// =========================================================================

#[tokio::test]
async fn reorder_tiles_moves_named_tiles_first() {
    let (state, remote) = test_helpers::test_app_state();
    let board = owned_board("my-board-000001", &user())
        .with_tiles(vec![Tile::symbol("a", "a"), Tile::symbol("b", "b"), Tile::symbol("c", "c")]);
    seed_boards(&state, vec![board]).await;

    reorder_tiles(&state, "my-board-000001", &["a".into(), "b".into()], &user()).await.unwrap();
    assert!(remote.updated_ids().is_empty());

    reorder_tiles(&state, "my-board-000001", &["c".into(), "zzz".into(), "a".into()], &user()).await.unwrap();
    let ids: Vec<String> = stored(&state, "my-board-000001").await.tiles.into_iter().map(|t| t.id).collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
    assert_eq!(remote.updated_ids().len(), 1);
}

#[tokio::test]
async fn publish_toggles_through_commit() {
    let (state, _remote) = test_helpers::test_app_state();
    seed_boards(&state, vec![owned_board("my-board-000001", &user())]).await;

    publish(&state, "my-board-000001", &user()).await.unwrap();
    assert!(stored(&state, "my-board-000001").await.is_public);
    publish(&state, "my-board-000001", &user()).await.unwrap();
    assert!(!stored(&state, "my-board-000001").await.is_public);
}

#[tokio::test]
async fn folder_tile_creates_child_board() {
    let (state, _remote) = test_helpers::test_app_state();
    seed_boards(&state, vec![grid_board("user-board-00001", &OwnerContext::Anonymous, &["a"])]).await;
    seed_communicator(&state, "local", "user-board-00001", &["user-board-00001"], &OwnerContext::Anonymous).await;

    let mut tile = Tile::folder("snack-tile", "Snacks", "snack-board-0001");
    tile.label_key = Some("symbols.snacks".into());
    add_tile(&state, "user-board-00001", tile, &OwnerContext::Anonymous).await.unwrap();

    let child = stored(&state, "snack-board-0001").await;
    assert_eq!(child.name, "Snacks");
    assert_eq!(child.name_key.as_deref(), Some("symbols.snacks"));
    assert!(child.tiles.is_empty());

    let parent = stored(&state, "user-board-00001").await;
    assert_eq!(targets(&parent), vec!["snack-board-0001"]);
    assert_eq!(parent.grid.unwrap().order[0][1].as_deref(), Some("snack-tile"));
    let communicator = state.store.active_communicator().await.unwrap();
    assert_eq!(communicator.boards, vec!["user-board-00001", "snack-board-0001"]);
}

#[tokio::test]
async fn folder_tile_follows_remote_child_id() {
    let (state, remote) = test_helpers::test_app_state();
    remote.assign_ids("remote-board-");
    seed_boards(&state, vec![owned_board("my-board-000001", &user())]).await;
    seed_communicator(&state, "mine", "my-board-000001", &["my-board-000001"], &user()).await;

    add_tile(&state, "my-board-000001", Tile::folder("t", "Snacks", "snack-board-0001"), &user()).await.unwrap();

    let parent = stored(&state, "my-board-000001").await;
    assert_eq!(targets(&parent), vec!["remote-board-00000001"]);
    let child = stored(&state, "remote-board-00000001").await;
    assert_eq!(child.email, test_helpers::USER_EMAIL);
    assert!(!state.store.contains("snack-board-0001").await);
}

#[tokio::test]
async fn folder_tile_reports_failed_child_create() {
    let (state, remote) = test_helpers::test_app_state();
    remote.fail_writes();
    seed_boards(&state, vec![owned_board("my-board-000001", &user())]).await;
    seed_communicator(&state, "mine", "my-board-000001", &["my-board-000001"], &user()).await;

    let outcome = add_tile(&state, "my-board-000001", Tile::folder("t", "Snacks", "snack-board-0001"), &user())
        .await
        .unwrap();

    assert_eq!(outcome.failures.len(), 3);
    assert_eq!(targets(&stored(&state, "my-board-000001").await), vec!["snack-board-0001"]);
    assert!(state.store.contains("snack-board-0001").await);
}

#[tokio::test]
async fn edit_and_delete_tiles() {
    let (state, _remote) = test_helpers::test_app_state();
    seed_boards(&state, vec![grid_board("my-board-000001", &user(), &["a", "b"])]).await;

    let mut edited = Tile::symbol("a", "apple");
    edited.vocalization = Some("an apple".into());
    edit_tiles(&state, "my-board-000001", vec![edited], &user()).await.unwrap();
    assert_eq!(stored(&state, "my-board-000001").await.tiles[0].label, "apple");

    let err = edit_tiles(&state, "my-board-000001", vec![Tile::symbol("ghost", "x")], &user()).await.unwrap_err();
    assert!(matches!(err, ControllerError::TileNotFound(_)));

    delete_tiles(&state, "my-board-000001", &["a".into()], &user()).await.unwrap();
    let board = stored(&state, "my-board-000001").await;
    assert_eq!(board.tiles.len(), 1);
    assert_eq!(board.grid.clone().unwrap().order[0], vec![None, Some("b".to_string()), None]);
    assert!(board.grid.unwrap().is_consistent(&board.tiles));
}

// =========================================================================
// copy / paste
// =========================================================================

#[tokio::test]
async fn paste_deep_copies_folder_tiles() {
    let (state, _remote) = test_helpers::test_app_state();
    let source = owned_board("source-board-01", &OwnerContext::Anonymous)
        .with_tiles(vec![Tile::symbol("hi", "hello"), Tile::folder("f", "Food", "food-board-0001")]);
    seed_boards(
        &state,
        vec![source, board_with_folders("food-board-0001", &[]), owned_board("target-board-01", &OwnerContext::Anonymous)],
    )
    .await;

    let clipboard = copy_tiles(&state, "source-board-01", &["hi".into(), "f".into(), "missing".into()]).await.unwrap();
    assert_eq!(clipboard.tiles.len(), 2);

    let outcome = paste_tiles(&state, "target-board-01", &clipboard, &OwnerContext::Anonymous).await.unwrap();

    assert_eq!(outcome.pasted.len(), 2);
    assert_eq!(outcome.copies.len(), 1);
    let food_copy = outcome.copies[0].new_root_id.clone();
    assert_ne!(food_copy, "food-board-0001");

    let target = stored(&state, "target-board-01").await;
    assert_eq!(target.tiles.len(), 2);
    assert!(target.tiles.iter().all(|t| t.id != "hi" && t.id != "f"));
    assert_eq!(targets(&target), vec![food_copy]);
    assert_eq!(target.tiles[0].label, "hello");
    assert_eq!(targets(&stored(&state, "source-board-01").await), vec!["food-board-0001"]);
}

#[tokio::test]
async fn paste_into_source_board_does_nothing() {
    let (state, _remote) = test_helpers::test_app_state();
    seed_boards(&state, vec![owned_board("source-board-01", &user()).with_tiles(vec![Tile::symbol("a", "a")])]).await;

    let clipboard = copy_tiles(&state, "source-board-01", &["a".into()]).await.unwrap();
    let outcome = paste_tiles(&state, "source-board-01", &clipboard, &user()).await.unwrap();

    assert!(outcome.edit.is_none());
    assert_eq!(stored(&state, "source-board-01").await.tiles.len(), 1);
}

#[tokio::test]
async fn paste_skips_folder_tiles_without_local_board() {
    let (state, _remote) = test_helpers::test_app_state();
    seed_boards(&state, vec![owned_board("target-board-01", &OwnerContext::Anonymous)]).await;
    let clipboard = TileClipboard {
        source_board: "elsewhere".into(),
        tiles: vec![Tile::folder("f", "Gone", "gone-board-0001")],
    };

    let outcome = paste_tiles(&state, "target-board-01", &clipboard, &OwnerContext::Anonymous).await.unwrap();

    assert_eq!(outcome.skipped, vec!["f"]);
    assert!(outcome.edit.is_none());
    assert!(stored(&state, "target-board-01").await.tiles.is_empty());
}

#[tokio::test]
async fn copy_public_board_activates_the_copy() {
    let (state, _remote) = test_helpers::test_app_state();
    let mut theirs = owned_board("their-board-0001", &other_user());
    theirs.is_public = true;

    let outcome = copy_public_board(&state, &theirs, &user()).await.unwrap();

    assert_eq!(state.store.active_board().await, Some(outcome.new_root_id.clone()));
    assert_eq!(stored(&state, &outcome.new_root_id).await.email, test_helpers::USER_EMAIL);
}

#[tokio::test]
async fn copy_prompt_accepted_by_id_for_remote_only_board() {
    let (state, remote) = test_helpers::test_app_state();
    let mut theirs = owned_board("their-board-0001", &other_user());
    theirs.is_public = true;
    remote.put_board(theirs);

    let resolution = resolve_board_for_request(&state, Some("their-board-0001"), &user()).await;
    let prompt_id = resolution.prompt_copy.map(|b| b.id).unwrap();
    assert!(!state.store.contains(&prompt_id).await);

    let outcome = copy_board_by_id(&state, &prompt_id, &user()).await.unwrap();

    assert_ne!(outcome.new_root_id, "their-board-0001");
    assert_eq!(state.store.active_board().await, Some(outcome.new_root_id.clone()));
    let copy = stored(&state, &outcome.new_root_id).await;
    assert_eq!(copy.email, test_helpers::USER_EMAIL);
    assert!(!state.store.contains("their-board-0001").await);
}

#[tokio::test]
async fn copy_by_id_rejects_private_and_missing_boards() {
    let (state, remote) = test_helpers::test_app_state();
    remote.put_board(owned_board("their-board-0001", &other_user()));
    remote.cut_network_for("offline-board-01");

    let err = copy_board_by_id(&state, "their-board-0001", &user()).await.unwrap_err();
    assert_eq!(err.error_code(), "E_BOARD_BLOCKED");

    let err = copy_board_by_id(&state, "nowhere-board-01", &user()).await.unwrap_err();
    assert!(matches!(err, ControllerError::BoardNotFound(ref id) if id == "nowhere-board-01"));

    let err = copy_board_by_id(&state, "offline-board-01", &user()).await.unwrap_err();
    assert_eq!(err.error_code(), "E_NETWORK");
    assert!(err.retryable());
    assert!(state.store.boards().await.is_empty());
}
