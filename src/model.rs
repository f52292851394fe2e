//! Board graph data model.
//!
//! DESIGN
//! ======
//! Boards hold an ordered list of tiles and an optional fixed grid. A tile
//! that points at another board is either an owned sub-board (`Folder`,
//! copied together with its parent) or a `Link` (never copied). The wire
//! shape follows the remote API: camelCase keys, a flat tile object with a
//! `type` tag and `loadBoard`/`linkedBoard` fields. Tiles convert through
//! `TileWire` so the rest of the crate only sees the tagged `TileKind`.

use serde::{Deserialize, Deserializer, Serialize};

use crate::grid::Grid;

pub type BoardId = String;
pub type TileId = String;

/// Ids shorter than this belong to system/template boards that must be
/// copied before a user can own them.
pub const MIN_USER_BOARD_ID_LEN: usize = 14;

pub const UNTITLED_BOARD_NAME: &str = "Untitled board";

#[must_use]
pub fn is_default_board_id(id: &str) -> bool {
    id.len() < MIN_USER_BOARD_ID_LEN
}

/// Last `.`-separated segment of a translation key.
#[must_use]
pub fn name_from_key(name_key: &str) -> Option<&str> {
    name_key.rsplit('.').next().filter(|s| !s.is_empty())
}

// =============================================================================
// OWNER CONTEXT
// =============================================================================

/// Identity of the acting user. Anonymous users only ever persist locally.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OwnerContext {
    #[default]
    Anonymous,
    Authenticated { name: String, email: String },
}

impl OwnerContext {
    #[must_use]
    pub fn authenticated(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self::Authenticated { name: name.into(), email: email.into() }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Anonymous => "",
            Self::Authenticated { name, .. } => name,
        }
    }

    #[must_use]
    pub fn email(&self) -> &str {
        match self {
            Self::Anonymous => "",
            Self::Authenticated { email, .. } => email,
        }
    }
}

// =============================================================================
// TILE
// =============================================================================

/// What a tile does when activated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileKind {
    /// Speaks or appends to the output bar.
    Symbol,
    /// Opens an owned sub-board; copied with its parent.
    Folder { load_board: BoardId },
    /// Opens a board owned elsewhere; never copied.
    Link { load_board: BoardId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TileWire", into = "TileWire")]
pub struct Tile {
    pub id: TileId,
    pub label: String,
    pub label_key: Option<String>,
    pub image: Option<String>,
    pub sound: Option<String>,
    pub vocalization: Option<String>,
    pub action: Option<String>,
    pub background_color: Option<String>,
    pub kind: TileKind,
}

impl Tile {
    #[must_use]
    pub fn symbol(id: impl Into<TileId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            label_key: None,
            image: None,
            sound: None,
            vocalization: None,
            action: None,
            background_color: None,
            kind: TileKind::Symbol,
        }
    }

    #[must_use]
    pub fn folder(id: impl Into<TileId>, label: impl Into<String>, load_board: impl Into<BoardId>) -> Self {
        Self { kind: TileKind::Folder { load_board: load_board.into() }, ..Self::symbol(id, label) }
    }

    #[must_use]
    pub fn link(id: impl Into<TileId>, label: impl Into<String>, load_board: impl Into<BoardId>) -> Self {
        Self { kind: TileKind::Link { load_board: load_board.into() }, ..Self::symbol(id, label) }
    }

    #[must_use]
    pub fn load_board(&self) -> Option<&str> {
        match &self.kind {
            TileKind::Symbol => None,
            TileKind::Folder { load_board } | TileKind::Link { load_board } => Some(load_board),
        }
    }

    /// Target of an owned (non-linked) board reference.
    #[must_use]
    pub fn owned_board(&self) -> Option<&str> {
        match &self.kind {
            TileKind::Folder { load_board } => Some(load_board),
            _ => None,
        }
    }

    /// Repoint a board reference. Symbol tiles are left alone.
    pub fn set_load_board(&mut self, target: impl Into<BoardId>) {
        match &mut self.kind {
            TileKind::Symbol => {}
            TileKind::Folder { load_board } | TileKind::Link { load_board } => *load_board = target.into(),
        }
    }

    /// Text to speak on activation. `+` actions suppress speech.
    #[must_use]
    pub fn speech(&self) -> Option<&str> {
        if self.action.as_deref().is_some_and(|a| a.starts_with('+')) {
            return None;
        }
        self.vocalization
            .as_deref()
            .filter(|v| !v.is_empty())
            .or(Some(self.label.as_str()))
            .filter(|s| !s.is_empty())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TileWire {
    id: TileId,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default)]
    label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    load_board: Option<BoardId>,
    #[serde(default)]
    linked_board: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sound: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vocalization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    background_color: Option<String>,
}

impl From<TileWire> for Tile {
    fn from(wire: TileWire) -> Self {
        let kind = match wire.load_board.filter(|id| !id.is_empty()) {
            None => TileKind::Symbol,
            Some(load_board) if wire.linked_board => TileKind::Link { load_board },
            Some(load_board) => TileKind::Folder { load_board },
        };
        Self {
            id: wire.id,
            label: wire.label,
            label_key: wire.label_key,
            image: wire.image,
            sound: wire.sound,
            vocalization: wire.vocalization,
            action: wire.action,
            background_color: wire.background_color,
            kind,
        }
    }
}

impl From<Tile> for TileWire {
    fn from(tile: Tile) -> Self {
        let (kind, load_board, linked_board) = match tile.kind {
            TileKind::Symbol => ("tile", None, false),
            TileKind::Folder { load_board } => ("folder", Some(load_board), false),
            TileKind::Link { load_board } => ("folder", Some(load_board), true),
        };
        Self {
            id: tile.id,
            kind: Some(kind.to_string()),
            label: tile.label,
            label_key: tile.label_key,
            load_board,
            linked_board,
            image: tile.image,
            sound: tile.sound,
            vocalization: tile.vocalization,
            action: tile.action,
            background_color: tile.background_color,
        }
    }
}

// =============================================================================
// BOARD
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: BoardId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_key: Option<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub is_fixed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<Grid>,
    #[serde(default, deserialize_with = "skip_null_tiles")]
    pub tiles: Vec<Tile>,
}

// Stored boards occasionally carry `null` holes in their tile list.
fn skip_null_tiles<'de, D>(deserializer: D) -> Result<Vec<Tile>, D::Error>
where
    D: Deserializer<'de>,
{
    let tiles = Vec::<Option<Tile>>::deserialize(deserializer)?;
    Ok(tiles.into_iter().flatten().collect())
}

impl Board {
    #[must_use]
    pub fn new(id: impl Into<BoardId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            name_key: None,
            author: String::new(),
            email: String::new(),
            is_public: false,
            hidden: false,
            is_fixed: false,
            grid: None,
            tiles: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_tiles(mut self, tiles: Vec<Tile>) -> Self {
        self.tiles = tiles;
        self
    }

    /// System/template board that must be copied before it can be owned.
    #[must_use]
    pub fn is_default(&self) -> bool {
        is_default_board_id(&self.id)
    }

    /// Owned for mutation purposes: same email as the acting user.
    #[must_use]
    pub fn is_owned_by(&self, owner: &OwnerContext) -> bool {
        match owner {
            OwnerContext::Anonymous => false,
            OwnerContext::Authenticated { email, .. } => self.email == *email,
        }
    }

    /// Authored by the acting user: both email and author name match.
    #[must_use]
    pub fn is_authored_by(&self, owner: &OwnerContext) -> bool {
        match owner {
            OwnerContext::Anonymous => false,
            OwnerContext::Authenticated { name, email } => self.email == *email && self.author == *name,
        }
    }

    /// Name to show, falling back to the name key and then a placeholder.
    #[must_use]
    pub fn display_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        self.name_key
            .as_deref()
            .and_then(name_from_key)
            .unwrap_or(UNTITLED_BOARD_NAME)
            .to_string()
    }

    /// Owned sub-board ids in tile order, duplicates included.
    pub fn owned_references(&self) -> impl Iterator<Item = &str> {
        self.tiles.iter().filter_map(Tile::owned_board)
    }

    #[must_use]
    pub fn references(&self, board_id: &str) -> bool {
        self.tiles.iter().any(|t| t.load_board() == Some(board_id))
    }

    /// Take ownership fields from `owner`, clearing publication.
    pub fn assign_owner(&mut self, owner: &OwnerContext) {
        self.author = owner.name().to_string();
        self.email = owner.email().to_string();
        self.is_public = false;
        self.hidden = false;
    }
}

// =============================================================================
// COMMUNICATOR
// =============================================================================

/// A user's set of boards with a designated root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Communicator {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub boards: Vec<BoardId>,
    pub root_board: BoardId,
}

impl Communicator {
    #[must_use]
    pub fn is_owned_by(&self, owner: &OwnerContext) -> bool {
        match owner {
            OwnerContext::Anonymous => false,
            OwnerContext::Authenticated { email, .. } => self.email == *email,
        }
    }

    /// Append unless already present.
    pub fn add_board(&mut self, board_id: &str) -> bool {
        if self.boards.iter().any(|b| b == board_id) {
            return false;
        }
        self.boards.push(board_id.to_string());
        true
    }

    pub fn remove_board(&mut self, board_id: &str) -> bool {
        let before = self.boards.len();
        self.boards.retain(|b| b != board_id);
        self.boards.len() != before
    }

    /// Swap every occurrence of `old` (list and root) for `new`.
    pub fn rename_board(&mut self, old: &str, new: &str) -> bool {
        let mut changed = false;
        for id in &mut self.boards {
            if id == old {
                *id = new.to_string();
                changed = true;
            }
        }
        if self.root_board == old {
            self.root_board = new.to_string();
            changed = true;
        }
        changed
    }
}

// =============================================================================
// COPY RECORD
// =============================================================================

/// One original → copy id mapping produced during a deep copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CopyRecord {
    pub prev: BoardId,
    pub next: BoardId,
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
