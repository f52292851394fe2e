//! Board graph sync and copy engine for AAC communication boards.
//!
//! Boards form a directed graph through folder tiles. This crate resolves
//! which board to show, deep-copies board subgraphs with cycle handling and
//! reference rewriting, enforces copy-on-write for template boards, and
//! keeps a local store in sync with a remote board API.

pub mod config;
pub mod error;
pub mod grid;
pub mod ids;
pub mod model;
pub mod remote;
pub mod services;
pub mod state;
pub mod store;
