//! Board graph services.
//!
//! ARCHITECTURE
//! ============
//! Services are free async functions over `&AppState`. They own the
//! ownership rules, the copy engine and remote sync so a UI or CLI layer
//! only translates user intent into calls.

pub mod communicator;
pub mod controller;
pub mod copy;
pub mod navigation;
pub mod resolver;
pub mod rewrite;
pub mod sync;
