//! Identifier generation for new boards, tiles and communicators.
//!
//! Generated ids are `MIN_USER_BOARD_ID_LEN` characters long so a freshly
//! minted board is never mistaken for a system/template board.

use rand::Rng;

use crate::model::MIN_USER_BOARD_ID_LEN;

const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Source of fresh ids. Implementations must be safe to share across tasks.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random url-safe ids.
#[derive(Debug, Clone, Copy)]
pub struct ShortIdGenerator {
    len: usize,
}

impl ShortIdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self { len: MIN_USER_BOARD_ID_LEN }
    }
}

impl Default for ShortIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for ShortIdGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::rng();
        (0..self.len)
            .map(|_| {
                let idx = rng.random_range(0..ID_ALPHABET.len());
                ID_ALPHABET[idx] as char
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "ids_test.rs"]
mod tests;
