//! Ingestion cursor. Tracks how far the engine has ingested.

use serde::{Deserialize, Serialize};

/// The engine's position in the chain.
///
/// The cursor only moves forward: [`Cursor::advance`] ignores any height
/// below the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Highest block height fully ingested so far.
    pub block_number: u64,
}

impl Cursor {
    /// Create a cursor at the height observed at startup.
    pub fn new(block_number: u64) -> Self {
        Self { block_number }
    }

    /// Move the cursor to `block_number` if that is not a step backwards.
    ///
    /// Returns `true` if the position changed.
    pub fn advance(&mut self, block_number: u64) -> bool {
        if block_number > self.block_number {
            self.block_number = block_number;
            true
        } else {
            false
        }
    }

    /// Returns `true` if `height` is behind the cursor (a regressed head).
    pub fn is_behind(&self, height: u64) -> bool {
        height < self.block_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_advance() {
        let mut cursor = Cursor::new(100);
        assert!(cursor.advance(101));
        assert_eq!(cursor.block_number, 101);
    }

    #[test]
    fn cursor_never_moves_backwards() {
        let mut cursor = Cursor::new(100);
        assert!(!cursor.advance(99));
        assert!(!cursor.advance(100));
        assert_eq!(cursor.block_number, 100);
        assert!(cursor.is_behind(99));
        assert!(!cursor.is_behind(100));
    }
}
