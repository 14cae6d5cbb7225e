//! Shared highlight state.
//!
//! The foreground writes per-object highlight bytes; background decodes read
//! them while building geometry. One [`HighlightMutex`] guards the table and
//! every node build holds it from start to finish.

pub mod mutex;
pub mod table;

pub use mutex::HighlightMutex;
pub use table::{HighlightGuard, HighlightTable, FILTERED, NO_HIGHLIGHT};
