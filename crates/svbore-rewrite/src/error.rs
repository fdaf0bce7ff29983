//! Rewriter error types

use thiserror::Error;

/// Result type for rewriting operations
pub type Result<T> = std::result::Result<T, RewriteError>;

/// Errors raised while producing rewritten text. A failing file is reported
/// and emitted empty; other files still go through.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// Two edits claimed overlapping byte ranges; a planner bug
    #[error("overlapping edits at bytes {start}..{end}")]
    OverlappingEdits { start: usize, end: usize },

    /// A synthesized replacement did not form a valid expression
    #[error("replacement '{text}' in module '{module}' is not a valid expression")]
    InvalidReplacement { module: String, text: String },

    /// I/O failure while writing outputs or backups
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
