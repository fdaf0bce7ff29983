//! Error types for parsing and elaboration

use thiserror::Error;

/// Result type for frontend operations
pub type Result<T> = std::result::Result<T, FrontendError>;

/// Errors that can occur while loading, parsing, or elaborating sources
#[derive(Debug, Error)]
pub enum FrontendError {
    /// I/O error reading a source file
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed syntax the parser cannot recover from
    #[error("{path}:{line}: parse error: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },

    /// Two files define a module with the same name
    #[error("duplicate definition of module '{name}' (in '{first}' and '{second}')")]
    DuplicateModule {
        name: String,
        first: String,
        second: String,
    },
}

/// 1-based line number of a byte offset, for diagnostics
pub fn line_of(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text[..end].bytes().filter(|&b| b == b'\n').count() + 1
}
