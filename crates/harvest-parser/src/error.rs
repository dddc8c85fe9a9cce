//! Parser error types for harvest-parser.

use std::path::PathBuf;

/// Errors that can occur while scanning a Solidity source file.
#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("Unterminated block comment starting on line {line}")]
    UnterminatedComment { line: usize },

    #[error("Unterminated string literal starting on line {line}")]
    UnterminatedString { line: usize },

    #[error("Pragma on line {line} has no terminating ';'")]
    UnterminatedPragma { line: usize },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
