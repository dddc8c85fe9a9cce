//! # harvest-parser
//!
//! Solidity pragma-directive parsing.
//!
//! [`parse_pragmas`] scans a source file for `pragma <name> <value>;`
//! directives, skipping comments and string literals. [`PragmaCache`] memoizes
//! the result per file path.

mod cache;
mod error;
mod pragma;

pub use cache::PragmaCache;
pub use error::ParserError;
pub use pragma::{PragmaDirective, parse_pragmas};

/// Values of every `pragma solidity` directive, in source order.
///
/// Flattened contracts repeat the directive once per inlined file.
pub fn solidity_requirements(directives: &[PragmaDirective]) -> impl Iterator<Item = &str> {
    directives
        .iter()
        .filter(|d| d.name == "solidity")
        .map(|d| d.value.as_str())
}
