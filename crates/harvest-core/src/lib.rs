//! # harvest-core
//!
//! Core types shared by every harvest crate:
//! - Ledger record structs (repositories discovered by the crawl, buildable
//!   Truffle projects found inside them)
//! - Pipeline stage enum with precondition wiring
//! - Test-run outcome classification from captured build-tool output
//! - Cross-cutting error types

pub mod entities;
pub mod enums;
pub mod errors;
pub mod outcome;

pub use errors::CoreError;
