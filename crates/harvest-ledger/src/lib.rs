//! # harvest-ledger
//!
//! On-disk state for the crawl and build stages.
//!
//! Two documents, both JSON objects keyed by record identity:
//! - the repository ledger (`owner/name` → [`RepositoryRecord`]), pretty-printed
//! - the project ledger (`owner/name/<config path>` → [`ProjectRecord`]), compact
//!
//! Every unit of work ends with a [`JsonLedger::save`], which makes a killed
//! run resumable from the last completed unit. Two processes writing the same
//! document concurrently are not supported.

mod error;
mod ledger;

pub use error::LedgerError;
pub use ledger::{JsonLedger, Layout};

use std::path::PathBuf;

use harvest_core::entities::{ProjectRecord, RepositoryRecord};

pub type RepositoryLedger = JsonLedger<RepositoryRecord>;
pub type ProjectLedger = JsonLedger<ProjectRecord>;

/// Open (or start) the repository ledger.
///
/// # Errors
///
/// See [`JsonLedger::open`].
pub fn open_repositories(path: impl Into<PathBuf>) -> Result<RepositoryLedger, LedgerError> {
    JsonLedger::open(path, Layout::Pretty)
}

/// Open (or start) the project ledger.
///
/// # Errors
///
/// See [`JsonLedger::open`].
pub fn open_projects(path: impl Into<PathBuf>) -> Result<ProjectLedger, LedgerError> {
    JsonLedger::open(path, Layout::Compact)
}

/// Repositories with both a test directory and a build config, in ledger order.
#[must_use]
pub fn qualifying(ledger: &RepositoryLedger) -> Vec<&RepositoryRecord> {
    ledger
        .values()
        .filter(|record| record.is_truffled_testable())
        .collect()
}
