//! Ledger record structs.
//!
//! Both record kinds are stored in insertion-ordered JSON documents owned by
//! `harvest-ledger`. All structs derive `Serialize` and `Deserialize`.

mod project;
mod repository;

pub use project::{InstallRun, ProjectRecord, StageRun};
pub use repository::{RepoOwner, RepoSnapshot, RepositoryRecord, TreeEntry};
