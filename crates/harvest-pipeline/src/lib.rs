//! # harvest-pipeline
//!
//! The three batch stages of harvest, each resumable from its ledger:
//!
//! - [`crawl`]: search the repository host and classify every hit
//! - [`install`]: clone qualifying repositories and install dependencies
//! - [`stage`]: run `compile`, `migrate`, or `test` across all projects
//!
//! Supporting modules handle build-config patching ([`truffle_config`]),
//! compiler version discovery ([`solc`]), on-disk layout ([`layout`]),
//! child processes ([`process`]), and host-call pacing ([`retry`]).

mod error;

pub mod crawl;
pub mod install;
pub mod layout;
pub mod process;
pub mod retry;
pub mod solc;
pub mod stage;
pub mod truffle_config;

pub use crawl::{CrawlOptions, CrawlSummary, Crawler};
pub use error::PipelineError;
pub use install::{InstallSummary, Installer};
pub use retry::FixedBackoff;
pub use stage::{StageOptions, StageRunner, StageSummary};
