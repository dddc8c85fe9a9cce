//! Classification of recorded stage runs.
//!
//! Compile and migrate succeed on a clean zero exit. The test stage is judged
//! on its output instead: the build tool exits nonzero whenever any case
//! fails, but a run that printed a mocha summary still counts as executed.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::entities::ProjectRecord;
use crate::enums::{Stage, ZeroTestsPolicy};

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("ANSI escape regex must compile")
});

static PASSING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+) passing \(\d+\w*\)").expect("passing summary regex must compile")
});

static FAILING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) failing").expect("failing summary regex must compile"));

/// Outcome of a test-stage run, derived from its stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestOutcome {
    /// A test summary was printed.
    Executed { passing: u32, failing: u32 },
    /// No usable summary was found.
    NotExecuted,
}

impl TestOutcome {
    #[must_use]
    pub const fn is_executed(self) -> bool {
        matches!(self, Self::Executed { .. })
    }
}

/// Remove terminal color and cursor sequences.
#[must_use]
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

/// Classify the stdout chunks of a test run.
///
/// Chunks are joined with a single space, so a summary split across two
/// chunks still matches as long as the split falls on whitespace.
#[must_use]
pub fn classify_test_output<S: AsRef<str>>(events: &[S], policy: ZeroTestsPolicy) -> TestOutcome {
    let joined = events
        .iter()
        .map(|event| strip_ansi(event.as_ref()))
        .collect::<Vec<_>>()
        .join(" ");

    let passing = first_count(&PASSING, &joined);
    let failing = first_count(&FAILING, &joined);

    match (passing, failing) {
        (None, None) => TestOutcome::NotExecuted,
        (Some(0), None) => match policy {
            ZeroTestsPolicy::NotExecuted => TestOutcome::NotExecuted,
            ZeroTestsPolicy::Executed => TestOutcome::Executed {
                passing: 0,
                failing: 0,
            },
        },
        (passing, failing) => TestOutcome::Executed {
            passing: passing.unwrap_or(0),
            failing: failing.unwrap_or(0),
        },
    }
}

fn first_count(pattern: &Regex, text: &str) -> Option<u32> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Whether the latest run of `stage` succeeded.
///
/// `None` when the project is ignored or the stage has never run.
#[must_use]
pub fn stage_status(
    record: &ProjectRecord,
    stage: Stage,
    policy: ZeroTestsPolicy,
) -> Option<bool> {
    if record.ignore {
        return None;
    }
    let run = record.stage_run(stage)?;
    Some(match stage {
        Stage::Compile | Stage::Migrate => run.exited_cleanly(),
        Stage::Test => classify_test_output(&run.std_out_events, policy).is_executed(),
    })
}
