use anyhow::bail;
use harvest_core::entities::ProjectRecord;
use harvest_core::enums::{Stage, ZeroTestsPolicy};
use harvest_core::outcome::{TestOutcome, classify_test_output, stage_status};
use harvest_ledger::ProjectLedger;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ShowArgs;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct StageView {
    stage: Stage,
    /// `None` when the stage never finished.
    succeeded: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ProjectView<'a> {
    index: usize,
    record: &'a ProjectRecord,
    stages: Vec<StageView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    test_outcome: Option<TestOutcome>,
}

/// Handle `harvest show`.
pub fn handle(args: &ShowArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let projects = ctx.projects()?;
    let Some((index, record)) = resolve(&projects, &args.project) else {
        bail!("no project '{}' in {}", args.project, projects.path().display());
    };
    let view = view(index, record, ctx.config.pipeline.zero_tests_policy);
    output(&view, flags.format)
}

/// Look a project up by key, falling back to its ledger position.
fn resolve<'a>(projects: &'a ProjectLedger, selector: &str) -> Option<(usize, &'a ProjectRecord)> {
    if let Some(index) = projects.index_of(selector) {
        return projects.get(selector).map(|record| (index, record));
    }
    let index = selector.parse::<usize>().ok()?;
    projects.get_index(index).map(|(_, record)| (index, record))
}

fn view(index: usize, record: &ProjectRecord, policy: ZeroTestsPolicy) -> ProjectView<'_> {
    let stages = Stage::ALL
        .into_iter()
        .map(|stage| StageView {
            stage,
            succeeded: stage_status(record, stage, policy),
        })
        .collect();
    let test_outcome = record
        .test
        .as_ref()
        .filter(|run| run.is_finished())
        .map(|run| classify_test_output(&run.std_out_events, policy));
    ProjectView {
        index,
        record,
        stages,
        test_outcome,
    }
}
