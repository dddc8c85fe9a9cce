//! Round trips of both ledgers through disk.

use chrono::{TimeZone, Utc};
use harvest_core::entities::{
    ProjectRecord, RepoOwner, RepoSnapshot, RepositoryRecord, StageRun, TreeEntry,
};
use harvest_core::enums::EntryType;
use harvest_ledger::{open_projects, open_repositories, qualifying};
use pretty_assertions::assert_eq;

fn repo(full_name: &str, stars: u64) -> RepositoryRecord {
    let (owner, name) = full_name.split_once('/').unwrap();
    RepositoryRecord::new(RepoSnapshot {
        id: stars,
        name: name.into(),
        full_name: full_name.into(),
        owner: RepoOwner {
            login: owner.into(),
        },
        clone_url: format!("https://github.com/{full_name}.git"),
        html_url: format!("https://github.com/{full_name}"),
        description: Some("contracts".into()),
        stargazers_count: stars,
        size: 100,
        pushed_at: Some(Utc.with_ymd_and_hms(2018, 11, 3, 12, 0, 0).unwrap()),
    })
}

fn entry(path: &str, entry_type: EntryType) -> TreeEntry {
    TreeEntry {
        path: path.into(),
        mode: Some("100644".into()),
        entry_type,
        sha: "0123".into(),
        size: None,
        url: None,
        children: None,
    }
}

#[test]
fn repository_ledger_survives_reopen_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data/repositories.json");

    let mut ledger = open_repositories(&path).unwrap();
    for (name, stars) in [("zeta/a", 1), ("alpha/b", 50), ("mid/c", 7)] {
        ledger.insert(name, repo(name, stars));
    }
    ledger.save().unwrap();
    let first = std::fs::read(&path).unwrap();

    let reopened = open_repositories(&path).unwrap();
    assert_eq!(
        reopened.keys().collect::<Vec<_>>(),
        ["zeta/a", "alpha/b", "mid/c"]
    );
    assert_eq!(reopened.get("alpha/b"), ledger.get("alpha/b"));

    reopened.save().unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), first);
}

#[test]
fn qualifying_filters_in_ledger_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut ledger = open_repositories(dir.path().join("r.json")).unwrap();

    let mut only_tests = repo("acme/only-tests", 3);
    only_tests.test_trees = Some(vec![entry("test", EntryType::Tree)]);
    only_tests.truffle_trees = Some(Vec::new());

    let mut both = repo("acme/both", 2);
    both.test_trees = Some(vec![entry("test", EntryType::Tree)]);
    both.truffle_trees = Some(vec![entry("truffle.js", EntryType::Blob)]);

    let mut both_later = repo("acme/both-later", 1);
    both_later.test_trees = Some(vec![entry("tests", EntryType::Tree)]);
    both_later.truffle_trees = Some(vec![entry("app/truffle-config.js", EntryType::Blob)]);

    ledger.insert("acme/only-tests", only_tests);
    ledger.insert("acme/both", both);
    ledger.insert("acme/unsearched", repo("acme/unsearched", 9));
    ledger.insert("acme/both-later", both_later);

    let names: Vec<_> = qualifying(&ledger).iter().map(|r| r.full_name()).collect();
    assert_eq!(names, ["acme/both", "acme/both-later"]);
}

#[test]
fn project_ledger_is_compact_and_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("projects.json");
    let key = ProjectRecord::key_for("acme/token", "truffle.js");

    let mut ledger = open_projects(&path).unwrap();
    ledger.insert(
        key.clone(),
        ProjectRecord {
            key: key.clone(),
            full_name: "acme/token".into(),
            path: "truffle.js".into(),
            has_package_json: false,
            has_test_dir: Some(true),
            has_test_script: false,
            solc_version: None,
            repo_date: None,
            install: None,
            compile: Some(StageRun {
                exit_code: Some(0),
                finish: Some(Utc::now()),
                std_out_events: vec!["Compiling ./contracts/Migrations.sol...\n".into()],
                ..StageRun::started(Utc::now())
            }),
            migrate: None,
            test: None,
            ignore: false,
        },
    );
    ledger.save().unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(!text.contains('\n'));
    assert!(text.starts_with("{\"acme/token/truffle.js\":{"));

    let reopened = open_projects(&path).unwrap();
    assert_eq!(reopened.get(&key), ledger.get(&key));
}
