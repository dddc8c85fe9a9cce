//! Compiler version discovery from `pragma solidity` directives.

use std::path::Path;
use std::sync::LazyLock;

use harvest_parser::{PragmaCache, solidity_requirements};
use ignore::WalkBuilder;
use regex::Regex;
use semver::Version;

static VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\^?\d+\.\d+\.\d+").expect("version regex must compile"));

/// Highest version named by any `.sol` file under `<project_dir>/contracts`.
///
/// Every `pragma solidity` directive of every file contributes its first
/// `x.y.z` (with an optional caret, which is ignored for comparison and
/// stripped from the result). Files that cannot be read or scanned are
/// logged and skipped.
pub fn discover_version(project_dir: &Path, cache: &mut PragmaCache) -> Option<String> {
    let contracts = project_dir.join("contracts");
    if !contracts.is_dir() {
        tracing::info!(
            dir = %project_dir.display(),
            "no contracts directory, solc version unknown"
        );
        return None;
    }

    let mut builder = WalkBuilder::new(&contracts);
    builder.standard_filters(false);
    builder.hidden(false);
    builder.sort_by_file_name(|a, b| a.cmp(b));

    let mut best: Option<Version> = None;
    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                tracing::debug!(%error, "skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_some_and(|ft| ft.is_file())
            || path.extension().is_none_or(|ext| ext != "sol")
        {
            continue;
        }

        let directives = match cache.directives(path) {
            Ok(directives) => directives,
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "could not scan contract");
                continue;
            }
        };
        for version in solidity_requirements(directives).filter_map(first_version) {
            if best.as_ref().is_none_or(|current| version > *current) {
                best = Some(version);
            }
        }
    }

    match best {
        Some(version) => {
            tracing::debug!(dir = %project_dir.display(), %version, "solc version discovered");
            Some(version.to_string())
        }
        None => {
            tracing::info!(dir = %project_dir.display(), "no solidity pragma found");
            None
        }
    }
}

/// First `x.y.z` in a requirement string, caret dropped.
fn first_version(requirement: &str) -> Option<Version> {
    let found = VERSION.find(requirement)?;
    Version::parse(found.as_str().trim_start_matches('^')).ok()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (path, source) in files {
            let path = dir.path().join("contracts").join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, source).unwrap();
        }
        dir
    }

    #[rstest]
    #[case(&[("A.sol", "pragma solidity ^0.4.18;"), ("B.sol", "pragma solidity 0.5.0;"), ("C.sol", "pragma solidity 0.4.25;")], "0.5.0")]
    #[case(&[("A.sol", "pragma solidity 0.4.9;"), ("B.sol", "pragma solidity 0.4.24;")], "0.4.24")]
    fn compares_as_versions_not_strings(#[case] files: &[(&str, &str)], #[case] expected: &str) {
        let dir = project(files);
        assert_eq!(
            discover_version(dir.path(), &mut PragmaCache::new()).as_deref(),
            Some(expected)
        );
    }

    #[test]
    fn every_directive_of_a_flattened_file_counts() {
        let dir = project(&[(
            "Flat.sol",
            "pragma solidity ^0.4.18;\nlibrary SafeMath {}\n\npragma solidity ^0.4.24;\ncontract Token {}\n",
        )]);
        assert_eq!(
            discover_version(dir.path(), &mut PragmaCache::new()).as_deref(),
            Some("0.4.24")
        );
    }

    #[rstest]
    #[case("^0.5.0", Some("0.5.0"))]
    #[case(">=0.4.22 <0.6.0", Some("0.4.22"))]
    #[case("0.4", None)]
    fn first_version_of_requirement(#[case] requirement: &str, #[case] expected: Option<&str>) {
        assert_eq!(
            first_version(requirement).map(|v| v.to_string()).as_deref(),
            expected
        );
    }

    #[test]
    fn walks_nested_contracts() {
        let dir = tempfile::tempdir().unwrap();
        let contracts = dir.path().join("contracts");
        fs::create_dir_all(contracts.join("token")).unwrap();
        fs::write(
            contracts.join("Migrations.sol"),
            "pragma solidity ^0.4.18;\ncontract M {}",
        )
        .unwrap();
        fs::write(contracts.join("token/Token.sol"), "pragma solidity 0.4.25;").unwrap();
        fs::write(
            contracts.join("token/Sale.sol"),
            "// pragma solidity 0.6.0;\npragma solidity ^0.5.0;",
        )
        .unwrap();
        fs::write(contracts.join("notes.md"), "pragma solidity 0.9.0;").unwrap();

        let mut cache = PragmaCache::new();
        assert_eq!(discover_version(dir.path(), &mut cache).as_deref(), Some("0.5.0"));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn broken_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let contracts = dir.path().join("contracts");
        fs::create_dir_all(&contracts).unwrap();
        fs::write(contracts.join("A.sol"), "pragma solidity ^0.4.24;").unwrap();
        fs::write(contracts.join("B.sol"), "/* never closed pragma solidity 0.5.0;").unwrap();

        let mut cache = PragmaCache::new();
        assert_eq!(discover_version(dir.path(), &mut cache).as_deref(), Some("0.4.24"));
    }

    #[test]
    fn missing_contracts_dir_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(discover_version(dir.path(), &mut PragmaCache::new()), None);
    }
}
