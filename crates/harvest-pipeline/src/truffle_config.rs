//! Build-config patching: pin the development network and the compiler.
//!
//! The config is a JavaScript module, so it is patched as text rather than
//! parsed. Every rewrite keeps a one-time `.bkp` copy of the original next to
//! the file so [`rollback`] can restore it exactly.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use harvest_config::PipelineConfig;
use harvest_core::enums::{Stage, ZeroTestsPolicy};
use harvest_core::outcome::stage_status;
use harvest_ledger::ProjectLedger;
use regex::Regex;

use crate::error::PipelineError;
use crate::layout;

// Values only: whatever follows (a comma, a brace, a newline) is kept.
static PORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bport:\s*\d{2,5}\b").expect("port regex must compile"));

static NETWORK_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bnetwork_id:\s*(?:"\d{1,5}"|'\d{1,5}'|\d{1,5}\b)"#)
        .expect("network_id regex must compile")
});

static HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"host:\s*("[^"\n]*"|'[^'\n]*')"#).expect("host regex must compile")
});

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*//.*$").expect("line comment regex must compile"));

static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("block comment regex must compile"));

static EMPTY_EXPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^module\.exports\s*=\s*\{\s*\}\s*;?$").expect("empty export regex must compile")
});

/// Local development network every project is pointed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPin {
    pub host: String,
    pub port: u16,
    /// Used when a config has to be generated and no version was discovered.
    pub default_solc_version: String,
}

impl NetworkPin {
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            host: config.network_host.clone(),
            port: config.network_port,
            default_solc_version: config.default_solc_version.clone(),
        }
    }
}

/// Sidecar holding the pre-patch content.
#[must_use]
pub fn backup_path(config_path: &Path) -> PathBuf {
    let mut name = config_path.as_os_str().to_owned();
    name.push(".bkp");
    PathBuf::from(name)
}

/// Copy the config to its `.bkp` sidecar unless one already exists.
///
/// Returns `true` if a backup was written.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] if the copy fails.
pub fn backup(config_path: &Path) -> Result<bool, PipelineError> {
    let bkp = backup_path(config_path);
    if bkp.exists() {
        return Ok(false);
    }
    fs::copy(config_path, &bkp).map_err(PipelineError::io(&bkp))?;
    Ok(true)
}

/// Restore the config from its `.bkp` sidecar, if there is one.
///
/// The sidecar is kept, so a later patch still backs up nothing new.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] if the copy fails.
pub fn rollback(config_path: &Path) -> Result<bool, PipelineError> {
    let bkp = backup_path(config_path);
    if !bkp.exists() {
        return Ok(false);
    }
    fs::copy(&bkp, config_path).map_err(PipelineError::io(config_path))?;
    Ok(true)
}

/// Patched config text. Pure, and idempotent: `patch(patch(x)) == patch(x)`.
///
/// 1. A config exporting an object with no properties is replaced by a
///    generated one.
/// 2. Otherwise `port`, numeric `network_id`, and `host` values are pinned.
/// 3. If there is no `compilers` section and a version is known, one is
///    spliced in before the last `}` of the file.
#[must_use]
pub fn patch(content: &str, pin: &NetworkPin, version: Option<&str>) -> String {
    if exports_empty_object(content) {
        return template(pin, version.unwrap_or(&pin.default_solc_version));
    }

    let patched = PORT.replace_all(content, format!("port: {}", pin.port).as_str());
    let patched = NETWORK_ID.replace_all(&patched, r#"network_id: "*""#);
    let patched = HOST.replace_all(&patched, format!("host: \"{}\"", pin.host).as_str());

    match version {
        Some(version) if !patched.contains("compilers") => {
            splice_compilers(&patched, version).unwrap_or_else(|| patched.into_owned())
        }
        _ => patched.into_owned(),
    }
}

/// Back up, patch, and rewrite the config at `config_path`.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] if the file cannot be read, backed up, or
/// written.
pub fn apply(
    config_path: &Path,
    pin: &NetworkPin,
    version: Option<&str>,
) -> Result<(), PipelineError> {
    let original = fs::read_to_string(config_path).map_err(PipelineError::io(config_path))?;
    let patched = patch(&original, pin, version);
    backup(config_path)?;
    if patched != original {
        fs::write(config_path, patched).map_err(PipelineError::io(config_path))?;
        tracing::debug!(path = %config_path.display(), ?version, "build config patched");
    }
    Ok(())
}

/// Totals of a [`rollback_projects`] pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct RollbackSummary {
    pub restored: usize,
    pub without_backup: usize,
    pub failed: usize,
}

/// Restore the config of every registered project.
///
/// With `failed_only`, only projects whose latest compile failed are touched,
/// so they can be recompiled with their own settings. Per-project errors are
/// logged and counted.
pub fn rollback_projects(
    projects: &ProjectLedger,
    clone_dir: &Path,
    failed_only: bool,
) -> RollbackSummary {
    let mut summary = RollbackSummary::default();
    for record in projects.values() {
        if failed_only
            && stage_status(record, Stage::Compile, ZeroTestsPolicy::default()) != Some(false)
        {
            continue;
        }
        let path = layout::config_path(clone_dir, record);
        match rollback(&path) {
            Ok(true) => summary.restored += 1,
            Ok(false) => summary.without_backup += 1,
            Err(error) => {
                tracing::warn!(key = %record.key, %error, "rollback failed");
                summary.failed += 1;
            }
        }
    }
    summary
}

fn exports_empty_object(content: &str) -> bool {
    let without_blocks = BLOCK_COMMENT.replace_all(content, "");
    let without_lines = LINE_COMMENT.replace_all(&without_blocks, "");
    EMPTY_EXPORT.is_match(without_lines.trim())
}

fn template(pin: &NetworkPin, version: &str) -> String {
    format!(
        r#"module.exports = {{
  networks: {{
    development: {{
      host: "{host}",
      port: {port},
      network_id: "*" // Match any network id
    }}
  }},
  compilers: {{
    solc: {{
      version: "{version}",
    }}
  }}
}};
"#,
        host = pin.host,
        port = pin.port,
    )
}

fn compilers_block(version: &str) -> String {
    format!("\n  compilers: {{\n    solc: {{\n      version: \"{version}\",\n    }}\n  }}\n")
}

/// Insert the compilers block right after the last significant character
/// before the file's final `}`. A comma is prepended unless that character
/// already opens the object or ends a property.
fn splice_compilers(content: &str, version: &str) -> Option<String> {
    let closing = content.rfind('}')?;
    let position = last_significant_before(content, closing)?;
    let last = content[position..].chars().next()?;
    let separator = if last == '{' || last == ',' { "" } else { "," };

    let insert_at = position + last.len_utf8();
    let mut patched = String::with_capacity(content.len() + 64);
    patched.push_str(&content[..insert_at]);
    patched.push_str(separator);
    patched.push_str(&compilers_block(version));
    patched.push_str(&content[insert_at..]);
    Some(patched)
}

/// Byte index of the last non-whitespace character before `end` that is not
/// on a `//` comment line.
fn last_significant_before(content: &str, end: usize) -> Option<usize> {
    let mut end = end;
    loop {
        let (index, _) = content[..end]
            .char_indices()
            .rev()
            .find(|(_, c)| !c.is_whitespace())?;
        let line_start = content[..index].rfind('\n').map_or(0, |i| i + 1);
        if content[line_start..=index].trim_start().starts_with("//") {
            end = line_start;
        } else {
            return Some(index);
        }
    }
}
