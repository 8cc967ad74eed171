//! Environment capture for toolchains that ship a setup script.
//!
//! Cross debuggers often only work after sourcing a vendor script that
//! exports `PATH`, sysroot and license variables. The script is sourced once
//! in a `bash` subshell and the resulting environment is handed to every
//! debugger process started afterwards.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::{LocatorError, LocatorResult};

/// Source `script` in `bash` and return the environment it leaves behind.
///
/// ## Errors
///
/// Returns `InvalidConfig` if the script does not exist or exits non-zero,
/// and `Io` if `bash` cannot be run.
pub fn capture_script_environment(script: &Path) -> LocatorResult<BTreeMap<String, String>>
{
    if !script.is_file() {
        return Err(LocatorError::InvalidConfig(format!(
            "environment script not found: {}",
            script.display()
        )));
    }

    let quoted = shell_quote(&script.display().to_string());
    let output = Command::new("bash")
        .arg("-c")
        .arg(format!("source {quoted} >/dev/null 2>&1 && env"))
        .output()?;

    if !output.status.success() {
        return Err(LocatorError::InvalidConfig(format!(
            "environment script {} exited with {}",
            script.display(),
            output.status
        )));
    }

    let listing = String::from_utf8_lossy(&output.stdout);
    let vars = parse_env_listing(&listing);
    debug!(script = %script.display(), vars = vars.len(), "captured script environment");
    Ok(vars)
}

/// Parse `env` output, one `KEY=value` pair per line.
///
/// Lines without `=` (continuations of multi-line values) are skipped.
#[must_use]
pub fn parse_env_listing(listing: &str) -> BTreeMap<String, String>
{
    listing
        .lines()
        .filter_map(|line| line.split_once('='))
        .filter(|(key, _)| !key.is_empty() && !key.contains(char::is_whitespace))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn shell_quote(text: &str) -> String
{
    format!("'{}'", text.replace('\'', r"'\''"))
}
