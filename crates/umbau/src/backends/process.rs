//! Shared subprocess runner for process-based backends.
//!
//! One code path for spawn, output capture, deadline enforcement and child
//! termination. Timeout kills the child (`kill_on_drop`) rather than
//! abandoning it: an orphaned LibreOffice process keeps holding its profile
//! lock and poisons every later invocation.

use crate::{Result, UmbauError};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{Duration, timeout};

/// Captured output of a finished tool invocation.
#[derive(Debug)]
pub(crate) struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run an external tool to completion under a deadline.
///
/// Returns `Timeout` when the deadline elapses (the child is killed), and a
/// `Backend` error carrying the tool's combined output when it exits
/// non-zero.
pub(crate) async fn run_tool<I, S>(
    backend_name: &str,
    program: &OsStr,
    args: I,
    timeout_secs: u64,
) -> Result<ToolOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                UmbauError::MissingDependency(format!(
                    "'{}' not found. Install it or point UMBAU_{}_PATH at the binary.",
                    program.to_string_lossy(),
                    backend_name.to_uppercase().replace('-', "_")
                ))
            } else {
                UmbauError::backend_with_source(
                    format!("Failed to execute '{}'", program.to_string_lossy()),
                    e,
                )
            }
        })?;

    let output = match timeout(Duration::from_secs(timeout_secs), child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(UmbauError::backend_with_source(
                format!("Failed to wait for '{}'", program.to_string_lossy()),
                e,
            ));
        }
        Err(_) => {
            // wait_with_output consumed the child; kill_on_drop reaps it here.
            return Err(UmbauError::Timeout {
                backend: backend_name.to_string(),
                seconds: timeout_secs,
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        let diagnostics = if !stderr.trim().is_empty() { &stderr } else { &stdout };
        return Err(UmbauError::backend(format!(
            "'{}' exited with code {}: {}",
            program.to_string_lossy(),
            output.status.code().unwrap_or(-1),
            diagnostics.trim()
        )));
    }

    Ok(ToolOutput { stdout, stderr })
}

/// Locate a tool binary: env override, then config override, then PATH.
pub(crate) fn locate_tool(
    env_var: &str,
    config_path: Option<&PathBuf>,
    names: &[&str],
) -> Result<PathBuf> {
    if let Some(value) = std::env::var_os(env_var).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(value));
    }

    if let Some(path) = config_path {
        return Ok(path.clone());
    }

    if let Some(path_env) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&path_env) {
            for name in names {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
        }
    }

    Err(UmbauError::MissingDependency(format!(
        "'{}' not found in PATH. Install it or set {}.",
        names.first().copied().unwrap_or("tool"),
        env_var
    )))
}
