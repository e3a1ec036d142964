//! External tool execution.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;
use tracing::debug;

/// Captured result of one tool invocation.
#[derive(Debug, Clone)]
pub(crate) struct ToolOutput {
    /// Exit code (-1 when killed by a signal).
    pub exit_code: i32,

    pub stdout: Vec<u8>,

    pub stderr: String,

    pub duration_ms: u64,

    pub success: bool,
}

impl ToolOutput {
    /// Whether the tool exited with code 0.
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }

    /// Trimmed stderr, or the exit code when stderr is empty.
    pub fn failure_reason(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("exited with code {}", self.exit_code)
        } else {
            stderr.to_string()
        }
    }
}

/// Run `program` to completion and capture its output.
///
/// The child is killed if the returned future is dropped, so callers bound it
/// with `tokio::time::timeout` or cancel it by dropping.
pub(crate) async fn run_tool<I, S>(
    program: &str,
    args: I,
    cwd: Option<&Path>,
) -> std::io::Result<ToolOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let start = Instant::now();

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let output = command.output().await?;

    let duration_ms = start.elapsed().as_millis() as u64;
    let exit_code = output.status.code().unwrap_or(-1);
    debug!(program = %program, exit_code, duration_ms, "external tool finished");

    Ok(ToolOutput {
        exit_code,
        stdout: output.stdout,
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        duration_ms,
        success: output.status.success(),
    })
}
