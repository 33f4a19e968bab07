//! Spawn a child process, feed it JSON on stdin, capture its output, and
//! kill it when it overruns its timeout.

use std::process::Stdio;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

/// Maximum stdout or stderr captured per stream (10 MiB).
const MAX_OUTPUT_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ProcessInput {
    /// JSON written to the child's stdin before it is closed.
    pub stdin: Value,
    pub env_vars: Vec<(String, String)>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    pub duration_ms: u64,
    /// Trimmed stdout parsed as JSON, if it is valid JSON.
    pub parsed_output: Option<Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Process timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Process failed with exit code {exit_code}: {stderr}")]
    ExecutionFailed { exit_code: i32, stderr: String },

    #[error("Process produced invalid output: {0}")]
    InvalidOutput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run `cmd` to completion under `input.timeout`.
///
/// The caller sets the program and arguments. A non-zero exit status is
/// still returned as `Ok`; callers decide whether that is a failure.
pub async fn run_command(
    cmd: &mut Command,
    input: ProcessInput,
) -> Result<ProcessOutput, ProcessError> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    for (key, value) in &input.env_vars {
        cmd.env(key, value);
    }

    let start = Instant::now();
    let mut child = cmd.spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        let bytes = serde_json::to_vec(&input.stdin).unwrap_or_default();
        // The child may exit without reading stdin.
        let _ = stdin.write_all(&bytes).await;
        drop(stdin);
    }

    let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
    let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

    match tokio::time::timeout(input.timeout, child.wait()).await {
        Ok(Ok(status)) => {
            let stdout_bytes = stdout_task.await.unwrap_or_default();
            let stderr_bytes = stderr_task.await.unwrap_or_default();
            let stdout = String::from_utf8_lossy(&stdout_bytes).into_owned();
            let stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();
            let parsed_output = serde_json::from_str(stdout.trim()).ok();

            Ok(ProcessOutput {
                stdout,
                stderr,
                exit_code: status.code().unwrap_or(-1),
                duration_ms: start.elapsed().as_millis() as u64,
                parsed_output,
            })
        }
        Ok(Err(e)) => Err(ProcessError::Io(e)),
        // `child` drops here and `kill_on_drop` terminates it.
        Err(_) => Err(ProcessError::Timeout {
            elapsed_ms: start.elapsed().as_millis() as u64,
        }),
    }
}

async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(h) = handle {
        let _ = h.take(MAX_OUTPUT_BYTES).read_to_end(&mut buf).await;
    }
    buf
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::scripting::test_helpers::default_input;

    #[tokio::test]
    async fn captures_stdout_and_parses_json() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", r#"echo '{"ok": true}'"#]);
        let out = run_command(&mut cmd, default_input()).await.unwrap();
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.parsed_output.unwrap()["ok"], true);
    }

    #[tokio::test]
    async fn stdin_is_piped() {
        let mut cmd = Command::new("cat");
        let out = run_command(&mut cmd, default_input()).await.unwrap();
        assert_eq!(out.parsed_output.unwrap()["key"], "value");
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo oops >&2; exit 3"]);
        let out = run_command(&mut cmd, default_input()).await.unwrap();
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stderr.trim(), "oops");
        assert!(out.parsed_output.is_none());
    }

    #[tokio::test]
    async fn slow_process_times_out() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");
        let mut input = default_input();
        input.timeout = Duration::from_millis(100);
        let err = run_command(&mut cmd, input).await.unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { .. }));
    }

    #[tokio::test]
    async fn env_vars_are_applied() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "printf '\"%s\"' \"$CORTEXA_TEST\""]);
        let mut input = default_input();
        input.env_vars = vec![("CORTEXA_TEST".into(), "hello".into())];
        let out = run_command(&mut cmd, input).await.unwrap();
        assert_eq!(out.parsed_output.unwrap(), "hello");
    }
}
