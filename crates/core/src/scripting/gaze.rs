//! Client for the external gaze-estimation worker.
//!
//! The worker is invoked as `<interpreter> <script> <image-path>` and prints
//! a single JSON object on stdout:
//!
//! ```text
//! {"gaze_direction": "center", "attention_score": 0.82, "head_pitch": -3.1, "head_yaw": 4.0}
//! {"error": "No face detected in image", ...}
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use super::subprocess::{run_command, ProcessError, ProcessInput};

/// Default wall-clock limit for one analysis.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Parsed worker verdict for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeAnalysis {
    pub gaze_direction: String,
    pub attention_score: f64,
    pub head_pitch: f64,
    pub head_yaw: f64,
}

#[derive(Debug, Deserialize)]
struct WorkerReply {
    error: Option<String>,
    gaze_direction: Option<String>,
    attention_score: Option<f64>,
    head_pitch: Option<f64>,
    head_yaw: Option<f64>,
}

/// Location and limits of the gaze worker program.
#[derive(Debug, Clone)]
pub struct GazeWorker {
    pub interpreter: String,
    pub script: PathBuf,
    pub timeout: Duration,
}

impl GazeWorker {
    pub fn new(interpreter: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: script.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Analyse the image at `image_path`.
    ///
    /// Fails on timeout, on a worker-reported `error`, or when stdout is not
    /// a complete verdict.
    pub async fn analyze(&self, image_path: &Path) -> Result<GazeAnalysis, ProcessError> {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(&self.script).arg(image_path);

        let output = run_command(
            &mut cmd,
            ProcessInput {
                stdin: serde_json::json!({ "imagePath": image_path.to_string_lossy() }),
                env_vars: vec![],
                timeout: self.timeout,
            },
        )
        .await?;

        let Some(parsed) = output.parsed_output else {
            if output.exit_code != 0 {
                return Err(ProcessError::ExecutionFailed {
                    exit_code: output.exit_code,
                    stderr: output.stderr,
                });
            }
            return Err(ProcessError::InvalidOutput(
                "worker did not print JSON".into(),
            ));
        };

        parse_reply(parsed)
    }
}

fn parse_reply(value: serde_json::Value) -> Result<GazeAnalysis, ProcessError> {
    let reply: WorkerReply = serde_json::from_value(value)
        .map_err(|e| ProcessError::InvalidOutput(e.to_string()))?;

    if let Some(error) = reply.error {
        return Err(ProcessError::InvalidOutput(error));
    }

    match (
        reply.gaze_direction,
        reply.attention_score,
        reply.head_pitch,
        reply.head_yaw,
    ) {
        (Some(gaze_direction), Some(attention_score), Some(head_pitch), Some(head_yaw)) => {
            Ok(GazeAnalysis {
                gaze_direction,
                attention_score,
                head_pitch,
                head_yaw,
            })
        }
        _ => Err(ProcessError::InvalidOutput(
            "worker reply is missing fields".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_full_reply() {
        let analysis = parse_reply(json!({
            "gaze_direction": "left",
            "attention_score": 0.4,
            "head_pitch": 1.5,
            "head_yaw": -20.0
        }))
        .unwrap();
        assert_eq!(analysis.gaze_direction, "left");
        assert_eq!(analysis.head_yaw, -20.0);
    }

    #[test]
    fn worker_error_wins_over_fields() {
        let err = parse_reply(json!({
            "error": "No face detected in image",
            "gaze_direction": "unknown",
            "attention_score": 0.0,
            "head_pitch": 0.0,
            "head_yaw": 0.0
        }))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Process produced invalid output: No face detected in image"
        );
    }

    #[test]
    fn partial_reply_is_invalid() {
        assert!(parse_reply(json!({"gaze_direction": "left"})).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_worker_script() {
        use std::io::Write;

        let mut script = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            script,
            r#"echo '{{"gaze_direction":"center","attention_score":0.9,"head_pitch":0.0,"head_yaw":1.0}}'"#
        )
        .unwrap();

        let worker = GazeWorker::new("sh", script.path()).with_timeout(Duration::from_secs(5));
        let analysis = worker.analyze(Path::new("/tmp/frame.png")).await.unwrap();
        assert_eq!(analysis.gaze_direction, "center");
        assert_eq!(analysis.attention_score, 0.9);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn silent_failing_worker_reports_exit_code() {
        use std::io::Write;

        let mut script = tempfile::NamedTempFile::new().unwrap();
        writeln!(script, "echo broken >&2; exit 2").unwrap();

        let worker = GazeWorker::new("sh", script.path());
        let err = worker.analyze(Path::new("/tmp/frame.png")).await.unwrap_err();
        assert!(matches!(err, ProcessError::ExecutionFailed { exit_code: 2, .. }));
    }
}
