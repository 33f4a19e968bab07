//! External analysis programs run as child processes.
//!
//! The gaze worker is a Python program that receives an image path on its
//! command line and prints a JSON verdict on stdout. [`subprocess`] owns the
//! spawn, I/O and timeout handling; [`gaze`] knows the worker's contract.

pub mod gaze;
pub mod subprocess;

#[cfg(test)]
pub(crate) mod test_helpers {
    use std::time::Duration;

    use super::subprocess::ProcessInput;

    pub fn default_input() -> ProcessInput {
        ProcessInput {
            stdin: serde_json::json!({"key": "value"}),
            env_vars: vec![],
            timeout: Duration::from_secs(5),
        }
    }
}
