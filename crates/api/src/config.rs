use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use cortexa_core::scripting::gaze::GazeWorker;

use crate::auth::jwt::JwtConfig;

const DEFAULT_SOCIAL_VIDEO_URL: &str =
    "https://videos.pexels.com/video-files/4440954/4440954-hd_1920_1080_25fps.mp4";
const DEFAULT_PATTERN_VIDEO_URL: &str =
    "https://videos.pexels.com/video-files/3129957/3129957-hd_1920_1080_25fps.mp4";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Parse `name` from the environment, falling back to `default` when unset.
pub(crate) fn env_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Root directory for uploaded images and recordings (default: `uploads`).
    pub upload_dir: PathBuf,
    /// Prefix for absolute file URLs handed back to clients.
    pub public_base_url: String,
    /// Stimulus shown on the left of the social-attention test.
    pub social_video_url: String,
    /// Stimulus shown on the right of the social-attention test.
    pub pattern_video_url: String,
    /// External gaze worker; analysis endpoints are disabled without it.
    pub gaze_worker: Option<GazeWorkerConfig>,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
}

#[derive(Debug, Clone)]
pub struct GazeWorkerConfig {
    pub interpreter: String,
    pub script: PathBuf,
    pub timeout_secs: u64,
}

impl GazeWorkerConfig {
    pub fn worker(&self) -> GazeWorker {
        GazeWorker::new(self.interpreter.clone(), self.script.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                    |
    /// |----------------------------|----------------------------|
    /// | `HOST`                     | `0.0.0.0`                  |
    /// | `PORT`                     | `5000`                     |
    /// | `CORS_ORIGINS`             | `http://localhost:3000`    |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                       |
    /// | `UPLOAD_DIR`               | `uploads`                  |
    /// | `PUBLIC_BASE_URL`          | `http://localhost:<PORT>`  |
    /// | `SOCIAL_VIDEO_URL`         | stock social clip          |
    /// | `PATTERN_VIDEO_URL`        | stock pattern clip         |
    /// | `GAZE_WORKER_SCRIPT`       | unset (worker disabled)    |
    /// | `GAZE_WORKER_PYTHON`       | `python3`                  |
    /// | `GAZE_WORKER_TIMEOUT_SECS` | `60`                       |
    pub fn from_env() -> Result<Self, ConfigError> {
        let port: u16 = env_or("PORT", 5000)?;

        let gaze_worker = match std::env::var("GAZE_WORKER_SCRIPT") {
            Ok(script) if !script.trim().is_empty() => Some(GazeWorkerConfig {
                interpreter: env_or("GAZE_WORKER_PYTHON", "python3".to_string())?,
                script: PathBuf::from(script),
                timeout_secs: env_or("GAZE_WORKER_TIMEOUT_SECS", 60)?,
            }),
            _ => None,
        };

        Ok(Self {
            host: env_or("HOST", "0.0.0.0".to_string())?,
            port,
            cors_origins: parse_origins(
                &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".into()),
            ),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30)?,
            upload_dir: env_or("UPLOAD_DIR", PathBuf::from("uploads"))?,
            public_base_url: env_or("PUBLIC_BASE_URL", format!("http://localhost:{port}"))?,
            social_video_url: env_or("SOCIAL_VIDEO_URL", DEFAULT_SOCIAL_VIDEO_URL.to_string())?,
            pattern_video_url: env_or(
                "PATTERN_VIDEO_URL",
                DEFAULT_PATTERN_VIDEO_URL.to_string(),
            )?,
            gaze_worker,
            jwt: JwtConfig::from_env()?,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_blank_entries_dropped() {
        let origins = parse_origins(" http://a.test ,,http://b.test, ");
        assert_eq!(origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn unset_variables_fall_back_to_defaults() {
        let port: u16 = env_or("CORTEXA_TEST_UNSET_PORT", 5000).unwrap();
        assert_eq!(port, 5000);
    }

    #[test]
    fn unparseable_values_name_the_variable() {
        std::env::set_var("CORTEXA_TEST_BAD_TIMEOUT", "soon");
        let err = env_or::<u64>("CORTEXA_TEST_BAD_TIMEOUT", 30).unwrap_err();
        assert_eq!(
            err.to_string(),
            "CORTEXA_TEST_BAD_TIMEOUT has an invalid value 'soon'"
        );
    }

    #[test]
    fn worker_config_carries_timeout() {
        let cfg = GazeWorkerConfig {
            interpreter: "python3".into(),
            script: PathBuf::from("gaze_worker.py"),
            timeout_secs: 5,
        };
        let worker = cfg.worker();
        assert_eq!(worker.timeout, Duration::from_secs(5));
        assert_eq!(worker.interpreter, "python3");
    }
}
