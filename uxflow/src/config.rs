//! Configuration for the pipeline and its HTTP client.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::api::Endpoints;
use crate::errors::UxflowError;
use crate::poll::PollConfig;

/// Compute service base URL.
pub const DEFAULT_API_URL: &str = "https://api.signaloid.io";

/// Core used when neither the artifact nor the configuration picks one.
pub const DEFAULT_CORE_ID: &str = "cor_b21e4de9927158c1a5b603c2affb8a09";

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "UXFLOW_API_KEY";
/// Environment variable overriding the base URL.
pub const ENV_API_URL: &str = "UXFLOW_API_URL";
/// Environment variable overriding the default core.
pub const ENV_CORE_ID: &str = "UXFLOW_CORE_ID";
/// Environment variable overriding the poll interval in milliseconds.
pub const ENV_POLL_INTERVAL_MS: &str = "UXFLOW_POLL_INTERVAL_MS";
/// Environment variable overriding the poll iteration cap.
pub const ENV_MAX_POLLS: &str = "UXFLOW_MAX_POLLS";
/// Environment variable overriding the run timeout in seconds.
pub const ENV_RUN_TIMEOUT_SECS: &str = "UXFLOW_RUN_TIMEOUT_SECS";

/// The static credential attached to compute service calls.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps a key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key for use in a header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns true if no key was configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Compute service base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Credential for the compute service.
    #[serde(default, skip_serializing)]
    pub api_key: ApiKey,
    /// Core used when an artifact does not name one.
    #[serde(default = "default_core_id")]
    pub default_core_id: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: f64,
    /// Budget for a whole run in seconds.
    #[serde(default = "default_run_timeout")]
    pub run_timeout_seconds: f64,
    /// Polling discipline.
    #[serde(default)]
    pub poll: PollConfig,
    /// Endpoint paths.
    #[serde(default)]
    pub endpoints: Endpoints,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

#[allow(clippy::unnecessary_wraps)]
fn default_core_id() -> Option<String> {
    Some(DEFAULT_CORE_ID.to_string())
}

fn default_request_timeout() -> f64 {
    30.0
}

fn default_run_timeout() -> f64 {
    3600.0
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: ApiKey::default(),
            default_core_id: default_core_id(),
            request_timeout_seconds: default_request_timeout(),
            run_timeout_seconds: default_run_timeout(),
            poll: PollConfig::default(),
            endpoints: Endpoints::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with defaults and the given key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: ApiKey::new(api_key),
            ..Self::default()
        }
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Sets the default core. `None` lets the service choose.
    #[must_use]
    pub fn with_default_core_id(mut self, core_id: Option<String>) -> Self {
        self.default_core_id = core_id;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, seconds: f64) -> Self {
        self.request_timeout_seconds = seconds;
        self
    }

    /// Sets the run timeout.
    #[must_use]
    pub fn with_run_timeout(mut self, seconds: f64) -> Self {
        self.run_timeout_seconds = seconds;
        self
    }

    /// Sets the polling discipline.
    #[must_use]
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Sets the endpoint paths.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Per-request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        seconds(self.request_timeout_seconds)
    }

    /// Run timeout as a Duration.
    #[must_use]
    pub fn run_timeout(&self) -> Duration {
        seconds(self.run_timeout_seconds)
    }

    /// Checks the configuration for values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), UxflowError> {
        if self.api_key.is_empty() {
            return Err(UxflowError::Config(format!(
                "no API key configured (set {ENV_API_KEY})"
            )));
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(UxflowError::Config(format!(
                "api_url must be an http(s) URL, got '{}'",
                self.api_url
            )));
        }
        for (name, value) in [
            ("request_timeout_seconds", self.request_timeout_seconds),
            ("run_timeout_seconds", self.run_timeout_seconds),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(UxflowError::Config(format!("{name} must be positive")));
            }
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(UxflowError::Config(format!("{name} is out of range: {value}")));
            }
        }
        self.poll.validate()
    }

    /// Parses a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, UxflowError> {
        serde_json::from_str(json).map_err(|e| UxflowError::Config(e.to_string()))
    }

    /// Loads a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, UxflowError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| UxflowError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Builds a configuration from the process environment.
    pub fn from_env() -> Result<Self, UxflowError> {
        Self::default().apply_env(|key| std::env::var(key).ok())
    }

    /// Overlays environment values obtained through `lookup`.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, UxflowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY) {
            self.api_key = ApiKey::new(key);
        }
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(core) = lookup(ENV_CORE_ID) {
            self.default_core_id = Some(core).filter(|c| !c.is_empty());
        }
        if let Some(ms) = lookup(ENV_POLL_INTERVAL_MS) {
            self.poll.interval_ms = parse_env(ENV_POLL_INTERVAL_MS, &ms)?;
        }
        if let Some(max) = lookup(ENV_MAX_POLLS) {
            self.poll.max_iterations = Some(parse_env(ENV_MAX_POLLS, &max)?);
        }
        if let Some(secs) = lookup(ENV_RUN_TIMEOUT_SECS) {
            self.run_timeout_seconds = parse_env(ENV_RUN_TIMEOUT_SECS, &secs)?;
        }
        Ok(self)
    }
}

/// Unvalidated values saturate instead of panicking.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, UxflowError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| UxflowError::Config(format!("{name}='{value}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.api_url, "https://api.signaloid.io");
        assert_eq!(config.default_core_id.as_deref(), Some(DEFAULT_CORE_ID));
        assert_eq!(config.poll.interval(), Duration::from_secs(2));
        assert_eq!(config.run_timeout(), Duration::from_secs(3600));
    }

    #[test]
    fn test_validate_requires_key() {
        let err = PipelineConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains(ENV_API_KEY));
        assert!(PipelineConfig::new("secret").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = PipelineConfig::new("k").with_api_url("ftp://nope");
        assert!(config.validate().is_err());

        let config = PipelineConfig::new("k").with_run_timeout(0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unrepresentable_timeouts() {
        let config = PipelineConfig::new("k").with_run_timeout(1e20);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("run_timeout_seconds"));
        assert_eq!(config.run_timeout(), Duration::MAX);

        let config = PipelineConfig::new("k").with_request_timeout(f64::MAX);
        assert!(config.validate().is_err());
        assert_eq!(config.request_timeout(), Duration::MAX);
    }

    #[test]
    fn test_huge_env_timeout_fails_validation() {
        let config = PipelineConfig::new("k")
            .apply_env(|k| (k == ENV_RUN_TIMEOUT_SECS).then(|| "1e30".to_string()))
            .unwrap();
        assert!(config.validate().is_err());
        assert!(crate::pipeline::Orchestrator::from_config(config).is_err());
    }

    #[test]
    fn test_api_key_debug_is_redacted() {
        let config = PipelineConfig::new("super-secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("ApiKey(***)"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("super-secret"));
    }

    #[test]
    fn test_apply_env() {
        let vars: HashMap<&str, &str> = [
            (ENV_API_KEY, "k1"),
            (ENV_API_URL, "http://localhost:9000"),
            (ENV_CORE_ID, ""),
            (ENV_POLL_INTERVAL_MS, "250"),
            (ENV_MAX_POLLS, "12"),
        ]
        .into_iter()
        .collect();

        let config = PipelineConfig::default()
            .apply_env(|k| vars.get(k).map(|v| (*v).to_string()))
            .unwrap();

        assert_eq!(config.api_key.expose(), "k1");
        assert_eq!(config.api_url, "http://localhost:9000");
        assert_eq!(config.default_core_id, None);
        assert_eq!(config.poll.interval_ms, 250);
        assert_eq!(config.poll.max_iterations, Some(12));
    }

    #[test]
    fn test_apply_env_rejects_garbage() {
        let err = PipelineConfig::default()
            .apply_env(|k| (k == ENV_MAX_POLLS).then(|| "many".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_POLLS));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"api_url": "http://localhost:1234", "api_key": "abc", "poll": {{"interval_ms": 10}}}}"#
        )
        .unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.api_url, "http://localhost:1234");
        assert_eq!(config.api_key.expose(), "abc");
        assert_eq!(config.poll.interval_ms, 10);
        assert_eq!(config.poll.max_iterations, PollConfig::default().max_iterations);
    }
}
