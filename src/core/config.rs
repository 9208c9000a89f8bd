use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::PlannerError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:18080/api";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Overall request timeout. `None` leaves hung connections to the transport.
    pub timeout: Option<Duration>,
    /// Where the credential store persists keys. `None` keeps them in memory.
    pub keys_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            keys_file: None,
        }
    }
}

impl ClientConfig {
    /// Builds a config from the defaults, overridden by any of
    /// `TRIP_PLANNER_API_BASE`, `TRIP_PLANNER_TIMEOUT_SECS` and `TRIP_PLANNER_KEYS_FILE`.
    ///
    /// # Errors
    ///
    /// Returns `PlannerError::Config` if the timeout is not a whole number of seconds.
    pub fn from_env() -> Result<Self, PlannerError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, PlannerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(base_url) = lookup("TRIP_PLANNER_API_BASE").filter(|v| !v.trim().is_empty()) {
            config.base_url = base_url.trim().to_string();
        }

        if let Some(raw) = lookup("TRIP_PLANNER_TIMEOUT_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|e| PlannerError::Config(format!("TRIP_PLANNER_TIMEOUT_SECS: {e}")))?;
            config.timeout = Some(Duration::from_secs(secs));
        }

        config.keys_file = lookup("TRIP_PLANNER_KEYS_FILE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(config)
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_keys_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.keys_file = Some(path.into());
        self
    }

    /// Validates `base_url` and returns it without a trailing slash.
    ///
    /// # Errors
    ///
    /// Returns `PlannerError::Config` if the URL does not parse or is not http(s).
    pub fn normalized_base_url(&self) -> Result<String, PlannerError> {
        let parsed = url::Url::parse(&self.base_url)
            .map_err(|e| PlannerError::Config(format!("base_url {:?}: {e}", self.base_url)))?;

        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(PlannerError::Config(format!(
                    "base_url must be http or https, got {other}"
                )));
            }
        }

        Ok(self.base_url.trim_end_matches('/').to_string())
    }
}
