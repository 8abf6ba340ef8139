use std::env;

/// Default public Judge0 CE endpoint; self-hosted deployments override it
pub const DEFAULT_ENGINE_URL: &str = "https://judge0-ce.p.rapidapi.com";

/// Default interval between verdict polls
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default number of polls before a submission is reported timed out
pub const DEFAULT_POLL_ATTEMPTS: u32 = 10;

/// Configuration for the external execution engine.
///
/// The endpoint and credentials are injected here rather than embedded in the
/// judge: the engine is an external collaborator and deployments point this at
/// their own instance.
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    /// Base URL of the execution engine
    pub engine_url: String,
    /// API key header value, if the engine requires one
    pub api_key: Option<String>,
    /// API host header value, required by hosted gateways
    pub api_host: Option<String>,
    /// Interval between status polls in milliseconds
    pub poll_interval_ms: u64,
    /// Number of polls before giving up
    pub poll_attempts: u32,
}

impl JudgeConfig {
    /// Creates configuration from environment variables
    ///
    /// Optional environment variables:
    /// - `JUDGE_ENGINE_URL`: engine base URL (default: Judge0 CE)
    /// - `JUDGE_API_KEY`: key forwarded as `X-RapidAPI-Key`
    /// - `JUDGE_API_HOST`: host forwarded as `X-RapidAPI-Host`
    /// - `JUDGE_POLL_INTERVAL_MS`: poll interval (default: 1000)
    /// - `JUDGE_POLL_ATTEMPTS`: poll budget (default: 10)
    pub fn from_env() -> Self {
        let engine_url =
            env::var("JUDGE_ENGINE_URL").unwrap_or_else(|_| DEFAULT_ENGINE_URL.to_string());

        let api_key = env::var("JUDGE_API_KEY").ok().filter(|k| !k.is_empty());
        let api_host = env::var("JUDGE_API_HOST").ok().filter(|h| !h.is_empty());

        let poll_interval_ms = env::var("JUDGE_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);

        let poll_attempts = env::var("JUDGE_POLL_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_POLL_ATTEMPTS);

        Self {
            engine_url,
            api_key,
            api_host,
            poll_interval_ms,
            poll_attempts,
        }
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            engine_url: DEFAULT_ENGINE_URL.to_string(),
            api_key: None,
            api_host: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        assert_eq!(DEFAULT_POLL_INTERVAL_MS, 1000);
        assert_eq!(DEFAULT_POLL_ATTEMPTS, 10);

        let config = JudgeConfig::default();
        assert_eq!(config.engine_url, DEFAULT_ENGINE_URL);
        assert!(config.api_key.is_none());
    }
}
