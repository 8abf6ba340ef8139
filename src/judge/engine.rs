use std::time::Duration;

use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use super::config::JudgeConfig;
use crate::error::{DuelError, Result};

/// Engine status ids: 1 = in queue, 2 = processing, 3 = accepted run,
/// 4 = wrong answer, 5 = time limit, 6 = compilation error, 7+ = runtime
/// and internal errors. Anything past "processing" is terminal.
const STATUS_PROCESSING: u32 = 2;
const STATUS_COMPILATION_ERROR: u32 = 6;

#[derive(Debug, Serialize)]
struct SubmissionRequest<'a> {
    source_code: &'a str,
    language_id: u32,
    stdin: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmissionToken {
    token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineStatus {
    pub id: u32,
    pub description: String,
}

/// A polled snapshot of a submission's state on the engine
#[derive(Debug, Clone, Deserialize)]
pub struct EngineResult {
    pub status: EngineStatus,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
}

impl EngineResult {
    pub fn is_terminal(&self) -> bool {
        self.status.id > STATUS_PROCESSING
    }

    /// Compile or runtime failure inside the submitted code
    pub fn is_execution_error(&self) -> bool {
        self.status.id >= STATUS_COMPILATION_ERROR
    }

    pub fn diagnostic(&self) -> String {
        self.compile_output
            .clone()
            .or_else(|| self.stderr.clone())
            .unwrap_or_else(|| self.status.description.clone())
    }
}

/// Client for the external code-execution engine.
///
/// Speaks the submit-then-poll protocol: a submission yields an opaque token,
/// which is polled at a fixed interval until a terminal status or the attempt
/// budget runs out.
pub struct ExecutionEngine {
    client: reqwest::Client,
    config: JudgeConfig,
}

impl ExecutionEngine {
    pub fn new(config: JudgeConfig) -> Self {
        tracing::info!(
            engine_url = %config.engine_url,
            poll_interval_ms = config.poll_interval_ms,
            poll_attempts = config.poll_attempts,
            "Execution engine client initialized"
        );
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn apply_headers(&self, request: RequestBuilder) -> RequestBuilder {
        let mut request = request;
        if let Some(key) = &self.config.api_key {
            request = request.header("X-RapidAPI-Key", key);
        }
        if let Some(host) = &self.config.api_host {
            request = request.header("X-RapidAPI-Host", host);
        }
        request
    }

    /// Submit source for execution; returns the engine's opaque token
    pub async fn submit(&self, source: &str, language_id: u32, stdin: &str) -> Result<String> {
        let url = format!(
            "{}/submissions?base64_encoded=false&wait=false",
            self.config.engine_url
        );
        let body = SubmissionRequest {
            source_code: source,
            language_id,
            stdin,
        };

        let response = self
            .apply_headers(self.client.post(&url))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DuelError::execution(format!(
                "engine rejected submission: {}",
                response.status()
            )));
        }

        let token: SubmissionToken = response.json().await?;
        tracing::debug!(token = %token.token, "Submission queued on engine");
        Ok(token.token)
    }

    /// Fetch the current state of a queued submission
    pub async fn fetch(&self, token: &str) -> Result<EngineResult> {
        let url = format!(
            "{}/submissions/{}?base64_encoded=false&fields=status,stdout,stderr,compile_output",
            self.config.engine_url, token
        );

        let response = self.apply_headers(self.client.get(&url)).send().await?;

        if !response.status().is_success() {
            return Err(DuelError::execution(format!(
                "engine status fetch failed: {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    /// Poll until a terminal verdict or the attempt budget is exhausted
    pub async fn await_verdict(&self, token: &str) -> Result<EngineResult> {
        for attempt in 1..=self.config.poll_attempts {
            let result = self.fetch(token).await?;
            if result.is_terminal() {
                tracing::debug!(
                    token = %token,
                    attempt = attempt,
                    status = %result.status.description,
                    "Terminal verdict received"
                );
                return Ok(result);
            }
            tracing::debug!(token = %token, attempt = attempt, "Verdict pending");
            sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
        }

        Err(DuelError::ExecutionTimeout(format!(
            "no verdict after {} polls",
            self.config.poll_attempts
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with_status(id: u32, description: &str) -> EngineResult {
        EngineResult {
            status: EngineStatus {
                id,
                description: description.to_string(),
            },
            stdout: None,
            stderr: None,
            compile_output: None,
        }
    }

    #[test]
    fn test_queued_and_processing_are_not_terminal() {
        assert!(!result_with_status(1, "In Queue").is_terminal());
        assert!(!result_with_status(2, "Processing").is_terminal());
        assert!(result_with_status(3, "Accepted").is_terminal());
        assert!(result_with_status(4, "Wrong Answer").is_terminal());
    }

    #[test]
    fn test_error_statuses() {
        assert!(!result_with_status(3, "Accepted").is_execution_error());
        assert!(!result_with_status(4, "Wrong Answer").is_execution_error());
        assert!(result_with_status(6, "Compilation Error").is_execution_error());
        assert!(result_with_status(11, "Runtime Error (NZEC)").is_execution_error());
    }

    #[test]
    fn test_diagnostic_prefers_compiler_output() {
        let mut result = result_with_status(6, "Compilation Error");
        result.compile_output = Some("expected `;`".to_string());
        result.stderr = Some("ignored".to_string());
        assert_eq!(result.diagnostic(), "expected `;`");

        let mut result = result_with_status(11, "Runtime Error");
        result.stderr = Some("index out of range".to_string());
        assert_eq!(result.diagnostic(), "index out of range");

        let result = result_with_status(5, "Time Limit Exceeded");
        assert_eq!(result.diagnostic(), "Time Limit Exceeded");
    }
}
