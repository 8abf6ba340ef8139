mod config;
mod engine;

pub use config::JudgeConfig;
pub use engine::ExecutionEngine;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::arena::LifecycleManager;
use crate::error::{DuelError, Result};
use crate::store::{CompleteOutcome, DuelStatus, DuelStore, ProblemBank};

/// Languages the arena accepts, mapped to engine language ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportedLanguage {
    Python,
    Javascript,
    Cpp,
    Java,
}

impl SupportedLanguage {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "python" => Some(SupportedLanguage::Python),
            "javascript" => Some(SupportedLanguage::Javascript),
            "cpp" => Some(SupportedLanguage::Cpp),
            "java" => Some(SupportedLanguage::Java),
            _ => None,
        }
    }

    pub fn engine_id(&self) -> u32 {
        match self {
            SupportedLanguage::Python => 71,
            SupportedLanguage::Javascript => 63,
            SupportedLanguage::Cpp => 54,
            SupportedLanguage::Java => 62,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerdictStatus {
    Accepted,
    Rejected,
    AlreadyDecided,
    ExecutionError,
}

/// Verdict payload returned to the submitting client
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeReport {
    pub status: VerdictStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub produced: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
}

/// Strip all whitespace so formatting differences never decide a duel
pub fn normalize_output(output: &str) -> String {
    output.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Judges submissions against the external execution engine and claims the
/// win through the lifecycle manager. An errored or timed-out submission
/// leaves the duel exactly as it was.
pub struct SubmissionJudge {
    engine: ExecutionEngine,
    lifecycle: Arc<LifecycleManager>,
    store: Arc<DuelStore>,
}

impl SubmissionJudge {
    pub fn new(
        engine: ExecutionEngine,
        lifecycle: Arc<LifecycleManager>,
        store: Arc<DuelStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            engine,
            lifecycle,
            store,
        })
    }

    pub async fn judge(
        &self,
        duel_id: &str,
        submitter: &str,
        source: &str,
        language: &str,
    ) -> Result<JudgeReport> {
        let language = SupportedLanguage::parse(language).ok_or_else(|| {
            DuelError::validation(format!("unsupported language: {}", language))
        })?;

        let duel = self
            .store
            .get(duel_id)
            .await
            .ok_or_else(|| DuelError::not_found(format!("Duel {}", duel_id)))?;

        if duel.status == DuelStatus::Completed {
            return Err(DuelError::StateConflict(
                "duel already decided".to_string(),
            ));
        }

        let question = duel
            .questions
            .first()
            .ok_or_else(|| DuelError::internal("duel has no questions"))?;
        let problem = ProblemBank::get(question)
            .ok_or_else(|| DuelError::internal(format!("no problem for {}", question)))?;

        tracing::info!(
            duel_id = %duel_id,
            submitter = %submitter,
            problem = %problem.title,
            "Submitting code to execution engine"
        );

        let token = self
            .engine
            .submit(source, language.engine_id(), problem.stdin)
            .await?;
        let result = self.engine.await_verdict(&token).await?;

        if result.is_execution_error() {
            return Ok(JudgeReport {
                status: VerdictStatus::ExecutionError,
                winner: None,
                message: result.diagnostic(),
                produced: None,
                expected: None,
            });
        }

        let produced = result.stdout.unwrap_or_default();
        if normalize_output(&produced) == normalize_output(problem.expected_output) {
            match self.lifecycle.complete(duel_id, submitter).await {
                CompleteOutcome::Won => Ok(JudgeReport {
                    status: VerdictStatus::Accepted,
                    winner: Some(submitter.to_string()),
                    message: "Correct! You won the duel.".to_string(),
                    produced: None,
                    expected: None,
                }),
                CompleteOutcome::AlreadyDecided => Ok(JudgeReport {
                    status: VerdictStatus::AlreadyDecided,
                    winner: None,
                    message: "Correct, but the duel was already decided.".to_string(),
                    produced: None,
                    expected: None,
                }),
                CompleteOutcome::NotFound => Err(DuelError::not_found(format!(
                    "Duel {}",
                    duel_id
                ))),
            }
        } else {
            tracing::info!(
                duel_id = %duel_id,
                submitter = %submitter,
                "Incorrect submission"
            );
            Ok(JudgeReport {
                status: VerdictStatus::Rejected,
                winner: None,
                message: "Incorrect output. Try again.".to_string(),
                produced: Some(produced),
                expected: Some(problem.expected_output.to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_all_whitespace() {
        assert_eq!(normalize_output("[0,1]\n"), "[0,1]");
        assert_eq!(normalize_output(" [0, 1] "), "[0,1]");
        assert_eq!(normalize_output("[0,\t1]\r\n"), "[0,1]");
        // Non-whitespace differences still differ
        assert_ne!(normalize_output("[0,1]"), normalize_output("[0,2]"));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_output(" [0, 1] ");
        assert_eq!(normalize_output(&once), once);
    }

    #[test]
    fn test_language_set_is_fixed() {
        assert_eq!(SupportedLanguage::parse("python"), Some(SupportedLanguage::Python));
        assert_eq!(SupportedLanguage::parse("cpp"), Some(SupportedLanguage::Cpp));
        assert_eq!(SupportedLanguage::parse("brainfuck"), None);
        assert_eq!(SupportedLanguage::parse("Python"), None);
    }

    #[test]
    fn test_engine_language_ids() {
        assert_eq!(SupportedLanguage::Python.engine_id(), 71);
        assert_eq!(SupportedLanguage::Javascript.engine_id(), 63);
        assert_eq!(SupportedLanguage::Cpp.engine_id(), 54);
        assert_eq!(SupportedLanguage::Java.engine_id(), 62);
    }

    #[test]
    fn test_report_serialization_omits_empty_fields() {
        let report = JudgeReport {
            status: VerdictStatus::Accepted,
            winner: Some("a@x.com".to_string()),
            message: "Correct! You won the duel.".to_string(),
            produced: None,
            expected: None,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""status":"accepted""#));
        assert!(json.contains(r#""winner":"a@x.com""#));
        assert!(!json.contains("produced"));
    }
}
