//! Generation client: bounded retry around a [`TextGenerator`] backend.
//!
//! Each call makes at most `max_attempts` attempts with the same prompt. An
//! attempt fails on a backend error or when it exceeds `attempt_timeout`;
//! retryable failures are followed by an exponential backoff sleep.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use docsmith_core::config::GenerationConfig;
use docsmith_renderer::TemplateId;

use crate::error::{GenerateError, GenerationUnavailable};

/// A prompt ready to send, tagged with the template that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub template: TemplateId,
    pub prompt: String,
}

/// Opaque prompt-in/text-out capability.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerateError>;
}

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    /// Delay after the first failure; doubled after each subsequent one.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&GenerationConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            attempt_timeout: Duration::from_secs(config.attempt_timeout_secs),
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }

    /// Sleep before attempt `failed + 1`, after `failed` failures.
    pub fn delay_after(&self, failed: u32) -> Duration {
        let exp = failed.saturating_sub(1).min(16);
        self.backoff.saturating_mul(1u32 << exp)
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    GiveUp(GenerationUnavailable),
}

/// Attempt bookkeeping for one generation call.
#[derive(Debug, Clone, Default)]
pub struct RetryState {
    attempts: u32,
    last_error: Option<GenerateError>,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> Option<&GenerateError> {
        self.last_error.as_ref()
    }

    /// Record a failed attempt and decide whether to try again.
    pub fn record_failure(&mut self, err: GenerateError, policy: &RetryPolicy) -> RetryDecision {
        self.attempts += 1;
        let retry = err.is_retryable() && self.attempts < policy.max_attempts;
        self.last_error = Some(err.clone());
        if retry {
            RetryDecision::Retry {
                delay: policy.delay_after(self.attempts),
            }
        } else {
            RetryDecision::GiveUp(GenerationUnavailable {
                attempts: self.attempts,
                last: err,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Retrying front for a [`TextGenerator`].
#[derive(Clone)]
pub struct GenerationClient {
    backend: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn TextGenerator>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Generate raw text for `request`, retrying per the policy.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<String, GenerationUnavailable> {
        let mut state = RetryState::new();
        loop {
            let attempt = state.attempts() + 1;
            let outcome =
                match tokio::time::timeout(self.policy.attempt_timeout, self.backend.generate(request))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(GenerateError::Timeout {
                        after: self.policy.attempt_timeout,
                    }),
                };

            let err = match outcome {
                Ok(text) => {
                    tracing::debug!(template = %request.template, attempt, chars = text.len(), "generation succeeded");
                    return Ok(text);
                }
                Err(err) => err,
            };

            tracing::warn!(template = %request.template, attempt, reason = %err, "generation attempt failed");
            match state.record_failure(err, &self.policy) {
                RetryDecision::Retry { delay } => tokio::time::sleep(delay).await,
                RetryDecision::GiveUp(unavailable) => {
                    tracing::error!(template = %request.template, attempts = unavailable.attempts, "giving up on generation");
                    return Err(unavailable);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{ScriptedGenerator, ScriptedReply};

    fn request() -> GenerationRequest {
        GenerationRequest {
            template: TemplateId::Scaffold,
            prompt: "write a readme".to_string(),
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(120),
            backoff: Duration::from_secs(1),
        }
    }

    fn transport() -> GenerateError {
        GenerateError::Transport { message: "connection reset".into() }
    }

    #[test]
    fn backoff_doubles() {
        let p = policy();
        assert_eq!(p.delay_after(1), Duration::from_secs(1));
        assert_eq!(p.delay_after(2), Duration::from_secs(2));
        assert_eq!(p.delay_after(3), Duration::from_secs(4));
    }

    #[test]
    fn retry_state_gives_up_after_max_attempts() {
        let p = policy();
        let mut state = RetryState::new();
        assert!(matches!(state.record_failure(transport(), &p), RetryDecision::Retry { .. }));
        assert!(matches!(state.record_failure(transport(), &p), RetryDecision::Retry { .. }));
        match state.record_failure(transport(), &p) {
            RetryDecision::GiveUp(u) => assert_eq!(u.attempts, 3),
            other => panic!("expected give up, got {other:?}"),
        }
    }

    #[test]
    fn auth_error_gives_up_immediately() {
        let mut state = RetryState::new();
        let decision = state.record_failure(GenerateError::Auth { status: 401 }, &policy());
        assert!(matches!(decision, RetryDecision::GiveUp(GenerationUnavailable { attempts: 1, .. })));
    }

    #[test]
    fn status_classification() {
        let status = |s| GenerateError::Status { status: s, body: String::new() };
        assert!(status(429).is_retryable());
        assert!(status(503).is_retryable());
        assert!(status(408).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!status(404).is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let backend = Arc::new(ScriptedGenerator::new([
            ScriptedReply::Fail(transport()),
            ScriptedReply::Fail(GenerateError::Status { status: 502, body: "bad gateway".into() }),
            ScriptedReply::Text("# ok".into()),
        ]));
        let client = GenerationClient::new(backend.clone(), policy());
        let text = client.generate(&request()).await.expect("third attempt succeeds");
        assert_eq!(text, "# ok");
        assert_eq!(backend.calls(), 3);
        assert!(backend.prompts().iter().all(|p| p == "write a readme"), "same prompt every attempt");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_counts_as_retryable_failure() {
        let backend = Arc::new(ScriptedGenerator::new([
            ScriptedReply::Hang,
            ScriptedReply::Text("# ok".into()),
        ]));
        let client = GenerationClient::new(backend.clone(), policy());
        let text = client.generate(&request()).await.expect("second attempt succeeds");
        assert_eq!(text, "# ok");
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_three_failures() {
        let backend = Arc::new(ScriptedGenerator::new([
            ScriptedReply::Fail(transport()),
            ScriptedReply::Fail(transport()),
            ScriptedReply::Fail(transport()),
            ScriptedReply::Text("never reached".into()),
        ]));
        let client = GenerationClient::new(backend.clone(), policy());
        let err = client.generate(&request()).await.unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(backend.calls(), 3);
    }
}
