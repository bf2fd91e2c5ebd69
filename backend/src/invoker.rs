use crate::credentials::{CredentialPool, mask};
use crate::error::{ForgeError, ForgeResult};
use crate::llm::{GenerationRequest, ModelBackend};
use std::sync::Arc;
use tracing::{debug, warn};

/// How a single failed attempt should be treated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
    /// Plausibly specific to the key used (invalid key, quota, rate limit):
    /// move on to the next key.
    TransientAuth,
    /// Anything else: stop and report.
    Fatal,
}

/// Best-effort heuristic over upstream error text. All matching rules live here.
/// Matching is case-sensitive: "API key" is how upstream phrases key errors.
pub fn classify_failure(message: &str) -> FailureClass {
    if message.contains("API key") || message.contains("quota") || message.contains("429") {
        FailureClass::TransientAuth
    } else {
        FailureClass::Fatal
    }
}

/// Runs a request against each key of a pool in rotation until one succeeds.
#[derive(Clone)]
pub struct ResilientInvoker {
    backend: Arc<dyn ModelBackend>,
}

impl ResilientInvoker {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self { backend }
    }

    /// Tries keys starting at `start_index`, wrapping around. No delay
    /// between attempts.
    pub async fn invoke(
        &self,
        raw_keys: &str,
        request: &GenerationRequest,
        start_index: usize,
    ) -> ForgeResult<String> {
        if raw_keys.trim().is_empty() {
            return Err(ForgeError::Configuration(
                "Please provide an API key in the settings.".to_string(),
            ));
        }
        let pool = CredentialPool::parse(raw_keys);
        if pool.is_empty() {
            return Err(ForgeError::Configuration(
                "No valid API key found in the settings.".to_string(),
            ));
        }

        let mut attempts = 0;
        let mut last_error = None;
        for key in pool.rotated(start_index) {
            attempts += 1;
            debug!(key = %mask(key), schema = request.schema_name(), "Calling model");
            match self.backend.generate(key, request).await {
                Ok(text) => return Ok(text),
                Err(failure) => match classify_failure(&failure.message) {
                    FailureClass::TransientAuth => {
                        warn!(
                            "API key {} failed, trying the next one. Error: {}",
                            mask(key),
                            failure.message
                        );
                        last_error = Some(failure.message);
                    }
                    FailureClass::Fatal => return Err(ForgeError::Fatal(failure.message)),
                },
            }
        }

        Err(ForgeError::AllCredentialsExhausted {
            attempts,
            last_error: last_error.unwrap_or_else(|| "unknown error".to_string()),
        })
    }
}
