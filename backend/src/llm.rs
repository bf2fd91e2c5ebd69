use crate::error::{ForgeError, ForgeResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// A prompt plus the JSON shape the model has to answer with.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    prompt: String,
    schema_name: &'static str,
    schema: serde_json::Value,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, schema_name: &'static str, schema: serde_json::Value) -> Self {
        Self {
            prompt: prompt.into(),
            schema_name,
            schema,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn schema_name(&self) -> &'static str {
        self.schema_name
    }

    pub fn schema(&self) -> &serde_json::Value {
        &self.schema
    }
}

/// One failed attempt against one key, carrying the upstream message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ModelFailure {
    pub message: String,
}

impl ModelFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Runs one request with one key and returns the raw response text.
    async fn generate(&self, api_key: &str, request: &GenerationRequest) -> Result<String, ModelFailure>;
}

/// Parses model output as JSON, tolerating a surrounding Markdown fence.
/// The raw text goes to the error log, never to the caller.
pub fn parse_model_json<T: DeserializeOwned>(raw: &str, context: &'static str) -> ForgeResult<T> {
    serde_json::from_str(strip_code_fence(raw)).map_err(|e| {
        tracing::error!(context = %context, raw = %raw, "Failed to parse model JSON: {}", e);
        ForgeError::malformed(context, raw)
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    match body.split_once('\n') {
        Some((_, inner)) => inner.trim(),
        None => body.trim(),
    }
}
