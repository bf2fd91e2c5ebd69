use crate::llm::{GenerationRequest, ModelBackend, ModelFailure};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Mock backend whose answer depends only on the key it is called with.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    outcomes: HashMap<String, Result<String, String>>,
    fallback: Option<String>,
    attempts: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every key without its own script answers with `text`.
    pub(crate) fn always(text: impl Into<String>) -> Self {
        Self {
            fallback: Some(text.into()),
            ..Self::default()
        }
    }

    pub(crate) fn succeed(mut self, key: &str, text: impl Into<String>) -> Self {
        self.outcomes.insert(key.to_string(), Ok(text.into()));
        self
    }

    pub(crate) fn fail(mut self, key: &str, message: impl Into<String>) -> Self {
        self.outcomes.insert(key.to_string(), Err(message.into()));
        self
    }

    pub(crate) fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub(crate) fn last_prompt(&self) -> String {
        self.prompts().pop().unwrap_or_default()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn generate(&self, api_key: &str, request: &GenerationRequest) -> Result<String, ModelFailure> {
        self.attempts.lock().unwrap().push(api_key.to_string());
        self.prompts.lock().unwrap().push(request.prompt().to_string());
        tokio::task::yield_now().await;

        match self.outcomes.get(api_key) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(message)) => Err(ModelFailure::new(message.clone())),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| ModelFailure::new(format!("no script for key {api_key}"))),
        }
    }
}
