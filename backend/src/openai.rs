use crate::llm::{GenerationRequest, ModelBackend, ModelFailure};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use shared::models::ModelSettings;

/// Talks to any OpenAI-compatible chat completions endpoint. Gemini's
/// compatibility layer is the default.
#[derive(Clone, Debug)]
pub struct OpenAiBackend {
    settings: ModelSettings,
}

impl OpenAiBackend {
    pub fn new(settings: ModelSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }
}

/// The system turn pins the output to a single JSON document of the given shape.
fn contract_prompt(request: &GenerationRequest) -> String {
    let schema = serde_json::to_string_pretty(request.schema())
        .unwrap_or_else(|_| request.schema().to_string());
    format!(
        "Respond with a single valid JSON document and nothing else: no commentary, \
         no Markdown. The document ({}) must conform to this JSON Schema:\n{}",
        request.schema_name(),
        schema
    )
}

fn build_conversation(
    request: &GenerationRequest,
) -> Result<Vec<ChatCompletionRequestMessage>, ModelFailure> {
    let system = ChatCompletionRequestSystemMessageArgs::default()
        .content(contract_prompt(request))
        .build()
        .map_err(|e| ModelFailure::new(format!("Failed to build system message: {}", e)))?;
    let user = ChatCompletionRequestUserMessageArgs::default()
        .content(request.prompt().to_string())
        .build()
        .map_err(|e| ModelFailure::new(format!("Failed to build user message: {}", e)))?;

    Ok(vec![
        ChatCompletionRequestMessage::System(system),
        ChatCompletionRequestMessage::User(user),
    ])
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    async fn generate(&self, api_key: &str, request: &GenerationRequest) -> Result<String, ModelFailure> {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(self.settings.api_base.clone());
        let client = Client::with_config(config);

        let completion = CreateChatCompletionRequestArgs::default()
            .model(self.settings.model.clone())
            .messages(build_conversation(request)?)
            .temperature(self.settings.temperature)
            .max_tokens(self.settings.max_tokens)
            .build()
            .map_err(|e| ModelFailure::new(format!("Failed to build completion request: {}", e)))?;

        let response = client
            .chat()
            .create(completion)
            .await
            .map_err(|e| ModelFailure::new(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ModelFailure::new("Model returned an empty response"))
    }
}
