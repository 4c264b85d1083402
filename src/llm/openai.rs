use crate::llm::client::CompletionClient;
use crate::types::GenerationError;
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;

const PROVIDER: &str = "OpenAI";

pub struct OpenAIClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIClient {
    pub fn new(api_key: String, api_base: String, model: String) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);

        Self {
            client: Client::with_config(config),
            model,
        }
    }

    fn provider_error(e: OpenAIError) -> GenerationError {
        GenerationError::Provider {
            provider: PROVIDER.to_string(),
            reason: e.to_string(),
        }
    }

    fn messages(
        system: &str,
        prompt: &str,
    ) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
        Ok(vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()?
                .into(),
        ])
    }
}

#[async_trait]
impl CompletionClient for OpenAIClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, GenerationError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(Self::messages(system, prompt).map_err(Self::provider_error)?)
            .build()
            .map_err(Self::provider_error)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(Self::provider_error)?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::EmptyResponse(PROVIDER.to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
