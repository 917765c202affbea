use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs, ResponseFormat,
        ResponseFormatJsonSchema,
    },
    Client,
};
use log::debug;
use serde_json::Value;
use tokio::time::{timeout, Duration};

use crate::config::Config;
use crate::error::ModelError;

pub type OpenAiClient = Client<OpenAIConfig>;

pub fn build_client(cfg: &Config) -> OpenAiClient {
    let mut openai_config = OpenAIConfig::default().with_api_key(&cfg.api_key);
    if let Some(api_base) = &cfg.api_base {
        openai_config = openai_config.with_api_base(api_base);
    }
    Client::with_config(openai_config)
}

/// Connection details shared by everything that talks to the hosted model.
#[derive(Clone)]
pub struct ModelHandle {
    pub client: OpenAiClient,
    pub model: String,
    pub timeout_secs: u64,
}

impl ModelHandle {
    pub fn from_config(cfg: &Config) -> Self {
        ModelHandle {
            client: build_client(cfg),
            model: cfg.model.clone(),
            timeout_secs: cfg.request_timeout_secs,
        }
    }

    pub fn request(
        &self,
        system_prompt: String,
        user_prompt: String,
        max_tokens: u32,
        schema: Option<(&str, Value)>,
    ) -> Result<CreateChatCompletionRequest, ModelError> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages([
                ChatCompletionRequestSystemMessage::from(system_prompt).into(),
                ChatCompletionRequestUserMessage::from(user_prompt).into(),
            ])
            .max_tokens(max_tokens);

        if let Some((name, schema)) = schema {
            args.response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: None,
                    name: name.to_string(),
                    schema: Some(schema),
                    strict: Some(true),
                },
            });
        }

        args.build().map_err(|e| ModelError::BuildRequest(e.to_string()))
    }

    /// Send `request` and return the first non-empty message content.
    pub async fn complete(&self, request: CreateChatCompletionRequest) -> Result<String, ModelError> {
        debug!(
            "Calling model {} with {}s timeout",
            self.model, self.timeout_secs
        );
        let start_time = std::time::Instant::now();

        let response = match timeout(
            Duration::from_secs(self.timeout_secs),
            self.client.chat().create(request),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(api_error)) => {
                debug!("Model API returned error: {:?}", api_error);
                return Err(ModelError::ModelCall(api_error.to_string()));
            }
            Err(_elapsed) => {
                debug!("Model call timed out after {:?}", start_time.elapsed());
                return Err(ModelError::Timeout(self.timeout_secs));
            }
        };
        debug!("Model call completed in {:?}", start_time.elapsed());

        response
            .choices
            .into_iter()
            .filter_map(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .find(|content| !content.is_empty())
            .ok_or(ModelError::EmptyResponse)
    }
}
