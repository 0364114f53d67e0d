use std::time::Duration;
use async_trait::async_trait;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;
use crate::request::{GenerationRequest, GenerationResponse, Usage};

const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";
const PROVIDER: &str = "openrouter";

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: String
  , #[serde(default)]
    pub content: Option<String>
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , pub max_tokens: u32
  , pub temperature: f32
  , pub stream: bool
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse
{   #[serde(default)]
    pub model: Option<String>
  , #[serde(default)]
    pub choices: Vec<Choice>
  , #[serde(default)]
    pub usage: Option<ChatUsage>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   #[serde(default)]
    pub message: Option<ChatMessage>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatUsage
{   pub prompt_tokens: Option<u32>
  , pub completion_tokens: Option<u32>
  , pub total_tokens: Option<u32>
}

// ===== Adapter =====

/// OpenAI-compatible chat completions through OpenRouter
///
/// The system instruction travels as a leading `system` message and
/// `model_hint` replaces the configured model.
#[derive(Debug, Clone)]
pub struct OpenRouterAdapter
{   http_client: reqwest::Client
  , model: String
  , api_key: Option<String>
  , api_base: String
  , timeout: Option<Duration>
}

impl OpenRouterAdapter
{   pub fn new(http_client: reqwest::Client, model: String) -> Self
    {   debug!("Creating OpenRouterAdapter for {}", model);
        OpenRouterAdapter
        {   http_client
          , model
          , api_key: None
          , api_base: OPENROUTER_API_BASE.to_string()
          , timeout: None
        }
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self
    {   self.api_key = key;
        self
    }

    pub fn with_api_base(mut self, base: Option<String>) -> Self
    {   if let Some(base) = base
        {   self.api_base = base.trim_end_matches('/').to_string();
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self
    {   self.timeout = timeout;
        self
    }

    fn effective_model(&self, request: &GenerationRequest) -> String
    {   request.model_hint
          .as_deref()
          .filter(|hint| !hint.trim().is_empty())
          .unwrap_or(&self.model)
          .to_string()
    }

    /// Build the wire payload
    pub fn translate(&self, request: &GenerationRequest) -> ChatRequest
    {   let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_instruction
        {   messages.push(ChatMessage
            {   role: "system".to_string()
              , content: Some(system.clone())
            });
        }
        messages.push(ChatMessage
        {   role: "user".to_string()
          , content: Some(request.prompt.clone())
        });

        ChatRequest
        {   model: self.effective_model(request)
          , messages
          , max_tokens: request.max_tokens
          , temperature: request.temperature
          , stream: false
        }
    }

    /// Parse a 2xx reply body
    pub fn parse(
      &self
    , body: &str
    , requested_model: &str
    ) -> Result<GenerationResponse, AdapterError>
    {   let reply: ChatResponse = super::decode(PROVIDER, body)?;
        let content = reply.choices
          .into_iter()
          .next()
          .and_then(|c| c.message)
          .and_then(|m| m.content);
        let usage = reply.usage.map(|u| Usage
        {   prompt_tokens: u.prompt_tokens
          , completion_tokens: u.completion_tokens
          , total_tokens: u.total_tokens
        });
        Ok(GenerationResponse::new(
          content
        , reply.model.unwrap_or_else(|| requested_model.to_string())
        , usage
        ))
    }
}

#[async_trait]
impl super::ProviderAdapter for OpenRouterAdapter
{   fn provider(&self) -> &str
    {   PROVIDER
    }

    fn model(&self) -> &str
    {   &self.model
    }

    async fn generate(
      &self
    , request: &GenerationRequest
    ) -> Result<GenerationResponse, AdapterError>
    {   let api_key = self.api_key.as_deref().ok_or_else(|| {
          AdapterError::configuration(
            PROVIDER
          , "OPENROUTER_API_KEY is not set"
          )
        })?;

        let payload = self.translate(request);
        trace!("OpenRouter request: {:?}", payload);

        let mut call = self.http_client
          .post(format!("{}/chat/completions", self.api_base))
          .bearer_auth(api_key)
          .json(&payload);
        if let Some(timeout) = self.timeout
        {   call = call.timeout(timeout);
        }

        let body = super::send(PROVIDER, call).await?;
        self.parse(&body, &payload.model)
    }
}
