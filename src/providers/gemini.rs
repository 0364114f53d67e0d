use std::time::Duration;
use async_trait::async_trait;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;
use crate::request::{GenerationRequest, GenerationResponse, Usage};

const GEMINI_API_BASE: &str =
  "https://generativelanguage.googleapis.com/v1";
const PROVIDER: &str = "gemini";

// ===== Wire Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part
{   #[serde(default)]
    pub text: Option<String>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content
{   #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>
  , #[serde(default)]
    pub parts: Vec<Part>
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig
{   pub temperature: f32
  , pub max_output_tokens: u32
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest
{   pub contents: Vec<Content>
  , pub generation_config: GenerationConfig
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse
{   #[serde(default)]
    pub candidates: Vec<Candidate>
  , #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>
  , #[serde(default)]
    pub model_version: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate
{   #[serde(default)]
    pub content: Option<Content>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata
{   pub prompt_token_count: Option<u32>
  , pub candidates_token_count: Option<u32>
  , pub total_token_count: Option<u32>
}

// ===== Adapter =====

/// Google Gemini `generateContent`
///
/// Gemini takes a single user turn here, so the system instruction is
/// prepended to the prompt on its own line. `model_hint` is honoured
/// only when it names a Gemini model.
#[derive(Debug, Clone)]
pub struct GeminiAdapter
{   http_client: reqwest::Client
  , model: String
  , api_key: Option<String>
  , api_base: String
  , timeout: Option<Duration>
}

impl GeminiAdapter
{   pub fn new(http_client: reqwest::Client, model: String) -> Self
    {   debug!("Creating GeminiAdapter for {}", model);
        GeminiAdapter
        {   http_client
          , model
          , api_key: None
          , api_base: GEMINI_API_BASE.to_string()
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
    {   match request.model_hint.as_deref()
        {   Some(hint) if hint.starts_with("gemini") => hint.to_string()
          , _ => self.model.clone()
        }
    }

    /// Build the wire payload
    pub fn translate(
      &self
    , request: &GenerationRequest
    ) -> GenerateContentRequest
    {   let text = match &request.system_instruction
        {   Some(system) => format!("{}\n{}", system, request.prompt)
          , None => request.prompt.clone()
        };
        GenerateContentRequest
        {   contents: vec![
              Content
              {   role: Some("user".to_string())
                , parts: vec![Part { text: Some(text) }]
              }
            ]
          , generation_config: GenerationConfig
            {   temperature: request.temperature
              , max_output_tokens: request.max_tokens
            }
        }
    }

    /// Parse a 2xx reply body
    pub fn parse(
      &self
    , body: &str
    , requested_model: &str
    ) -> Result<GenerationResponse, AdapterError>
    {   let reply: GenerateContentResponse
          = super::decode(PROVIDER, body)?;
        let content = reply.candidates
          .into_iter()
          .next()
          .and_then(|c| c.content)
          .and_then(|c| c.parts.into_iter().next())
          .and_then(|p| p.text);
        let usage = reply.usage_metadata.map(|u| Usage
        {   prompt_tokens: u.prompt_token_count
          , completion_tokens: u.candidates_token_count
          , total_tokens: u.total_token_count
        });
        Ok(GenerationResponse::new(
          content
        , reply.model_version
            .unwrap_or_else(|| requested_model.to_string())
        , usage
        ))
    }
}

#[async_trait]
impl super::ProviderAdapter for GeminiAdapter
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
          , "GOOGLE_GEMINI_API_KEY is not set"
          )
        })?;

        let model = self.effective_model(request);
        let payload = self.translate(request);
        trace!("Gemini request for {}: {:?}", model, payload);

        let mut call = self.http_client
          .post(format!(
            "{}/models/{}:generateContent",
            self.api_base,
            model
          ))
          .query(&[("key", api_key)])
          .json(&payload);
        if let Some(timeout) = self.timeout
        {   call = call.timeout(timeout);
        }

        let body = super::send(PROVIDER, call).await?;
        self.parse(&body, &model)
    }
}
