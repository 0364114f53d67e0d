use std::time::Duration;
use async_trait::async_trait;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_OLLAMA_BASE;
use crate::error::AdapterError;
use crate::request::{GenerationRequest, GenerationResponse, Usage};

const PROVIDER: &str = "ollama";

#[derive(Debug, Clone, Serialize)]
pub struct GenerateOptions
{   pub temperature: f32
  , pub num_predict: u32
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest
{   pub model: String
  , pub prompt: String
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>
  , pub stream: bool
  , pub options: GenerateOptions
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse
{   #[serde(default)]
    pub response: Option<String>
  , #[serde(default)]
    pub prompt_eval_count: Option<u32>
  , #[serde(default)]
    pub eval_count: Option<u32>
}

/// Local Ollama server, used as the degraded-mode fallback
///
/// No credential. Ignores `model_hint`, which names models in another
/// provider's namespace.
#[derive(Debug, Clone)]
pub struct OllamaAdapter
{   http_client: reqwest::Client
  , model: String
  , api_base: String
  , timeout: Option<Duration>
}

impl OllamaAdapter
{   pub fn new(http_client: reqwest::Client, model: String) -> Self
    {   debug!("Creating OllamaAdapter for {}", model);
        OllamaAdapter
        {   http_client
          , model
          , api_base: DEFAULT_OLLAMA_BASE.to_string()
          , timeout: None
        }
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

    /// Build the wire payload
    pub fn translate(&self, request: &GenerationRequest) -> GenerateRequest
    {   GenerateRequest
        {   model: self.model.clone()
          , prompt: request.prompt.clone()
          , system: request.system_instruction.clone()
          , stream: false
          , options: GenerateOptions
            {   temperature: request.temperature
              , num_predict: request.max_tokens
            }
        }
    }

    /// Parse a 2xx reply body
    pub fn parse(&self, body: &str)
      -> Result<GenerationResponse, AdapterError>
    {   let reply: GenerateResponse = super::decode(PROVIDER, body)?;
        let usage = match (reply.prompt_eval_count, reply.eval_count)
        {   (None, None) => None
          , (prompt, completion) => Some(Usage
            {   prompt_tokens: prompt
              , completion_tokens: completion
              , total_tokens: prompt
                .zip(completion)
                .map(|(p, c)| p.saturating_add(c))
            })
        };
        Ok(GenerationResponse::new(
          reply.response
        , format!("{} (local)", self.model)
        , usage
        ))
    }
}

#[async_trait]
impl super::ProviderAdapter for OllamaAdapter
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
    {   let payload = self.translate(request);
        trace!("Ollama request: {:?}", payload);

        let mut call = self.http_client
          .post(format!("{}/api/generate", self.api_base))
          .json(&payload);
        if let Some(timeout) = self.timeout
        {   call = call.timeout(timeout);
        }

        let body = super::send(PROVIDER, call).await?;
        self.parse(&body)
    }
}
