//! Unified request and response types passed through the gateway

use serde::{Deserialize, Serialize};

/// Sentinel content for a reply that carried no usable text
pub const NO_CONTENT: &str = "no content returned";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Normalized generation request
///
/// Built once by the caller and handed to the gateway by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest
{   /// The prompt text
    pub prompt: String
  , /// Optional system instruction, combined per adapter
    pub system_instruction: Option<String>
  , /// Sampling temperature in 0.0..=1.0
    pub temperature: f32
  , /// Max tokens to generate
    pub max_tokens: u32
  , /// Desired model; each adapter decides what it means
    pub model_hint: Option<String>
}

impl GenerationRequest
{   pub fn new(prompt: impl Into<String>) -> Self
    {   GenerationRequest
        {   prompt: prompt.into()
          , system_instruction: None
          , temperature: DEFAULT_TEMPERATURE
          , max_tokens: DEFAULT_MAX_TOKENS
          , model_hint: None
        }
    }

    pub fn with_system_instruction(
      mut self
    , instruction: impl Into<String>
    ) -> Self
    {   self.system_instruction = Some(instruction.into());
        self
    }

    /// Set the temperature, clamped to 0.0..=1.0
    pub fn with_temperature(mut self, temperature: f32) -> Self
    {   self.temperature = if temperature.is_nan()
        {   DEFAULT_TEMPERATURE
        } else
        {   temperature.clamp(0.0, 1.0)
        };
        self
    }

    /// Set max tokens; zero is raised to one
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self
    {   self.max_tokens = max_tokens.max(1);
        self
    }

    pub fn with_model_hint(mut self, hint: impl Into<String>) -> Self
    {   self.model_hint = Some(hint.into());
        self
    }
}

/// Token accounting, when the provider reports it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage
{   #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>
}

/// Normalized generation response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResponse
{   /// Generated text, or [`NO_CONTENT`] when nothing came back
    pub content: String
  , /// Model that actually answered
    pub model_used: String
  , /// Token accounting if the provider reported any
    pub usage: Option<Usage>
  , has_content: bool
}

impl GenerationResponse
{   /// Build a response, substituting the sentinel for blank text
    pub fn new(
      content: Option<String>
    , model_used: impl Into<String>
    , usage: Option<Usage>
    ) -> Self
    {   let text = content.filter(|c| !c.trim().is_empty());
        let has_content = text.is_some();
        GenerationResponse
        {   content: text.unwrap_or_else(|| NO_CONTENT.to_string())
          , model_used: model_used.into()
          , usage
          , has_content
        }
    }

    /// Whether the provider returned meaningful text
    pub fn has_content(&self) -> bool
    {   self.has_content
    }
}
