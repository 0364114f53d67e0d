use std::sync::Arc;
use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::{Apology, FeatureProcessor, FeatureResult, Parameters};
use crate::gateway::Gateway;
use crate::request::GenerationRequest;

const SYSTEM_INSTRUCTION: &str = "You are a helpful conversational AI \
  assistant. Engage in dialogue and answer questions concisely.";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

const APOLOGY: Apology = Apology
{   failed: "Sorry, something went wrong while processing your message. \
      Please try again or rephrase your question."
  , empty: "Sorry, I couldn't generate a response. Please try again."
};

/// Conversational chat
///
/// Recognized parameters: `history` (array of strings or
/// `{"role", "content"}` objects, oldest first) and `temperature`.
pub struct ChatProcessor
{   gateway: Arc<Gateway>
}

impl ChatProcessor
{   pub fn new(gateway: Arc<Gateway>) -> Self
    {   ChatProcessor
        {   gateway
        }
    }
}

/// Flatten caller-supplied history into transcript lines
fn history_lines(parameters: &Parameters) -> Vec<String>
{   let turns = match parameters.get("history").and_then(Value::as_array)
    {   Some(turns) => turns
      , None => return Vec::new()
    };
    turns
      .iter()
      .filter_map(|turn| match turn
      {   Value::String(text) => Some(text.trim().to_string())
        , Value::Object(obj) => {
            let content = obj.get("content")?.as_str()?.trim();
            let role = obj.get("role")
              .and_then(Value::as_str)
              .unwrap_or("user");
            Some(format!("{}: {}", role, content))
          }
        , _ => None
      })
      .filter(|line| !line.is_empty())
      .collect()
}

/// The prompt for this turn, with any history in front
pub(crate) fn build_prompt(message: &str, history: &[String]) -> String
{   if history.is_empty()
    {   return message.to_string();
    }
    let mut prompt = history.join("\n");
    prompt.push_str("\nuser: ");
    prompt.push_str(message);
    prompt
}

#[async_trait]
impl FeatureProcessor for ChatProcessor
{   fn name(&self) -> &'static str
    {   "chat"
    }

    async fn process_with_cancel(
      &self
    , content: &str
    , parameters: &Parameters
    , cancel: &CancellationToken
    ) -> FeatureResult
    {   let message = content.trim();
        if message.is_empty()
        {   return FeatureResult::failure(
              "Please enter a message to start the conversation."
            , "Empty message"
            );
        }

        let history = history_lines(parameters);
        let temperature = super::param_f64(parameters, "temperature")
          .map(|t| t as f32)
          .unwrap_or(DEFAULT_TEMPERATURE);
        debug!("chat: {} history turn(s)", history.len());

        let request = GenerationRequest::new(build_prompt(message, &history))
          .with_system_instruction(SYSTEM_INSTRUCTION)
          .with_temperature(temperature);

        let generated = match super::generate(
          self.name()
        , &self.gateway
        , request
        , &APOLOGY
        , cancel
        ).await
        {   Ok(generated) => generated
          , Err(failure) => return failure
        };

        let mut metadata = generated.metadata();
        if !history.is_empty()
        {   metadata.insert(
              "history_turns".to_string()
            , Value::from(history.len())
            );
        }
        FeatureResult::success(generated.response.content, metadata)
    }
}
