use std::sync::Arc;
use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::{Apology, FeatureProcessor, FeatureResult, Parameters};
use crate::gateway::Gateway;
use crate::request::GenerationRequest;

const SYSTEM_INSTRUCTION: &str = "You are an expert email writer. Your \
task is to:
1. Draft clear, professional emails
2. Maintain appropriate tone and formality
3. Include all necessary components (greeting, body, closing)
4. Follow email etiquette and best practices
5. Adapt style based on the context and recipient

Format the email properly with line breaks and standard email structure.";

const MIN_INPUT_CHARS: usize = 10;
pub const DEFAULT_TONE: &str = "professional";
const TEMPERATURE: f32 = 0.7;

const APOLOGY: Apology = Apology
{   failed: "Sorry, something went wrong while drafting your email. \
      Please try again or rephrase your request."
  , empty: "Sorry, I couldn't generate the email draft. Please try again."
};

/// Kind of email being drafted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailFormat
{   Full
  , Reply
  , Forward
}

impl EmailFormat
{   pub fn parse(raw: &str) -> Option<Self>
    {   match raw.trim().to_ascii_lowercase().as_str()
        {   "full" => Some(EmailFormat::Full)
          , "reply" => Some(EmailFormat::Reply)
          , "forward" => Some(EmailFormat::Forward)
          , _ => None
        }
    }

    pub fn as_str(&self) -> &'static str
    {   match self
        {   EmailFormat::Full => "full"
          , EmailFormat::Reply => "reply"
          , EmailFormat::Forward => "forward"
        }
    }
}

/// System instruction for a tone and format
pub(crate) fn system_instruction(tone: &str, format: EmailFormat) -> String
{   let mut instruction = format!("{}\nUse a {} tone.", SYSTEM_INSTRUCTION, tone);
    match format
    {   EmailFormat::Full => {}
      , EmailFormat::Reply => {
          instruction.push_str(
            "\nFormat this as a reply to a previous email."
          );
        }
      , EmailFormat::Forward => {
          instruction.push_str(
            "\nFormat this as a forwarded email with appropriate context."
          );
        }
    }
    instruction
}

/// The `Subject:` line of a draft, if it has one
pub fn extract_subject(draft: &str) -> Option<String>
{   draft
      .lines()
      .map(|line| line.trim().trim_start_matches('*'))
      .find(|line| {
        line.get(..8)
          .map_or(false, |p| p.eq_ignore_ascii_case("subject:"))
      })
      .map(|line| line[8..].trim().trim_matches('*').trim().to_string())
      .filter(|subject| !subject.is_empty())
}

/// Email drafting
///
/// Recognized parameters: `tone` (default `professional`) and `format`
/// (`full` | `reply` | `forward`, default `full`).
pub struct EmailDraftProcessor
{   gateway: Arc<Gateway>
}

impl EmailDraftProcessor
{   pub fn new(gateway: Arc<Gateway>) -> Self
    {   EmailDraftProcessor
        {   gateway
        }
    }
}

#[async_trait]
impl FeatureProcessor for EmailDraftProcessor
{   fn name(&self) -> &'static str
    {   "email"
    }

    async fn process_with_cancel(
      &self
    , content: &str
    , parameters: &Parameters
    , cancel: &CancellationToken
    ) -> FeatureResult
    {   let brief = content.trim();
        if brief.is_empty()
        {   return FeatureResult::failure(
              "Please describe the email you want to draft."
            , "Empty prompt"
            );
        }
        if brief.chars().count() < MIN_INPUT_CHARS
        {   return FeatureResult::failure(
              "Please provide a more detailed description for the email."
            , "Prompt too short"
            );
        }

        let tone = super::param_str(parameters, "tone").unwrap_or(DEFAULT_TONE);
        let format = match super::param_str(parameters, "format")
        {   None => EmailFormat::Full
          , Some(raw) => match EmailFormat::parse(raw)
            {   Some(format) => format
              , None => {
                  return FeatureResult::failure(
                    format!(
                      "Unsupported email format '{}'. Choose full, reply, \
                       or forward.",
                      raw
                    )
                  , "Unsupported format"
                  );
                }
            }
        };
        debug!("email: tone={}, format={}", tone, format.as_str());

        let request = GenerationRequest::new(brief)
          .with_system_instruction(system_instruction(tone, format))
          .with_temperature(TEMPERATURE);

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
        metadata.insert("tone".to_string(), Value::from(tone));
        metadata.insert("format".to_string(), Value::from(format.as_str()));
        if let Some(subject) = extract_subject(&generated.response.content)
        {   metadata.insert("subject".to_string(), Value::from(subject));
        }
        FeatureResult::success(generated.response.content, metadata)
    }
}
