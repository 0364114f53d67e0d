use std::sync::Arc;
use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::{Apology, FeatureProcessor, FeatureResult, Parameters};
use crate::gateway::Gateway;
use crate::request::GenerationRequest;

const SYSTEM_INSTRUCTION: &str = "You are an expert language translator. \
Your task is to:
1. Accurately translate the given text
2. Maintain the original meaning and context
3. Consider cultural nuances and idioms
4. Preserve formatting and tone
5. Provide natural, fluent translations

If specific terms should not be translated (like names or technical \
terms), preserve them as is.";

const FORMAT_INSTRUCTION: &str = "Maintain the original text's formatting, \
  including line breaks and special characters.";

const MIN_INPUT_CHARS: usize = 2;
const TEMPERATURE: f32 = 0.3;

const APOLOGY: Apology = Apology
{   failed: "Sorry, something went wrong while translating your text. \
      Please try again or rephrase your request."
  , empty: "Sorry, I couldn't translate your text. Please try again."
};

/// Marker words checked by [`detect_language`]
const MARKERS: &[(&str, &str)] = &[
  ("the", "English")
, ("and", "English")
, ("le", "French")
, ("est", "French")
, ("el", "Spanish")
, ("es", "Spanish")
, ("der", "German")
, ("und", "German")
, ("il", "Italian")
, ("sono", "Italian")
];

/// Rough guess at the source language from common short words
pub fn detect_language(text: &str) -> &'static str
{   let lower = text.to_lowercase();
    let words: Vec<&str> = lower
      .split(|c: char| !c.is_alphabetic())
      .filter(|w| !w.is_empty())
      .collect();
    MARKERS
      .iter()
      .find(|(marker, _)| words.contains(marker))
      .map(|(_, language)| *language)
      .unwrap_or("Unknown")
}

/// Translation into a caller-chosen language
///
/// Recognized parameters: `target_language` (required) and
/// `preserve_format` (default true).
pub struct TranslateProcessor
{   gateway: Arc<Gateway>
}

impl TranslateProcessor
{   pub fn new(gateway: Arc<Gateway>) -> Self
    {   TranslateProcessor
        {   gateway
        }
    }
}

#[async_trait]
impl FeatureProcessor for TranslateProcessor
{   fn name(&self) -> &'static str
    {   "translate"
    }

    async fn process_with_cancel(
      &self
    , content: &str
    , parameters: &Parameters
    , cancel: &CancellationToken
    ) -> FeatureResult
    {   let text = content.trim();
        if text.is_empty()
        {   return FeatureResult::failure(
              "Please enter text to translate."
            , "Empty input"
            );
        }
        if text.chars().count() < MIN_INPUT_CHARS
        {   return FeatureResult::failure(
              "Please provide a longer text to translate."
            , "Input too short"
            );
        }
        let target_language = match super::param_str(
          parameters
        , "target_language"
        )
        {   Some(language) => language
          , None => {
              return FeatureResult::failure(
                "Please specify a target language for translation."
              , "Missing target language"
              );
            }
        };

        let preserve_format = super::param_bool(parameters, "preserve_format")
          .unwrap_or(true);
        let mut system = SYSTEM_INSTRUCTION.to_string();
        if preserve_format
        {   system.push('\n');
            system.push_str(FORMAT_INSTRUCTION);
        }
        debug!(
          "translate: {} chars to {}, preserve_format {}",
          text.len(),
          target_language,
          preserve_format
        );

        let request = GenerationRequest::new(format!(
            "Translate the following text to {} (preserve formatting and \
             context):\n{}",
            target_language,
            content
          ))
          .with_system_instruction(system)
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
        metadata.insert(
          "target_language".to_string()
        , Value::from(target_language)
        );
        metadata.insert(
          "detected_language".to_string()
        , Value::from(detect_language(text))
        );
        metadata.insert(
          "source_length".to_string()
        , Value::from(content.chars().count())
        );
        metadata.insert(
          "target_length".to_string()
        , Value::from(generated.response.content.chars().count())
        );
        FeatureResult::success(generated.response.content, metadata)
    }
}
