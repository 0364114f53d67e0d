use std::sync::Arc;
use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::{Apology, FeatureProcessor, FeatureResult, Parameters, TextSource};
use crate::gateway::Gateway;
use crate::request::GenerationRequest;

const SYSTEM_INSTRUCTION: &str = "You are a text summarization expert. \
  Please provide a clear and concise summary of the following text:";

pub const MIN_INPUT_CHARS: usize = 20;
pub const MAX_INPUT_CHARS: usize = 10_000;
pub const DEFAULT_MAX_LENGTH: u64 = 500;
const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 1000;

const APOLOGY: Apology = Apology
{   failed: "I apologize, but I encountered an error while summarizing. \
      Please try again later."
  , empty: "Sorry, I couldn't generate a useful summary. Please try again."
};

/// Shape of the requested summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryFormat
{   Paragraph
  , Bullets
  , Outline
}

impl SummaryFormat
{   pub fn parse(raw: &str) -> Option<Self>
    {   match raw.trim().to_ascii_lowercase().as_str()
        {   "paragraph" => Some(SummaryFormat::Paragraph)
          , "bullets" | "bullet" => Some(SummaryFormat::Bullets)
          , "outline" => Some(SummaryFormat::Outline)
          , _ => None
        }
    }

    pub fn as_str(&self) -> &'static str
    {   match self
        {   SummaryFormat::Paragraph => "paragraph"
          , SummaryFormat::Bullets => "bullets"
          , SummaryFormat::Outline => "outline"
        }
    }

    fn instruction(&self) -> Option<&'static str>
    {   match self
        {   SummaryFormat::Paragraph => None
          , SummaryFormat::Bullets => {
              Some("Format the summary as bullet points.")
            }
          , SummaryFormat::Outline => {
              Some("Format the summary as a hierarchical outline.")
            }
        }
    }
}

/// System instruction for a format and approximate target length
pub(crate) fn system_instruction(
  format: SummaryFormat
, max_length: u64
) -> String
{   let mut instruction = format!(
      "{}\nAim for a summary length of approximately {} characters.",
      SYSTEM_INSTRUCTION,
      max_length
    );
    if let Some(extra) = format.instruction()
    {   instruction.push('\n');
        instruction.push_str(extra);
    }
    instruction
}

/// Summarization of inline text or a named source
///
/// Recognized parameters: `filename`, `format`
/// (`paragraph` | `bullets` | `outline`), `max_length`, `model`.
pub struct SummarizeProcessor
{   gateway: Arc<Gateway>
  , source: Arc<dyn TextSource>
}

impl SummarizeProcessor
{   pub fn new(gateway: Arc<Gateway>, source: Arc<dyn TextSource>) -> Self
    {   SummarizeProcessor
        {   gateway
          , source
        }
    }
}

#[async_trait]
impl FeatureProcessor for SummarizeProcessor
{   fn name(&self) -> &'static str
    {   "summarize"
    }

    async fn process_with_cancel(
      &self
    , content: &str
    , parameters: &Parameters
    , cancel: &CancellationToken
    ) -> FeatureResult
    {   let filename = super::param_str(parameters, "filename");
        let text = match filename
        {   Some(filename) => {
              info!("summarize: reading source {}", filename);
              match self.source.read_text(filename).await
              {   Some(text) => text
                , None => {
                    warn!("summarize: could not read {}", filename);
                    return FeatureResult::failure(
                      format!(
                        "Error: Could not read file '{}'. Ensure it exists \
                         in the data directory and is a readable text file.",
                        filename
                      )
                    , "File read error"
                    );
                  }
              }
            }
          , None if content.trim().is_empty() => {
              return FeatureResult::failure(
                "Error: Please provide either text content or a filename \
                 to summarize."
              , "Missing input"
              );
            }
          , None => content.to_string()
        };

        let length = text.trim().chars().count();
        if length < MIN_INPUT_CHARS
        {   return FeatureResult::failure(
              format!(
                "Please provide a longer text to summarize (at least {} \
                 characters).",
                MIN_INPUT_CHARS
              )
            , "Input too short"
            );
        }
        if length > MAX_INPUT_CHARS
        {   return FeatureResult::failure(
              format!(
                "The text is too long to summarize. Please keep it under \
                 {} characters.",
                MAX_INPUT_CHARS
              )
            , "Input too long"
            );
        }

        let format = match super::param_str(parameters, "format")
        {   None => SummaryFormat::Paragraph
          , Some(raw) => match SummaryFormat::parse(raw)
            {   Some(format) => format
              , None => {
                  return FeatureResult::failure(
                    format!(
                      "Unsupported summary format '{}'. Choose paragraph, \
                       bullets, or outline.",
                      raw
                    )
                  , "Unsupported format"
                  );
                }
            }
        };
        let max_length = super::param_u64(parameters, "max_length")
          .filter(|n| *n > 0)
          .unwrap_or(DEFAULT_MAX_LENGTH);
        debug!(
          "summarize: {} chars, format {}, max_length {}",
          length,
          format.as_str(),
          max_length
        );

        let mut request = GenerationRequest::new(text.trim())
          .with_system_instruction(system_instruction(format, max_length))
          .with_temperature(TEMPERATURE)
          .with_max_tokens(MAX_TOKENS);
        if let Some(model) = super::param_str(parameters, "model")
        {   request = request.with_model_hint(model);
        }

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
        let source_type = if filename.is_some() { "file" } else { "text" };
        metadata.insert("source_type".to_string(), Value::from(source_type));
        if let Some(filename) = filename
        {   metadata.insert("filename".to_string(), Value::from(filename));
        }
        metadata.insert("original_length".to_string(), Value::from(length));
        metadata.insert(
          "summary_length".to_string()
        , Value::from(generated.response.content.chars().count())
        );
        metadata.insert("format".to_string(), Value::from(format.as_str()));
        FeatureResult::success(generated.response.content, metadata)
    }
}
