use std::sync::Arc;
use async_trait::async_trait;
use log::{debug, info};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::{Apology, FeatureProcessor, FeatureResult, Parameters};
use crate::gateway::Gateway;
use crate::request::GenerationRequest;

const SYSTEM_INSTRUCTION: &str = "You are an expert programming assistant; \
  answer concisely and clearly. When providing code examples, wrap them in \
  markdown triple backticks with the appropriate language tag so they \
  render with syntax highlighting. Prefix explanations with plain text \
  before the code block. Do not omit the language tag (like 'python' or \
  'js').";

const GREETING_REPLY: &str = "Hello! I can explain code, debug issues, \
  suggest improvements, add documentation, or convert between languages. \
  What would you like to do today?";

const GREETINGS: &[&str] = &[
  "hello"
, "hi"
, "hey"
, "good morning"
, "good afternoon"
, "good evening"
];

const MIN_INPUT_CHARS: usize = 5;
const DEFAULT_LANGUAGE: &str = "python";
const TEMPERATURE: f32 = 0.3;

const APOLOGY: Apology = Apology
{   failed: "Sorry, something went wrong while processing your code. \
      Please try again or rephrase your question."
  , empty: "Sorry, I couldn't process your code. Please try again."
};

/// What the caller wants done with the code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeAction
{   Explain
  , Debug
  , Improve
  , Document
  , Convert
}

impl CodeAction
{   pub fn parse(raw: &str) -> Option<Self>
    {   match raw.trim().to_ascii_lowercase().as_str()
        {   "explain" => Some(CodeAction::Explain)
          , "debug" => Some(CodeAction::Debug)
          , "improve" => Some(CodeAction::Improve)
          , "document" => Some(CodeAction::Document)
          , "convert" => Some(CodeAction::Convert)
          , _ => None
        }
    }

    pub fn as_str(&self) -> &'static str
    {   match self
        {   CodeAction::Explain => "explain"
          , CodeAction::Debug => "debug"
          , CodeAction::Improve => "improve"
          , CodeAction::Document => "document"
          , CodeAction::Convert => "convert"
        }
    }
}

/// System instruction for an action on code written in `language`
pub(crate) fn system_instruction(
  action: CodeAction
, language: &str
, target_language: Option<&str>
) -> String
{   let action_line = match action
    {   CodeAction::Explain => String::new()
      , CodeAction::Debug => {
          "\nAnalyze this code for bugs and provide fixes.".to_string()
        }
      , CodeAction::Improve => {
          "\nSuggest improvements for this code, focusing on efficiency \
           and best practices.".to_string()
        }
      , CodeAction::Document => {
          "\nAdd comprehensive documentation and comments to this code."
            .to_string()
        }
      , CodeAction::Convert => format!(
          "\nConvert this code from {} to {}.",
          language,
          target_language.unwrap_or(language)
        )
    };
    format!("{}{}\nLanguage: {}", SYSTEM_INSTRUCTION, action_line, language)
}

/// Normalise code in a reply: tabs become four spaces, trailing
/// whitespace goes, and runs of more than two blank lines shrink to two.
///
/// Only text inside ``` fences is touched; a reply without fences is
/// treated as one block of code.
pub fn tidy_code(reply: &str) -> String
{   let fenced = reply.lines().any(|l| l.trim_start().starts_with("```"));
    let mut in_code = !fenced;
    let mut blank_run = 0;
    let mut out: Vec<String> = Vec::new();

    for line in reply.lines()
    {   if line.trim_start().starts_with("```")
        {   in_code = !in_code;
            blank_run = 0;
            out.push(line.trim_end().to_string());
            continue;
        }
        if !in_code
        {   out.push(line.to_string());
            continue;
        }
        let cleaned = line.replace('\t', "    ").trim_end().to_string();
        if cleaned.is_empty()
        {   blank_run += 1;
            if blank_run > 2
            {   continue;
            }
        } else
        {   blank_run = 0;
        }
        out.push(cleaned);
    }
    let mut tidied = out.join("\n");
    if reply.ends_with('\n')
    {   tidied.push('\n');
    }
    tidied
}

/// Programming help: explain, debug, improve, document, convert
///
/// Recognized parameters: `action` (default `explain`), `language`
/// (default `python`), and `target_language` for `convert`.
pub struct CodeHelpProcessor
{   gateway: Arc<Gateway>
}

impl CodeHelpProcessor
{   pub fn new(gateway: Arc<Gateway>) -> Self
    {   CodeHelpProcessor
        {   gateway
        }
    }
}

#[async_trait]
impl FeatureProcessor for CodeHelpProcessor
{   fn name(&self) -> &'static str
    {   "code"
    }

    async fn process_with_cancel(
      &self
    , content: &str
    , parameters: &Parameters
    , cancel: &CancellationToken
    ) -> FeatureResult
    {   let snippet = content.trim();
        if snippet.is_empty()
        {   return FeatureResult::failure(
              "Please paste code or describe your coding problem."
            , "Empty input"
            );
        }
        if snippet.chars().count() < MIN_INPUT_CHARS
        {   return FeatureResult::failure(
              "Please provide a more detailed code snippet or question."
            , "Input too short"
            );
        }
        if GREETINGS.contains(&snippet.to_lowercase().as_str())
        {   let mut metadata = super::Metadata::new();
            metadata.insert("action".to_string(), Value::from("greeting"));
            return FeatureResult::success(GREETING_REPLY, metadata);
        }

        let action = match super::param_str(parameters, "action")
        {   None => CodeAction::Explain
          , Some(raw) => match CodeAction::parse(raw)
            {   Some(action) => action
              , None => {
                  return FeatureResult::failure(
                    format!(
                      "Unsupported action '{}'. Choose explain, debug, \
                       improve, document, or convert.",
                      raw
                    )
                  , "Unsupported action"
                  );
                }
            }
        };
        let language = super::param_str(parameters, "language")
          .unwrap_or(DEFAULT_LANGUAGE);
        let target_language = super::param_str(parameters, "target_language");
        if action == CodeAction::Convert && target_language.is_none()
        {   return FeatureResult::failure(
              "Please specify a target language for code conversion."
            , "Missing target language"
            );
        }
        info!(
          "code: action={}, language={}",
          action.as_str(),
          language
        );

        let request = GenerationRequest::new(content)
          .with_system_instruction(
            system_instruction(action, language, target_language)
          )
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
        let tidy = language.eq_ignore_ascii_case("python")
          && matches!(action, CodeAction::Improve | CodeAction::Document);
        let reply = if tidy
        {   debug!("code: tidying python reply");
            tidy_code(&generated.response.content)
        } else
        {   generated.response.content
        };

        metadata.insert("action".to_string(), Value::from(action.as_str()));
        metadata.insert("language".to_string(), Value::from(language));
        if let Some(target) = target_language
          .filter(|_| action == CodeAction::Convert)
        {   metadata.insert("target_language".to_string(), Value::from(target));
        }
        metadata.insert("formatted".to_string(), Value::from(tidy));
        FeatureResult::success(reply, metadata)
    }
}
