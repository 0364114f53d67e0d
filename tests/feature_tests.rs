mod common;

use std::sync::Arc;

use assistgate::error::AdapterErrorKind;
use assistgate::features::code::tidy_code;
use assistgate::features::email::extract_subject;
use assistgate::features::translate::detect_language;
use assistgate::features::{
  ChatProcessor
, CodeHelpProcessor
, DirectorySource
, EmailDraftProcessor
, SummarizeProcessor
, TextSource
, TranslateProcessor
};
use assistgate::FeatureProcessor;
use common::{gateway, params, StubAdapter};
use serde_json::json;

const ARTICLE: &str = "Rust is a systems programming language focused on \
  safety, speed, and concurrency. It achieves memory safety without a \
  garbage collector.";

fn summarizer(
  primary: &Arc<StubAdapter>
, root: &std::path::Path
) -> SummarizeProcessor
{   SummarizeProcessor::new(
      gateway(primary, None, 1)
    , Arc::new(DirectorySource::new(root))
    )
}

// ===== Chat =====

#[tokio::test]
async fn test_chat_empty_message_skips_gateway()
{   let stub = StubAdapter::replying("stub", "m", "hi");
    let chat = ChatProcessor::new(gateway(&stub, None, 1));

    let result = chat.process("   ", &params(json!({}))).await;
    assert_eq!(result.error(), Some("Empty message"));
    assert_eq!(
      result.content,
      "Please enter a message to start the conversation."
    );
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_chat_reply_and_metadata()
{   let stub = StubAdapter::replying("stub", "chat-model", "Hello there!");
    let chat = ChatProcessor::new(gateway(&stub, None, 1));

    let result = chat.process("Hi!", &params(json!({}))).await;
    assert!(!result.is_error());
    assert_eq!(result.content, "Hello there!");
    assert_eq!(result.metadata["model"], "chat-model");
    assert!(result.metadata.contains_key("elapsed_ms"));

    let seen = stub.last_request().expect("request recorded");
    assert_eq!(seen.prompt, "Hi!");
    assert!(seen.system_instruction.is_some());
    assert!((seen.temperature - 0.7).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_chat_history_is_prepended()
{   let stub = StubAdapter::replying("stub", "m", "Paris.");
    let chat = ChatProcessor::new(gateway(&stub, None, 1));

    let parameters = params(json!({
      "history": [
        {"role": "user", "content": "I am planning a trip to France."},
        {"role": "assistant", "content": "Sounds lovely!"},
        42
      ],
      "temperature": 0.2
    }));
    let result = chat.process("What is the capital?", &parameters).await;
    assert_eq!(result.metadata["history_turns"], 2);

    let seen = stub.last_request().expect("request recorded");
    assert_eq!(
      seen.prompt,
      "user: I am planning a trip to France.\n\
       assistant: Sounds lovely!\n\
       user: What is the capital?"
    );
    assert!((seen.temperature - 0.2).abs() < 1e-6);
}

#[tokio::test]
async fn test_gateway_failure_becomes_apology()
{   let stub = StubAdapter::failing("stub", "m", AdapterErrorKind::Transient);
    let chat = ChatProcessor::new(gateway(&stub, None, 2));

    let result = chat.process("Hello?", &params(json!({}))).await;
    assert!(result.content.starts_with("Sorry, something went wrong"));
    let error = result.error().expect("error key");
    assert!(error.contains("stub"), "{}", error);
    assert_eq!(stub.calls(), 2);
}

#[tokio::test]
async fn test_blank_reply_is_soft_failure()
{   let stub = StubAdapter::replying("stub", "m", "");
    let chat = ChatProcessor::new(gateway(&stub, None, 1));

    let result = chat.process("Hello?", &params(json!({}))).await;
    assert_eq!(result.error(), Some("Empty LLM response"));
    assert_eq!(
      result.content,
      "Sorry, I couldn't generate a response. Please try again."
    );
}

// ===== Summarize =====

#[tokio::test]
async fn test_summarize_inline_text()
{   let dir = tempfile::tempdir().expect("tempdir");
    let stub = StubAdapter::replying("stub", "m", "Rust is safe and fast.");
    let processor = summarizer(&stub, dir.path());

    let result = processor
      .process(ARTICLE, &params(json!({"max_length": 120})))
      .await;
    assert!(!result.is_error(), "{:?}", result);
    assert_eq!(result.metadata["source_type"], "text");
    assert_eq!(result.metadata["format"], "paragraph");
    assert_eq!(
      result.metadata["original_length"],
      ARTICLE.trim().chars().count()
    );
    assert_eq!(result.metadata["summary_length"], 22);

    let seen = stub.last_request().expect("request recorded");
    let system = seen.system_instruction.expect("system instruction");
    assert!(system.contains("approximately 120 characters"));
    assert_eq!(seen.max_tokens, 1000);
}

#[tokio::test]
async fn test_summarize_format_changes_instruction()
{   let dir = tempfile::tempdir().expect("tempdir");
    let stub = StubAdapter::replying("stub", "m", "- safe\n- fast");
    let processor = summarizer(&stub, dir.path());

    let result = processor
      .process(ARTICLE, &params(json!({"format": "bullets"})))
      .await;
    assert_eq!(result.metadata["format"], "bullets");
    let system = stub.last_request().unwrap().system_instruction.unwrap();
    assert!(system.contains("bullet points"));

    processor
      .process(ARTICLE, &params(json!({"format": "outline"})))
      .await;
    let system = stub.last_request().unwrap().system_instruction.unwrap();
    assert!(system.contains("hierarchical outline"));
}

#[tokio::test]
async fn test_summarize_reads_named_file()
{   let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("notes.txt"), ARTICLE).expect("write");
    let stub = StubAdapter::replying("stub", "m", "Short summary.");
    let processor = summarizer(&stub, dir.path());

    let result = processor
      .process("", &params(json!({"filename": "notes.txt", "model": "big"})))
      .await;
    assert!(!result.is_error(), "{:?}", result);
    assert_eq!(result.metadata["source_type"], "file");
    assert_eq!(result.metadata["filename"], "notes.txt");

    let seen = stub.last_request().expect("request recorded");
    assert_eq!(seen.prompt, ARTICLE.trim());
    assert_eq!(seen.model_hint.as_deref(), Some("big"));
}

#[tokio::test]
async fn test_summarize_missing_file()
{   let dir = tempfile::tempdir().expect("tempdir");
    let stub = StubAdapter::replying("stub", "m", "x");
    let processor = summarizer(&stub, dir.path());

    let result = processor
      .process("", &params(json!({"filename": "absent.txt"})))
      .await;
    assert_eq!(result.error(), Some("File read error"));
    assert!(result.content.contains("absent.txt"));
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_directory_source_stays_inside_root()
{   let dir = tempfile::tempdir().expect("tempdir");
    let inner = dir.path().join("data");
    std::fs::create_dir(&inner).expect("mkdir");
    std::fs::write(dir.path().join("secret.txt"), "outside").expect("write");
    std::fs::write(inner.join("ok.txt"), "inside").expect("write");
    let source = DirectorySource::new(&inner);

    assert_eq!(source.read_text("ok.txt").await.as_deref(), Some("inside"));
    assert_eq!(source.read_text("./ok.txt").await.as_deref(), Some("inside"));
    assert!(source.read_text("../secret.txt").await.is_none());
    let absolute = dir.path().join("secret.txt");
    assert!(source.read_text(absolute.to_str().unwrap()).await.is_none());
    assert!(source.read_text("  ").await.is_none());
}

#[tokio::test]
async fn test_summarize_bounds()
{   let dir = tempfile::tempdir().expect("tempdir");
    let stub = StubAdapter::replying("stub", "m", "x");
    let processor = summarizer(&stub, dir.path());

    let result = processor.process("Too short.", &params(json!({}))).await;
    assert_eq!(result.error(), Some("Input too short"));

    let long = "a".repeat(10_001);
    let result = processor.process(&long, &params(json!({}))).await;
    assert_eq!(result.error(), Some("Input too long"));

    let result = processor
      .process(ARTICLE, &params(json!({"format": "haiku"})))
      .await;
    assert_eq!(result.error(), Some("Unsupported format"));

    assert_eq!(stub.calls(), 0);
}

// ===== Translate =====

#[tokio::test]
async fn test_translate_builds_prompt_and_metadata()
{   let stub = StubAdapter::replying("stub", "m", "Bonjour le monde");
    let processor = TranslateProcessor::new(gateway(&stub, None, 1));

    let result = processor
      .process(
        "Hello and welcome to the world"
      , &params(json!({"target_language": "French"}))
      )
      .await;
    assert!(!result.is_error(), "{:?}", result);
    assert_eq!(result.metadata["target_language"], "French");
    assert_eq!(result.metadata["detected_language"], "English");
    assert_eq!(result.metadata["source_length"], 30);
    assert_eq!(result.metadata["target_length"], 16);

    let seen = stub.last_request().expect("request recorded");
    assert!(seen.prompt.starts_with("Translate the following text to French"));
    assert!(seen.prompt.ends_with("Hello and welcome to the world"));
    let system = seen.system_instruction.expect("system instruction");
    assert!(system.contains("line breaks"));
}

#[tokio::test]
async fn test_translate_without_format_preservation()
{   let stub = StubAdapter::replying("stub", "m", "Hola");
    let processor = TranslateProcessor::new(gateway(&stub, None, 1));

    processor
      .process(
        "Hello"
      , &params(json!({
          "target_language": "Spanish",
          "preserve_format": false
        }))
      )
      .await;
    let system = stub.last_request().unwrap().system_instruction.unwrap();
    assert!(!system.contains("line breaks"));
}

#[tokio::test]
async fn test_translate_validation()
{   let stub = StubAdapter::replying("stub", "m", "x");
    let processor = TranslateProcessor::new(gateway(&stub, None, 1));

    let result = processor.process("", &params(json!({}))).await;
    assert_eq!(result.error(), Some("Empty input"));

    let result = processor
      .process("a", &params(json!({"target_language": "German"})))
      .await;
    assert_eq!(result.error(), Some("Input too short"));

    let result = processor
      .process("Good morning", &params(json!({"target_language": " "})))
      .await;
    assert_eq!(result.error(), Some("Missing target language"));

    assert_eq!(stub.calls(), 0);
}

#[test]
fn test_detect_language()
{   assert_eq!(detect_language("The cat sat on the mat"), "English");
    assert_eq!(detect_language("Le chat est noir"), "French");
    assert_eq!(detect_language("El gato es negro"), "Spanish");
    assert_eq!(detect_language("Der Hund und die Katze"), "German");
    assert_eq!(detect_language("Io sono qui"), "Italian");
    assert_eq!(detect_language("Theory"), "Unknown");
    assert_eq!(detect_language(""), "Unknown");
}

// ===== Code help =====

#[tokio::test]
async fn test_code_explain_defaults()
{   let stub = StubAdapter::replying("stub", "m", "It prints.");
    let processor = CodeHelpProcessor::new(gateway(&stub, None, 1));

    let result = processor
      .process("print('hello world')", &params(json!({})))
      .await;
    assert!(!result.is_error(), "{:?}", result);
    assert_eq!(result.metadata["action"], "explain");
    assert_eq!(result.metadata["language"], "python");
    assert_eq!(result.metadata["formatted"], false);
    assert!(!result.metadata.contains_key("target_language"));

    let system = stub.last_request().unwrap().system_instruction.unwrap();
    assert!(system.ends_with("Language: python"));
}

#[tokio::test]
async fn test_code_convert_requires_target()
{   let stub = StubAdapter::replying("stub", "m", "x");
    let processor = CodeHelpProcessor::new(gateway(&stub, None, 1));

    let result = processor
      .process(
        "function add(a, b) { return a + b; }"
      , &params(json!({"action": "convert", "language": "javascript"}))
      )
      .await;
    assert_eq!(result.error(), Some("Missing target language"));
    assert_eq!(
      result.content,
      "Please specify a target language for code conversion."
    );
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_code_convert_with_target()
{   let stub = StubAdapter::replying("stub", "m", "def add(a, b): ...");
    let processor = CodeHelpProcessor::new(gateway(&stub, None, 1));

    let result = processor
      .process(
        "function add(a, b) { return a + b; }"
      , &params(json!({
          "action": "convert",
          "language": "javascript",
          "target_language": "python"
        }))
      )
      .await;
    assert_eq!(result.metadata["target_language"], "python");
    let system = stub.last_request().unwrap().system_instruction.unwrap();
    assert!(system.contains("Convert this code from javascript to python."));
}

#[tokio::test]
async fn test_code_rejects_unknown_action_and_short_input()
{   let stub = StubAdapter::replying("stub", "m", "x");
    let processor = CodeHelpProcessor::new(gateway(&stub, None, 1));

    let result = processor
      .process("x = 1 + 1", &params(json!({"action": "compile"})))
      .await;
    assert_eq!(result.error(), Some("Unsupported action"));

    let result = processor.process("x=1", &params(json!({}))).await;
    assert_eq!(result.error(), Some("Input too short"));

    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_code_greeting_is_answered_locally()
{   let stub = StubAdapter::replying("stub", "m", "x");
    let processor = CodeHelpProcessor::new(gateway(&stub, None, 1));

    let result = processor.process("Hello", &params(json!({}))).await;
    assert!(!result.is_error());
    assert_eq!(result.metadata["action"], "greeting");
    assert!(result.content.starts_with("Hello!"));
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_code_improve_tidies_python_reply()
{   let reply = "Here you go:\n```python\ndef f():\n\treturn 1   \n```";
    let stub = StubAdapter::replying("stub", "m", reply);
    let processor = CodeHelpProcessor::new(gateway(&stub, None, 1));

    let result = processor
      .process("def f():\n  return 1", &params(json!({"action": "improve"})))
      .await;
    assert_eq!(result.metadata["formatted"], true);
    assert_eq!(
      result.content,
      "Here you go:\n```python\ndef f():\n    return 1\n```"
    );
}

#[test]
fn test_tidy_code_collapses_blank_runs()
{   let messy = "```\na = 1\n\n\n\n\nb = 2\t \n```";
    assert_eq!(tidy_code(messy), "```\na = 1\n\n\nb = 2\n```");

    // without fences the whole reply is code
    assert_eq!(tidy_code("\tx = 1  "), "    x = 1");

    // prose outside fences is left alone
    assert_eq!(tidy_code("keep\t \n```\ny\n```"), "keep\t \n```\ny\n```");
}

#[test]
fn test_tidy_code_keeps_trailing_newline()
{   assert_eq!(tidy_code("```\nx\n```\n"), "```\nx\n```\n");
    assert_eq!(tidy_code("x = 1\t\n"), "x = 1\n");
    assert_eq!(tidy_code("x = 1"), "x = 1");
}

// ===== Email =====

#[tokio::test]
async fn test_email_draft_metadata()
{   let draft = "Subject: Project update\n\nHi team,\n\nAll on track.\n\nBest";
    let stub = StubAdapter::replying("stub", "m", draft);
    let processor = EmailDraftProcessor::new(gateway(&stub, None, 1));

    let result = processor
      .process(
        "Tell the team the project is on track"
      , &params(json!({"tone": "friendly", "format": "reply"}))
      )
      .await;
    assert!(!result.is_error(), "{:?}", result);
    assert_eq!(result.metadata["tone"], "friendly");
    assert_eq!(result.metadata["format"], "reply");
    assert_eq!(result.metadata["subject"], "Project update");

    let system = stub.last_request().unwrap().system_instruction.unwrap();
    assert!(system.contains("friendly tone"));
    assert!(system.contains("reply to a previous email"));
}

#[tokio::test]
async fn test_email_validation()
{   let stub = StubAdapter::replying("stub", "m", "x");
    let processor = EmailDraftProcessor::new(gateway(&stub, None, 1));

    let result = processor.process(" ", &params(json!({}))).await;
    assert_eq!(result.error(), Some("Empty prompt"));

    let result = processor.process("Say hi", &params(json!({}))).await;
    assert_eq!(result.error(), Some("Prompt too short"));

    let result = processor
      .process(
        "Ask the landlord about the heating"
      , &params(json!({"format": "memo"}))
      )
      .await;
    assert_eq!(result.error(), Some("Unsupported format"));

    assert_eq!(stub.calls(), 0);
}

#[test]
fn test_extract_subject()
{   assert_eq!(
      extract_subject("Subject: Hello\nBody").as_deref(),
      Some("Hello")
    );
    assert_eq!(
      extract_subject("**Subject:** Quarterly review**\n").as_deref(),
      Some("Quarterly review")
    );
    assert_eq!(extract_subject("subject:   \nBody"), None);
    assert_eq!(extract_subject("Dear Sam,\nÜbersicht"), None);
}
