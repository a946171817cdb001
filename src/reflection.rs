//! Conversation reflection.
//!
//! Distills a transcript into a small structured record (tags, summary,
//! what worked, what to avoid) via the text-generation seam. Model output
//! is parsed defensively: the reply is reduced to the substring between the
//! first `{` and the last `}`, and anything unparseable becomes a tagged
//! raw record instead of failing the pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{HindsightError, Result};
use crate::llm::TextGenerator;
use crate::memory::types::Metadata;
use crate::session::ChatMessage;

/// Instruction template sent as the system prompt; the formatted transcript
/// goes as the user message.
pub const REFLECTION_PROMPT: &str = r#"You are analyzing conversations to create memories that will help guide future interactions. Your task is to extract key elements that would be most helpful when encountering similar discussions in the future.

Review the conversation and create a memory reflection following these rules:

1. For any field where you don't have enough information or the field isn't relevant, use "N/A"
2. Be extremely concise - each string should be one clear, actionable sentence
3. Focus only on information that would be useful for handling similar future conversations
4. Context_tags should be specific enough to match similar situations but general enough to be reusable

Output valid JSON in exactly this format:
{
    "context_tags": [              // 2-4 keywords that would help identify similar future conversations
        string,                    // Use field-specific terms like "deep_learning", "methodology_question", "results_interpretation"
        ...
    ],
    "conversation_summary": string, // One sentence describing what the conversation accomplished
    "what_worked": string,         // Most effective approach or strategy used in this conversation
    "what_to_avoid": string        // Most important pitfall or ineffective approach to avoid
}

Examples:
- Good context_tags: ["transformer_architecture", "attention_mechanism", "methodology_comparison"]
- Bad context_tags: ["machine_learning", "paper_discussion", "questions"]

- Good conversation_summary: "Explained how the attention mechanism in the BERT paper differs from traditional transformer architectures"
- Bad conversation_summary: "Discussed a machine learning paper"

- Good what_worked: "Using analogies from matrix multiplication to explain attention score calculations"
- Bad what_worked: "Explained the technical concepts well"

- Good what_to_avoid: "Diving into mathematical formulas before establishing user's familiarity with linear algebra fundamentals"
- Bad what_to_avoid: "Used complicated language"

Do not include any text outside the JSON object in your response."#;

/// A parsed reflection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub context_tags: Vec<String>,
    pub conversation_summary: String,
    pub what_worked: String,
    pub what_to_avoid: String,
}

/// Result of the best-effort parse. `Unparsed` keeps the raw reply so the
/// conversation can still be persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum ReflectionOutcome {
    Parsed(Reflection),
    Unparsed { error: String, raw: String },
}

impl ReflectionOutcome {
    /// Content metadata for an episodic record: the reflection fields, or
    /// `{error, raw}` when the reply did not parse.
    pub fn to_metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        match self {
            Self::Parsed(reflection) => {
                metadata.insert(
                    "context_tags".to_string(),
                    serde_json::json!(reflection.context_tags),
                );
                metadata.insert(
                    "conversation_summary".to_string(),
                    serde_json::json!(reflection.conversation_summary),
                );
                metadata.insert(
                    "what_worked".to_string(),
                    serde_json::json!(reflection.what_worked),
                );
                metadata.insert(
                    "what_to_avoid".to_string(),
                    serde_json::json!(reflection.what_to_avoid),
                );
            }
            Self::Unparsed { error, raw } => {
                metadata.insert("error".to_string(), serde_json::json!(error));
                metadata.insert("raw".to_string(), serde_json::json!(raw));
            }
        }
        metadata
    }
}

/// Render messages as `ROLE: content` lines. A leading system message is
/// dropped; it is the assistant's own instructions, not conversation.
pub fn format_transcript(messages: &[ChatMessage]) -> String {
    let turns = match messages.first() {
        Some(m) if m.role.eq_ignore_ascii_case("system") => &messages[1..],
        _ => messages,
    };
    turns
        .iter()
        .map(|m| format!("{}: {}", m.role.to_uppercase(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extract the first `{` .. last `}` substring and parse it.
pub fn parse_reflection(raw: &str) -> ReflectionOutcome {
    let (start, end) = match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            return ReflectionOutcome::Unparsed {
                error: "no JSON object in response".to_string(),
                raw: raw.to_string(),
            }
        }
    };

    match serde_json::from_str::<Reflection>(&raw[start..=end]) {
        Ok(reflection) => ReflectionOutcome::Parsed(reflection),
        Err(e) => ReflectionOutcome::Unparsed {
            error: e.to_string(),
            raw: raw.to_string(),
        },
    }
}

/// Run the generation capability over a formatted transcript.
///
/// Generation failure is an error; an unparseable reply is not.
pub async fn reflect(
    generator: &dyn TextGenerator,
    transcript: &str,
) -> Result<ReflectionOutcome> {
    let reply = generator
        .generate(REFLECTION_PROMPT, transcript)
        .await
        .map_err(|e| HindsightError::Generation(e.to_string()))?;
    tracing::debug!(reply_chars = reply.len(), "reflection reply received");
    Ok(parse_reflection(&reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GenerationError;
    use async_trait::async_trait;

    const GOOD_REPLY: &str = r#"Sure! Here is the reflection you asked for:
{
    "context_tags": ["rust_ownership", "borrow_checker"],
    "conversation_summary": "Walked through a borrow checker error in an iterator chain",
    "what_worked": "Reducing the failing code to a three-line example",
    "what_to_avoid": "Quoting the reference instead of the user's own code"
}
Hope that helps!"#;

    #[test]
    fn parse_extracts_object_between_braces() {
        let outcome = parse_reflection(GOOD_REPLY);
        match outcome {
            ReflectionOutcome::Parsed(r) => {
                assert_eq!(r.context_tags, vec!["rust_ownership", "borrow_checker"]);
                assert!(r.conversation_summary.contains("borrow checker"));
            }
            other => panic!("expected parsed reflection, got {other:?}"),
        }
    }

    #[test]
    fn missing_field_is_unparsed() {
        let outcome = parse_reflection(r#"{"context_tags": ["a"], "what_worked": "x"}"#);
        assert!(matches!(outcome, ReflectionOutcome::Unparsed { .. }));
    }

    #[test]
    fn reply_without_braces_keeps_raw() {
        let outcome = parse_reflection("I cannot produce JSON today.");
        match outcome {
            ReflectionOutcome::Unparsed { error, raw } => {
                assert_eq!(error, "no JSON object in response");
                assert_eq!(raw, "I cannot produce JSON today.");
            }
            other => panic!("expected unparsed, got {other:?}"),
        }
    }

    #[test]
    fn transcript_skips_leading_system_message() {
        let messages = vec![
            ChatMessage::new("system", "You are a helpful assistant."),
            ChatMessage::new("user", "What is a lifetime?"),
            ChatMessage::new("assistant", "A region of code a reference is valid for."),
        ];
        let transcript = format_transcript(&messages);
        assert_eq!(
            transcript,
            "USER: What is a lifetime?\nASSISTANT: A region of code a reference is valid for."
        );
    }

    #[test]
    fn transcript_without_system_head_keeps_all_turns() {
        let messages = vec![
            ChatMessage::new("user", "hi"),
            ChatMessage::new("assistant", "hello"),
        ];
        assert_eq!(format_transcript(&messages), "USER: hi\nASSISTANT: hello");
    }

    #[test]
    fn metadata_carries_reflection_fields() {
        let outcome = parse_reflection(GOOD_REPLY);
        let metadata = outcome.to_metadata();
        assert_eq!(
            metadata["context_tags"],
            serde_json::json!(["rust_ownership", "borrow_checker"])
        );
        assert!(metadata.contains_key("what_to_avoid"));
        assert!(!metadata.contains_key("error"));
    }

    #[test]
    fn metadata_for_unparsed_carries_error_and_raw() {
        let metadata = parse_reflection("nope").to_metadata();
        assert_eq!(metadata["raw"], serde_json::json!("nope"));
        assert!(metadata.contains_key("error"));
    }

    struct CannedGenerator(&'static str);

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        async fn generate(
            &self,
            _: &str,
            _: &str,
        ) -> std::result::Result<String, GenerationError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(
            &self,
            _: &str,
            _: &str,
        ) -> std::result::Result<String, GenerationError> {
            Err(GenerationError::InvalidResponse("boom".to_string()))
        }
    }

    #[tokio::test]
    async fn reflect_parses_generator_reply() {
        let generator = CannedGenerator(GOOD_REPLY);
        let outcome = reflect(&generator, "USER: hi").await.unwrap();
        assert!(matches!(outcome, ReflectionOutcome::Parsed(_)));
    }

    #[tokio::test]
    async fn generation_failure_is_an_error() {
        let err = reflect(&FailingGenerator, "USER: hi").await.unwrap_err();
        assert!(matches!(err, HindsightError::Generation(_)));
    }
}
