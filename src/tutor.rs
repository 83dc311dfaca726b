//! The tutor request/response pipeline and the structured reply schema.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::{AskRequest, TutorModel};
use crate::chat::{Attachment, ChatMessage};
use crate::errors::{ApiError, Result};
use crate::profile::EducationLevel;

/// The parsed model reply. Externally produced content, treated as opaque;
/// the only contract enforced locally is the shape below. Field names match
/// the collaborator's JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredTutorResponse {
    /// Thesis statement, abstract, or full definition.
    pub meaning: String,
    pub key_concepts: Vec<String>,
    pub steps: Vec<String>,
    pub examples: Vec<String>,
    pub summary: String,
    /// A short-answer challenge for the student.
    pub practice: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<EmbeddedQuiz>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<Vec<String>>,
}

/// Single multiple-choice question embedded in a tutor reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedQuiz {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
}

impl StructuredTutorResponse {
    /// Fail closed on a malformed reply instead of accepting a partial
    /// object. Missing required fields are already rejected during
    /// deserialization; this checks the parts serde cannot express.
    pub fn validate(&self) -> std::result::Result<(), ApiError> {
        if let Some(quiz) = &self.quiz {
            if quiz.options.len() != 4 {
                return Err(ApiError::Schema(format!(
                    "embedded quiz has {} options, expected 4",
                    quiz.options.len()
                )));
            }
            if quiz.correct_index >= quiz.options.len() {
                return Err(ApiError::Schema(format!(
                    "embedded quiz correct index {} out of range",
                    quiz.correct_index
                )));
            }
        }
        Ok(())
    }
}

/// Builds tutor requests from user input plus recent transcript context and
/// maps the structured reply into transcript entries.
pub struct TutorPipeline {
    model: Arc<dyn TutorModel>,
    history_window: usize,
}

impl TutorPipeline {
    pub fn new(model: Arc<dyn TutorModel>, history_window: usize) -> Self {
        Self {
            model,
            history_window,
        }
    }

    /// Run one ask round-trip. On success returns the user echo followed by
    /// the assistant reply, ready to append in that order. Failure mapping
    /// to the fallback message is the caller's job so the counter policy
    /// stays in one place.
    pub async fn ask(
        &self,
        question: &str,
        attachments: Vec<Attachment>,
        level: EducationLevel,
        transcript: &[ChatMessage],
    ) -> Result<(ChatMessage, ChatMessage)> {
        let history = trailing_context(transcript, self.history_window);
        debug!(
            question_len = question.len(),
            attachments = attachments.len(),
            context = history.len(),
            "dispatching tutor request"
        );

        let reply = self
            .model
            .ask(AskRequest {
                question: question.to_string(),
                level,
                history,
                attachments: attachments.clone(),
            })
            .await?;
        reply.validate()?;

        let user = ChatMessage::user(question, attachments);
        let assistant = ChatMessage::assistant(reply);
        Ok((user, assistant))
    }
}

/// The last `window` transcript entries' text, oldest-first.
fn trailing_context(transcript: &[ChatMessage], window: usize) -> Vec<String> {
    let start = transcript.len().saturating_sub(window);
    transcript[start..].iter().map(|m| m.content.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Role;

    fn reply_json() -> &'static str {
        r#"{
            "meaning": "Photosynthesis is the conversion of light energy to chemical energy.",
            "keyConcepts": ["Chlorophyll", "Glucose"],
            "steps": ["Light absorption", "Carbon fixation"],
            "examples": ["Leaf cells in sunlight"],
            "summary": "Plants make food from light.",
            "practice": "State the word equation for photosynthesis.",
            "quiz": {
                "question": "Where does photosynthesis occur?",
                "options": ["Mitochondria", "Chloroplast", "Nucleus", "Ribosome"],
                "correctIndex": 1
            },
            "outline": ["Introduction", "Mechanism", "Conclusion"]
        }"#
    }

    #[test]
    fn test_reply_parses_camel_case_fields() {
        let reply: StructuredTutorResponse = serde_json::from_str(reply_json()).unwrap();
        assert_eq!(reply.key_concepts.len(), 2);
        assert_eq!(reply.quiz.as_ref().unwrap().correct_index, 1);
        assert!(reply.validate().is_ok());
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        // No "summary" — deserialization must fail, never a partial object.
        let json = r#"{
            "meaning": "x", "keyConcepts": [], "steps": [],
            "examples": [], "practice": "y"
        }"#;
        assert!(serde_json::from_str::<StructuredTutorResponse>(json).is_err());
    }

    #[test]
    fn test_optional_fields_may_be_absent() {
        let json = r#"{
            "meaning": "x", "keyConcepts": ["a"], "steps": ["s"],
            "examples": ["e"], "summary": "sum", "practice": "p"
        }"#;
        let reply: StructuredTutorResponse = serde_json::from_str(json).unwrap();
        assert!(reply.quiz.is_none());
        assert!(reply.outline.is_none());
        assert!(reply.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_quiz_shape() {
        let mut reply: StructuredTutorResponse = serde_json::from_str(reply_json()).unwrap();
        reply.quiz.as_mut().unwrap().options.pop();
        assert!(reply.validate().is_err());

        let mut reply: StructuredTutorResponse = serde_json::from_str(reply_json()).unwrap();
        reply.quiz.as_mut().unwrap().correct_index = 4;
        assert!(reply.validate().is_err());
    }

    #[test]
    fn test_trailing_context_keeps_order_and_window() {
        let transcript: Vec<ChatMessage> = (0..6)
            .map(|i| ChatMessage::user(format!("turn {i}"), vec![]))
            .collect();
        let context = trailing_context(&transcript, 4);
        assert_eq!(context, vec!["turn 2", "turn 3", "turn 4", "turn 5"]);

        let short = trailing_context(&transcript[..2], 4);
        assert_eq!(short, vec!["turn 0", "turn 1"]);
    }

    #[test]
    fn test_user_echo_precedes_assistant_reply() {
        // Shape check on the pair construction without a live model.
        let reply: StructuredTutorResponse = serde_json::from_str(reply_json()).unwrap();
        let user = ChatMessage::user("Explain photosynthesis", vec![]);
        let assistant = ChatMessage::assistant(reply);
        assert_eq!(user.role, Role::User);
        assert_eq!(assistant.role, Role::Assistant);
        assert_eq!(assistant.content, "Plants make food from light.");
    }
}
