//! Client for the external tutoring collaborator.
//!
//! Two request/response operations, no streaming, no partial results, and
//! no automatic retry: every failure collapses to one user-visible message
//! and recovery is user-initiated.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::chat::Attachment;
use crate::config::Config;
use crate::errors::{ApiError, TutorBrainError};
use crate::exam::QuizQuestion;
use crate::profile::EducationLevel;
use crate::tutor::StructuredTutorResponse;

pub mod types;

use types::*;

/// Inputs for one tutor ask round-trip.
#[derive(Debug, Clone)]
pub struct AskRequest {
    /// May be empty when at least one attachment is present.
    pub question: String,
    pub level: EducationLevel,
    /// Trailing transcript entries, oldest-first.
    pub history: Vec<String>,
    pub attachments: Vec<Attachment>,
}

/// Trait abstraction over the tutoring collaborator, enabling test mocking.
#[async_trait]
pub trait TutorModel: Send + Sync {
    /// One structured explanation for a student question.
    async fn ask(&self, request: AskRequest) -> Result<StructuredTutorResponse, ApiError>;

    /// A full multiple-choice exam paper for a subject at a level.
    async fn generate_exam(
        &self,
        subject: &str,
        level: EducationLevel,
    ) -> Result<Vec<QuizQuestion>, ApiError>;
}

fn system_instruction(level: EducationLevel) -> String {
    format!(
        "You are \"Teacher's Brain\", a high-performance, professional AI academic assistant.\n\
         Current Student Level: {level}.\n\
         \n\
         Provide standard professional academic support across these categories:\n\
         1. TOPIC EXPLANATIONS: full-depth professional definitions.\n\
         2. ASSIGNMENTS & PROJECTS: structured guidance and research summaries.\n\
         3. ESSAYS, TERM PAPERS & REPORTS: formal outlines and comprehensive drafts.\n\
         4. MATH & CALCULATIONS: rigorous step-by-step workings with clear logical transitions.\n\
         5. EXAM PRACTICE (CBT): professional multiple-choice questions relevant to the topic.\n\
         \n\
         RESPONSE GUIDELINES:\n\
         - Use formal, professional academic English.\n\
         - For Math: ensure every step is explicitly derived.\n\
         - For Essays: always include a 'meaning' (Thesis/Abstract) and an 'outline'.\n\
         \n\
         ALWAYS return a single JSON object with fields: meaning, keyConcepts,\n\
         steps, examples, summary, practice, and optionally quiz (question,\n\
         options[4], correctIndex) and outline."
    )
}

fn exam_prompt(subject: &str, level: EducationLevel, count: usize) -> String {
    format!(
        "Generate a comprehensive set of {count} professional multiple-choice CBT exam \
         questions for {subject} at {level} level. Ensure a mix of difficulty levels. \
         Each question must include a professional explanation and concise step-by-step \
         workings if applicable. Return a JSON array of objects with fields: id, \
         question, options[4], correctIndex, explanation, workings."
    )
}

/// HTTP client for the `generateContent`-style endpoint.
pub struct ApiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    exam_question_count: usize,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, TutorBrainError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TutorBrainError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            exam_question_count: config.exam.question_count,
        })
    }

    /// Send one generate request and return the first candidate's text.
    async fn generate(&self, request: &GenerateContentRequest) -> Result<String, ApiError> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        debug!(%url, "sending generate request");

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.query(&[("key", key.as_str())]);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout
            } else {
                ApiError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let envelope: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| ApiError::Parse(e.to_string()))?;
        envelope
            .text()
            .map(str::to_owned)
            .ok_or_else(|| ApiError::Schema("response carried no text candidate".to_string()))
    }
}

#[async_trait]
impl TutorModel for ApiClient {
    async fn ask(&self, request: AskRequest) -> Result<StructuredTutorResponse, ApiError> {
        let mut parts = vec![Part::text(if request.question.trim().is_empty() {
            "Please provide professional academic support for this request.".to_string()
        } else {
            request.question.clone()
        })];
        for attachment in &request.attachments {
            parts.push(Part::inline(attachment.payload(), &attachment.mime_type));
        }

        let mut contents: Vec<Content> = request
            .history
            .iter()
            .map(|h| Content::user_text(h.clone()))
            .collect();
        contents.push(Content::user(parts));

        let wire = GenerateContentRequest {
            system_instruction: Some(Content::system(system_instruction(request.level))),
            contents,
            generation_config: GenerationConfig::json(),
        };

        let text = self.generate(&wire).await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Schema(e.to_string()))
    }

    async fn generate_exam(
        &self,
        subject: &str,
        level: EducationLevel,
    ) -> Result<Vec<QuizQuestion>, ApiError> {
        let wire = GenerateContentRequest {
            system_instruction: None,
            contents: vec![Content::user_text(exam_prompt(
                subject,
                level,
                self.exam_question_count,
            ))],
            generation_config: GenerationConfig::json(),
        };

        let text = self.generate(&wire).await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Schema(e.to_string()))
    }
}
