use thiserror::Error;

/// The central error type for the Teacher's Brain core.
///
/// This hierarchy enables programmatic recovery and unified handling across
/// the session machine, tutor pipeline, exam lifecycle, and storage layers.
/// None of these are fatal to the application; everything user-visible
/// collapses to a short inline message at the surface.
#[derive(Error, Debug)]
pub enum TutorBrainError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Exam error: {0}")]
    Exam(#[from] ExamError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Free question limit reached; upgrade required")]
    UpgradeRequired,

    #[error("Another request is already in flight")]
    Busy,

    #[error("Question text or at least one attachment is required")]
    NothingToSend,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request timed out")]
    Timeout,

    #[error("API returned status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to parse model response: {0}")]
    Parse(String),

    #[error("model response missing required structure: {0}")]
    Schema(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("credential input must not be empty")]
    EmptyCredential,

    #[error("verification code must be exactly 6 digits")]
    InvalidOtp,

    #[error("onboarding step incomplete: {0}")]
    IncompleteStep(&'static str),

    #[error("subject '{0}' is not offered at this level")]
    UnknownSubject(String),

    #[error("invalid view transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("no signed-in profile")]
    NotSignedIn,

    #[error("no payment flow is open")]
    PaymentNotOpen,
}

#[derive(Error, Debug)]
pub enum ExamError {
    #[error("CBT exams are not available at the {level} level")]
    NotAvailable { level: String },

    #[error("'{0}' is not an offered exam topic")]
    UnknownTopic(String),

    #[error("exam generation returned {got} questions, expected {expected}")]
    WrongQuestionCount { got: usize, expected: usize },

    #[error("generated question {index} is malformed")]
    MalformedQuestion { index: usize },

    #[error("no exam is in progress")]
    NotInProgress,

    #[error("option index {index} is out of range")]
    OptionOutOfRange { index: usize },

    #[error("no exam action is awaiting confirmation")]
    NothingPending,

    #[error("not at the {0} stage of topic selection")]
    WrongStage(&'static str),
}

pub type Result<T> = std::result::Result<T, TutorBrainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::HttpStatus {
            status: 503,
            message: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "API returned status 503: overloaded");
    }

    #[test]
    fn test_wrapping_preserves_source() {
        let err: TutorBrainError = ApiError::Timeout.into();
        assert!(matches!(err, TutorBrainError::Api(ApiError::Timeout)));
    }

    #[test]
    fn test_exam_error_display() {
        let err = ExamError::WrongQuestionCount {
            got: 17,
            expected: 20,
        };
        assert!(err.to_string().contains("17"));
        assert!(err.to_string().contains("20"));
    }
}
