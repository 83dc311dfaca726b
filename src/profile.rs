//! The student profile: identity plus academic state.

use serde::{Deserialize, Serialize};

use crate::errors::SessionError;

/// One of three fixed academic tiers. The serialized labels match the
/// records written by earlier builds, so stored profiles round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EducationLevel {
    #[serde(rename = "Primary School")]
    Primary,
    #[serde(rename = "Secondary School")]
    Secondary,
    #[serde(rename = "College / University")]
    College,
}

impl EducationLevel {
    pub const ALL: [EducationLevel; 3] = [Self::Primary, Self::Secondary, Self::College];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Primary => "Primary School",
            Self::Secondary => "Secondary School",
            Self::College => "College / University",
        }
    }

    /// Short pitch shown beside the level during onboarding.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Primary => "Simple, easy explanations for younger learners.",
            Self::Secondary => "Exam-focused steps (WAEC, JAMB, IGCSE).",
            Self::College => "Deep technical terms and academic rigor.",
        }
    }
}

impl std::fmt::Display for EducationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity and academic state for the signed-in student.
///
/// Invariant: `onboarded` implies a non-empty subject set. `question_count`
/// only ever grows; `is_premium` only ever flips false to true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub dob: String,
    /// Plaintext placeholder. There is no server-side identity check; a
    /// real identity provider would replace this whole field.
    #[serde(default)]
    pub password: String,
    pub level: EducationLevel,
    pub subjects: Vec<String>,
    pub onboarded: bool,
    pub question_count: u32,
    pub is_premium: bool,
}

/// Editable slice of the profile exposed on the profile tab.
#[derive(Debug, Clone)]
pub struct ProfileEdit {
    pub name: String,
    pub level: EducationLevel,
    pub subjects: Vec<String>,
}

impl UserProfile {
    pub fn has_contact(&self) -> bool {
        !self.email.is_empty() || !self.phone.is_empty()
    }

    /// Finish onboarding in one transaction. Rejects an empty name or an
    /// empty subject set so `Active` is never reachable without them.
    pub fn complete_onboarding(
        &mut self,
        level: EducationLevel,
        subjects: Vec<String>,
        name: String,
    ) -> Result<(), SessionError> {
        if name.trim().is_empty() {
            return Err(SessionError::IncompleteStep("display name"));
        }
        if subjects.is_empty() {
            return Err(SessionError::IncompleteStep("subject selection"));
        }
        self.level = level;
        self.subjects = subjects;
        self.name = name;
        self.onboarded = true;
        Ok(())
    }

    /// Counted once per successful tutor response or exam generation,
    /// never per attempt.
    pub fn record_question(&mut self) {
        self.question_count = self.question_count.saturating_add(1);
    }

    /// One-way transition; there is no downgrade path.
    pub fn upgrade(&mut self) {
        self.is_premium = true;
    }

    pub fn apply_edit(&mut self, edit: ProfileEdit) -> Result<(), SessionError> {
        if edit.name.trim().is_empty() {
            return Err(SessionError::IncompleteStep("display name"));
        }
        if self.onboarded && edit.subjects.is_empty() {
            return Err(SessionError::IncompleteStep("subject selection"));
        }
        self.name = edit.name;
        self.level = edit.level;
        self.subjects = edit.subjects;
        Ok(())
    }
}
