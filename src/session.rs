//! Sign-in, verification, and the strictly ordered onboarding walk.
//!
//! There is no backing identity service: credentials shape the local
//! profile and the verification code is format-checked only. The session
//! machine itself lives in [`crate::app`]; this module supplies its
//! building blocks.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog;
use crate::errors::SessionError;
use crate::profile::{EducationLevel, UserProfile};

/// Which surface the session state maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Welcome screen before any credential entry.
    Landing,
    Login,
    Otp,
    Onboarding,
    Home,
}

/// Input collected on the login surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Credentials {
    /// Identifier is an email address when it contains `@`, otherwise a
    /// phone number.
    SignIn {
        identifier: String,
        password: String,
    },
    SignUp {
        name: String,
        email: String,
        phone: String,
        username: String,
        dob: String,
        password: String,
    },
}

impl Credentials {
    /// Build the unverified profile these credentials describe. Subjects
    /// and level are settled later during onboarding.
    pub fn into_profile(self) -> Result<UserProfile, SessionError> {
        match self {
            Credentials::SignIn {
                identifier,
                password,
            } => {
                let identifier = identifier.trim().to_string();
                if identifier.is_empty() || password.is_empty() {
                    return Err(SessionError::EmptyCredential);
                }
                let (email, phone, handle) = match identifier.split_once('@') {
                    Some((local, _)) => (identifier.clone(), String::new(), local.to_string()),
                    None => (String::new(), identifier.clone(), identifier.clone()),
                };
                Ok(UserProfile {
                    email,
                    phone,
                    name: handle.clone(),
                    username: handle,
                    dob: String::new(),
                    password,
                    level: EducationLevel::Secondary,
                    subjects: vec![],
                    onboarded: false,
                    question_count: 0,
                    is_premium: false,
                })
            }
            Credentials::SignUp {
                name,
                email,
                phone,
                username,
                dob,
                password,
            } => {
                if (email.trim().is_empty() && phone.trim().is_empty()) || password.is_empty() {
                    return Err(SessionError::EmptyCredential);
                }
                let username = if username.trim().is_empty() {
                    // An email without '@' still identifies the account;
                    // use it whole, like sign-in does with its identifier.
                    match email.split_once('@') {
                        Some((local, _)) => local.to_string(),
                        None if email.trim().is_empty() => phone.trim().to_string(),
                        None => email.trim().to_string(),
                    }
                } else {
                    username
                };
                Ok(UserProfile {
                    email: email.trim().to_string(),
                    phone: phone.trim().to_string(),
                    name: if name.trim().is_empty() {
                        username.clone()
                    } else {
                        name
                    },
                    username,
                    dob,
                    password,
                    level: EducationLevel::Secondary,
                    subjects: vec![],
                    onboarded: false,
                    question_count: 0,
                    is_premium: false,
                })
            }
        }
    }
}

/// Format check only: exactly six ASCII digits. No code is ever issued,
/// so any well-formed entry passes.
pub fn verify_otp(code: &str) -> Result<(), SessionError> {
    let code = code.trim();
    if code.len() == 6 && code.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(SessionError::InvalidOtp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingStep {
    Name,
    Level,
    Subjects,
}

/// Outcome of stepping back during onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackAction {
    SteppedBack,
    /// Already on the first step; the surface returns to login.
    ExitToLogin,
}

/// The three-step onboarding walk: display name, then tier, then
/// subjects. Each step gates the next; skipping ahead is impossible.
#[derive(Debug, Clone)]
pub struct OnboardingFlow {
    step: OnboardingStep,
    name: String,
    level: Option<EducationLevel>,
    subjects: Vec<String>,
}

impl Default for OnboardingFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl OnboardingFlow {
    pub fn new() -> Self {
        Self {
            step: OnboardingStep::Name,
            name: String::new(),
            level: None,
            subjects: vec![],
        }
    }

    pub fn step(&self) -> OnboardingStep {
        self.step
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Option<EducationLevel> {
        self.level
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    /// Record the display name and advance to tier selection.
    pub fn set_name(&mut self, name: &str) -> Result<(), SessionError> {
        if self.step != OnboardingStep::Name {
            return Err(SessionError::IncompleteStep("display name"));
        }
        if name.trim().is_empty() {
            return Err(SessionError::IncompleteStep("display name"));
        }
        self.name = name.trim().to_string();
        self.step = OnboardingStep::Level;
        Ok(())
    }

    /// Pick a tier and advance to subject selection. Re-picking a
    /// different tier after stepping back discards any chosen subjects,
    /// since the subject lists differ per tier.
    pub fn choose_level(&mut self, level: EducationLevel) -> Result<(), SessionError> {
        if self.step != OnboardingStep::Level {
            return Err(SessionError::IncompleteStep("level selection"));
        }
        if self.level != Some(level) {
            self.subjects.clear();
        }
        self.level = Some(level);
        self.step = OnboardingStep::Subjects;
        debug!(%level, "onboarding level chosen");
        Ok(())
    }

    /// Add or remove one subject from the working set.
    pub fn toggle_subject(&mut self, subject: &str) -> Result<(), SessionError> {
        if self.step != OnboardingStep::Subjects {
            return Err(SessionError::IncompleteStep("subject selection"));
        }
        let level = self.level.ok_or(SessionError::IncompleteStep("level selection"))?;
        if !catalog::subjects_for_level(level).contains(&subject) {
            return Err(SessionError::UnknownSubject(subject.to_string()));
        }
        match self.subjects.iter().position(|s| s == subject) {
            Some(index) => {
                self.subjects.remove(index);
            }
            None => self.subjects.push(subject.to_string()),
        }
        Ok(())
    }

    /// Complete the walk, yielding what the profile commits in one
    /// transaction. At least one subject is required.
    pub fn finish(self) -> Result<(EducationLevel, Vec<String>, String), SessionError> {
        if self.step != OnboardingStep::Subjects {
            return Err(SessionError::IncompleteStep("subject selection"));
        }
        if self.subjects.is_empty() {
            return Err(SessionError::IncompleteStep("subject selection"));
        }
        let level = self.level.ok_or(SessionError::IncompleteStep("level selection"))?;
        Ok((level, self.subjects, self.name))
    }

    /// One step back. Chosen values persist so stepping forward again is
    /// cheap, except where a level change invalidates them.
    pub fn back(&mut self) -> BackAction {
        match self.step {
            OnboardingStep::Name => BackAction::ExitToLogin,
            OnboardingStep::Level => {
                self.step = OnboardingStep::Name;
                BackAction::SteppedBack
            }
            OnboardingStep::Subjects => {
                self.step = OnboardingStep::Level;
                BackAction::SteppedBack
            }
        }
    }
}
