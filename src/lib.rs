//! Core engine for Teacher's Brain, an AI-backed study assistant.
//!
//! The crate owns everything behind the surface: the session machine
//! (sign-in, verification, onboarding), the tutor request pipeline with
//! its structured reply schema, the free-tier usage gate, the timed CBT
//! exam center, the simulated premium checkout, and file-backed
//! persistence for the profile and lesson history. A UI embeds [`app::App`]
//! and renders whatever view and tab it reports.

pub mod api;
pub mod app;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod errors;
pub mod exam;
pub mod gate;
pub mod payment;
pub mod profile;
pub mod session;
pub mod store;
pub mod telemetry;
pub mod tutor;

pub use app::{App, AskOutcome, ExamStartOutcome, SessionState, Tab};
pub use config::Config;
pub use errors::{Result, TutorBrainError};
pub use profile::{EducationLevel, UserProfile};
