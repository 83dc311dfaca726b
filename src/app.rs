//! The application core: session machine, tab surfaces, and the policies
//! that tie the gate, pipeline, exam center, and store together.

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::TutorModel;
use crate::catalog::{plan_for_level, PremiumPlan};
use crate::chat::{Attachment, ChatMessage, History};
use crate::config::Config;
use crate::errors::{Result, SessionError, TutorBrainError};
use crate::exam::{ExamCenter, PendingConfirm, TickSender};
use crate::gate::{GateDecision, UsageGate};
use crate::payment::{PaymentFlow, PaymentMethod};
use crate::profile::{ProfileEdit, UserProfile};
use crate::session::{
    verify_otp, BackAction, Credentials, OnboardingFlow, View,
};
use crate::store::StateStore;
use crate::tutor::TutorPipeline;

/// The session machine. Transitions only move forward except for sign-out,
/// which drops everything back to the landing screen.
#[derive(Debug)]
pub enum SessionState {
    Landing,
    /// Credential form open.
    Authenticating,
    /// Credentials accepted, verification code outstanding.
    OtpPending(UserProfile),
    /// Verified but the onboarding walk is unfinished.
    Onboarding {
        profile: UserProfile,
        flow: OnboardingFlow,
    },
    Active(UserProfile),
}

/// Main-surface tabs available once the session is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Chat,
    Exam,
    History,
    Bookmarks,
    Profile,
}

/// What happened to one tutor request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskOutcome {
    /// Structured reply appended; the counter advanced.
    Answered,
    /// Model call failed; the fallback apology was appended and the
    /// counter did not move.
    Fallback,
    /// The free-tier gate refused; nothing was sent.
    UpgradeRequired,
}

/// What happened to one exam generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamStartOutcome {
    /// The attempt is live; the counter advanced.
    Started,
    /// Generation or validation failed; back at topic selection.
    Failed,
    UpgradeRequired,
}

pub struct App {
    state: SessionState,
    store: StateStore,
    model: Arc<dyn TutorModel>,
    pipeline: TutorPipeline,
    gate: UsageGate,
    config: Config,
    /// Session-local conversation, both roles. Only assistant lessons are
    /// persisted into `history`.
    transcript: Vec<ChatMessage>,
    history: History,
    exam: ExamCenter,
    payment: Option<PaymentFlow>,
    tab: Tab,
    busy: bool,
}

impl App {
    /// Restore from disk: an onboarded profile resumes straight to the
    /// active session, an unfinished one resumes onboarding, and no
    /// record at all starts at the landing screen.
    pub fn new(config: Config, model: Arc<dyn TutorModel>) -> Result<Self> {
        let store = StateStore::open(&config)?;
        let history = store.load_history();
        let profile = store.load_profile();

        let state = match profile {
            Some(profile) if profile.onboarded => {
                info!(username = %profile.username, "restored session");
                SessionState::Active(profile)
            }
            Some(profile) => SessionState::Onboarding {
                profile,
                flow: OnboardingFlow::new(),
            },
            None => SessionState::Landing,
        };

        let level = match &state {
            SessionState::Active(profile) => profile.level,
            _ => crate::profile::EducationLevel::Secondary,
        };

        Ok(Self {
            exam: ExamCenter::new(level, &config.exam),
            pipeline: TutorPipeline::new(Arc::clone(&model), config.limits.history_window),
            gate: UsageGate::new(config.limits.free_question_limit),
            state,
            store,
            model,
            config,
            transcript: vec![],
            history,
            payment: None,
            tab: Tab::default(),
            busy: false,
        })
    }

    pub fn view(&self) -> View {
        match &self.state {
            SessionState::Landing => View::Landing,
            SessionState::Authenticating => View::Login,
            SessionState::OtpPending(_) => View::Otp,
            SessionState::Onboarding { .. } => View::Onboarding,
            SessionState::Active(_) => View::Home,
        }
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        match &self.state {
            SessionState::OtpPending(profile)
            | SessionState::Onboarding { profile, .. }
            | SessionState::Active(profile) => Some(profile),
            SessionState::Landing | SessionState::Authenticating => None,
        }
    }

    fn active_profile(&self) -> Result<&UserProfile> {
        match &self.state {
            SessionState::Active(profile) => Ok(profile),
            _ => Err(SessionError::NotSignedIn.into()),
        }
    }

    fn active_profile_mut(&mut self) -> Result<&mut UserProfile> {
        match &mut self.state {
            SessionState::Active(profile) => Ok(profile),
            _ => Err(SessionError::NotSignedIn.into()),
        }
    }

    // ---- Session transitions -------------------------------------------

    /// Leave the landing screen for the credential form. No side effects.
    pub fn enter(&mut self) -> Result<()> {
        if !matches!(self.state, SessionState::Landing) {
            return Err(SessionError::InvalidTransition {
                from: self.view_name(),
                to: "login",
            }
            .into());
        }
        self.state = SessionState::Authenticating;
        Ok(())
    }

    /// Accept credentials and move to verification.
    pub fn authenticate(&mut self, credentials: Credentials) -> Result<()> {
        if !matches!(self.state, SessionState::Authenticating) {
            return Err(SessionError::InvalidTransition {
                from: self.view_name(),
                to: "otp",
            }
            .into());
        }
        let profile = credentials.into_profile()?;
        info!(username = %profile.username, "credentials accepted");
        self.state = SessionState::OtpPending(profile);
        Ok(())
    }

    /// Check the verification code and start the onboarding walk. The
    /// account record is persisted from this point, so an interrupted
    /// onboarding resumes on the next startup.
    pub fn submit_otp(&mut self, code: &str) -> Result<()> {
        let SessionState::OtpPending(profile) = &self.state else {
            return Err(SessionError::InvalidTransition {
                from: self.view_name(),
                to: "onboarding",
            }
            .into());
        };
        verify_otp(code)?;
        self.store.save_profile(profile)?;
        let SessionState::OtpPending(profile) =
            std::mem::replace(&mut self.state, SessionState::Landing)
        else {
            unreachable!("matched above");
        };
        self.state = SessionState::Onboarding {
            profile,
            flow: OnboardingFlow::new(),
        };
        Ok(())
    }

    /// Abandon verification and return to the credential form.
    pub fn cancel_otp(&mut self) -> Result<()> {
        match self.state {
            SessionState::OtpPending(_) => {
                self.state = SessionState::Authenticating;
                Ok(())
            }
            _ => Err(SessionError::InvalidTransition {
                from: self.view_name(),
                to: "login",
            }
            .into()),
        }
    }

    fn onboarding_flow_mut(&mut self) -> Result<&mut OnboardingFlow> {
        match &mut self.state {
            SessionState::Onboarding { flow, .. } => Ok(flow),
            _ => Err(SessionError::IncompleteStep("onboarding").into()),
        }
    }

    pub fn onboarding_flow(&self) -> Option<&OnboardingFlow> {
        match &self.state {
            SessionState::Onboarding { flow, .. } => Some(flow),
            _ => None,
        }
    }

    pub fn submit_name(&mut self, name: &str) -> Result<()> {
        Ok(self.onboarding_flow_mut()?.set_name(name)?)
    }

    pub fn choose_level(&mut self, level: crate::profile::EducationLevel) -> Result<()> {
        Ok(self.onboarding_flow_mut()?.choose_level(level)?)
    }

    pub fn toggle_subject(&mut self, subject: &str) -> Result<()> {
        Ok(self.onboarding_flow_mut()?.toggle_subject(subject)?)
    }

    /// Step back inside onboarding; from the first step this abandons the
    /// walk entirely, removes the stored account, and signs out to the
    /// landing screen.
    pub fn onboarding_back(&mut self) -> Result<()> {
        let flow = self.onboarding_flow_mut()?;
        if flow.back() == BackAction::ExitToLogin {
            self.store.clear_profile()?;
            self.state = SessionState::Landing;
        }
        Ok(())
    }

    /// Commit the walk: the profile becomes onboarded and is persisted,
    /// and the session activates.
    pub fn finish_onboarding(&mut self) -> Result<()> {
        let SessionState::Onboarding { .. } = &self.state else {
            return Err(SessionError::IncompleteStep("onboarding").into());
        };
        let SessionState::Onboarding { mut profile, flow } =
            std::mem::replace(&mut self.state, SessionState::Landing)
        else {
            unreachable!("matched above");
        };
        let (level, subjects, name) = match flow.clone().finish() {
            Ok(parts) => parts,
            Err(e) => {
                // Restore the walk so the student can fix the input.
                self.state = SessionState::Onboarding { profile, flow };
                return Err(e.into());
            }
        };
        profile.complete_onboarding(level, subjects, name)?;
        self.store.save_profile(&profile)?;
        self.exam.set_level(profile.level);
        info!(username = %profile.username, %level, "onboarding complete");
        self.state = SessionState::Active(profile);
        Ok(())
    }

    /// Drop to login, removing the profile record and emptying the lesson
    /// history.
    pub fn sign_out(&mut self) -> Result<()> {
        self.active_profile()?;
        self.store.clear_profile()?;
        self.history.clear();
        self.store.save_history(&self.history)?;
        self.state = SessionState::Landing;
        self.transcript.clear();
        self.payment = None;
        self.exam.reset();
        self.tab = Tab::default();
        info!("signed out");
        Ok(())
    }

    fn view_name(&self) -> &'static str {
        match self.view() {
            View::Landing => "landing",
            View::Login => "login",
            View::Otp => "otp",
            View::Onboarding => "onboarding",
            View::Home => "home",
        }
    }

    // ---- Tabs and read surfaces ----------------------------------------

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn set_tab(&mut self, tab: Tab) -> Result<()> {
        self.active_profile()?;
        self.tab = tab;
        Ok(())
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn exam(&self) -> &ExamCenter {
        &self.exam
    }

    /// Free questions left, or `None` for premium.
    pub fn questions_remaining(&self) -> Option<u32> {
        self.profile().and_then(|p| self.gate.remaining(p))
    }

    // ---- Tutor requests -------------------------------------------------

    /// Run one tutor request end to end: gate, pipeline, transcript,
    /// history, counter, persistence.
    pub async fn ask_tutor(
        &mut self,
        question: &str,
        attachments: Vec<Attachment>,
    ) -> Result<AskOutcome> {
        let profile = self.active_profile()?;
        if self.busy {
            return Err(TutorBrainError::Busy);
        }
        if question.trim().is_empty() && attachments.is_empty() {
            return Err(TutorBrainError::NothingToSend);
        }
        if self.gate.check(profile) == GateDecision::UpgradeRequired {
            info!("free question limit reached");
            return Ok(AskOutcome::UpgradeRequired);
        }
        let level = profile.level;

        self.busy = true;
        let result = self
            .pipeline
            .ask(question, attachments.clone(), level, &self.transcript)
            .await;
        self.busy = false;

        match result {
            Ok((user, assistant)) => {
                self.transcript.push(user);
                self.history.record(assistant.clone());
                self.transcript.push(assistant);

                self.active_profile_mut()?.record_question();
                let profile = self.active_profile()?.clone();
                self.store.save_profile(&profile)?;
                self.store.save_history(&self.history)?;
                Ok(AskOutcome::Answered)
            }
            Err(e) => {
                warn!(error = %e, "tutor request failed");
                // The echo and the apology stay session-local; neither is
                // persisted and the counter does not move.
                self.transcript.push(ChatMessage::user(question, attachments));
                self.transcript.push(ChatMessage::fallback());
                Ok(AskOutcome::Fallback)
            }
        }
    }

    /// Flip a lesson bookmark and persist the history.
    pub fn toggle_bookmark(&mut self, id: &str) -> Result<bool> {
        self.active_profile()?;
        let found = self.history.toggle_bookmark(id);
        if found {
            self.store.save_history(&self.history)?;
        }
        Ok(found)
    }

    // ---- Exam lifecycle --------------------------------------------------

    /// Generate a paper for the staged topic and start the attempt.
    /// Generation counts against the free tier exactly like a tutor
    /// question, and only on success.
    pub async fn start_exam(
        &mut self,
        topic: &str,
        ticks: Option<TickSender>,
    ) -> Result<ExamStartOutcome> {
        let profile = self.active_profile()?;
        if self.busy {
            return Err(TutorBrainError::Busy);
        }
        if self.gate.check(profile) == GateDecision::UpgradeRequired {
            info!("free question limit reached");
            return Ok(ExamStartOutcome::UpgradeRequired);
        }
        let level = profile.level;

        self.exam.begin_generation(topic)?;
        self.busy = true;
        let result = self.model.generate_exam(topic, level).await;
        self.busy = false;

        let questions = match result {
            Ok(questions) => questions,
            Err(e) => {
                warn!(error = %e, topic, "exam generation failed");
                self.exam.generation_failed();
                return Ok(ExamStartOutcome::Failed);
            }
        };
        if let Err(e) = self.exam.install_exam(questions, ticks) {
            warn!(error = %e, topic, "generated paper rejected");
            return Ok(ExamStartOutcome::Failed);
        }

        self.active_profile_mut()?.record_question();
        let profile = self.active_profile()?.clone();
        self.store.save_profile(&profile)?;
        Ok(ExamStartOutcome::Started)
    }

    pub fn select_exam_department(&mut self, department: crate::catalog::Department) -> Result<()> {
        self.active_profile()?;
        Ok(self.exam.select_department(department)?)
    }

    pub fn select_exam_course(&mut self, course: &str) -> Result<()> {
        self.active_profile()?;
        Ok(self.exam.select_course(course)?)
    }

    pub fn exam_back(&mut self) -> Result<()> {
        self.active_profile()?;
        self.exam.back();
        Ok(())
    }

    pub fn select_answer(&mut self, option: usize) -> Result<()> {
        Ok(self.exam.select_answer(option)?)
    }

    pub fn next_question(&mut self) -> Result<()> {
        Ok(self.exam.next_question()?)
    }

    pub fn previous_question(&mut self) -> Result<()> {
        Ok(self.exam.previous_question()?)
    }

    pub fn request_submit_exam(&mut self) -> Result<()> {
        Ok(self.exam.request_submit()?)
    }

    pub fn request_abandon_exam(&mut self) -> Result<()> {
        Ok(self.exam.request_abandon()?)
    }

    pub fn confirm_exam_action(&mut self) -> Result<PendingConfirm> {
        Ok(self.exam.confirm_pending()?)
    }

    pub fn cancel_exam_action(&mut self) -> Result<()> {
        Ok(self.exam.cancel_pending()?)
    }

    /// Apply one countdown tick from the timer channel.
    pub fn handle_exam_tick(&mut self) {
        self.exam.tick();
    }

    pub fn retake_exam(&mut self) -> Result<()> {
        Ok(self.exam.retake()?)
    }

    pub fn exit_exam(&mut self) -> Result<()> {
        Ok(self.exam.exit_to_top()?)
    }

    // ---- Premium upgrade --------------------------------------------------

    /// The plan offered at the signed-in student's tier.
    pub fn offered_plan(&self) -> Result<PremiumPlan> {
        Ok(plan_for_level(self.active_profile()?.level))
    }

    /// Open checkout for the tier's plan. Premium accounts have nothing
    /// to buy.
    pub fn open_payment(&mut self) -> Result<&PaymentFlow> {
        let profile = self.active_profile()?;
        if profile.is_premium {
            return Err(SessionError::PaymentNotOpen.into());
        }
        let plan = plan_for_level(profile.level);
        self.payment = Some(PaymentFlow::new(plan, &self.config.payment));
        Ok(self.payment.as_ref().ok_or(SessionError::PaymentNotOpen)?)
    }

    pub fn payment(&self) -> Option<&PaymentFlow> {
        self.payment.as_ref()
    }

    /// Run the simulated settlement and upgrade the account.
    pub async fn process_payment(&mut self, method: PaymentMethod) -> Result<()> {
        self.active_profile()?;
        let flow = self
            .payment
            .as_mut()
            .ok_or(SessionError::PaymentNotOpen)?;
        flow.process(method).await;

        let profile = self.active_profile_mut()?;
        profile.upgrade();
        let profile = profile.clone();
        self.store.save_profile(&profile)?;
        info!(username = %profile.username, "account upgraded");
        Ok(())
    }

    /// Dismiss the checkout, settled or not. An unsettled close changes
    /// nothing.
    pub fn close_payment(&mut self) {
        self.payment = None;
    }

    // ---- Profile edits ----------------------------------------------------

    /// Apply a profile-tab edit. A tier change resets the exam center so
    /// no attempt survives under the wrong catalog.
    pub fn edit_profile(&mut self, edit: ProfileEdit) -> Result<()> {
        let profile = self.active_profile_mut()?;
        profile.apply_edit(edit)?;
        let profile = profile.clone();
        self.exam.set_level(profile.level);
        self.store.save_profile(&profile)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AskRequest;
    use crate::errors::ApiError;
    use crate::exam::QuizQuestion;
    use crate::profile::EducationLevel;
    use crate::tutor::StructuredTutorResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    struct FakeModel {
        fail: AtomicBool,
    }

    impl FakeModel {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fail: AtomicBool::new(false),
            })
        }

        fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl TutorModel for FakeModel {
        async fn ask(&self, request: AskRequest) -> std::result::Result<StructuredTutorResponse, ApiError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ApiError::Timeout);
            }
            Ok(StructuredTutorResponse {
                meaning: format!("About: {}", request.question),
                key_concepts: vec!["concept".to_string()],
                steps: vec!["step".to_string()],
                examples: vec!["example".to_string()],
                summary: "Summary.".to_string(),
                practice: "Practice.".to_string(),
                quiz: None,
                outline: None,
            })
        }

        async fn generate_exam(
            &self,
            _subject: &str,
            _level: EducationLevel,
        ) -> std::result::Result<Vec<QuizQuestion>, ApiError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ApiError::Timeout);
            }
            Ok((0..20)
                .map(|i| QuizQuestion {
                    id: format!("q{i}"),
                    question: format!("Q{i}"),
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct_index: 0,
                    explanation: "e".to_string(),
                    workings: vec![],
                })
                .collect())
        }
    }

    fn test_config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.storage.data_dir = Some(dir.path().to_path_buf());
        config.payment.settlement_delay_ms = 0;
        config
    }

    fn signed_in_app(dir: &TempDir, model: Arc<FakeModel>) -> App {
        let mut app = App::new(test_config(dir), model).unwrap();
        app.enter().unwrap();
        app.authenticate(Credentials::SignIn {
            identifier: "ada@example.com".to_string(),
            password: "pw".to_string(),
        })
        .unwrap();
        app.submit_otp("123456").unwrap();
        app.submit_name("Ada").unwrap();
        app.choose_level(EducationLevel::Secondary).unwrap();
        app.toggle_subject("Physics").unwrap();
        app.finish_onboarding().unwrap();
        app
    }

    #[test]
    fn test_full_sign_in_walk() {
        let dir = TempDir::new().unwrap();
        let mut app = App::new(test_config(&dir), FakeModel::new()).unwrap();
        assert_eq!(app.view(), View::Landing);

        // Credentials are not accepted straight off the landing screen.
        assert!(app
            .authenticate(Credentials::SignIn {
                identifier: "ada@example.com".to_string(),
                password: "pw".to_string(),
            })
            .is_err());
        app.enter().unwrap();
        assert_eq!(app.view(), View::Login);

        app.authenticate(Credentials::SignIn {
            identifier: "ada@example.com".to_string(),
            password: "pw".to_string(),
        })
        .unwrap();
        assert_eq!(app.view(), View::Otp);

        assert!(app.submit_otp("12x456").is_err());
        app.submit_otp("000000").unwrap();
        assert_eq!(app.view(), View::Onboarding);

        app.submit_name("Ada").unwrap();
        app.choose_level(EducationLevel::Secondary).unwrap();
        app.toggle_subject("Chemistry").unwrap();
        // Completion is blocked until at least one subject is chosen.
        app.toggle_subject("Chemistry").unwrap();
        assert!(app.finish_onboarding().is_err());
        assert_eq!(app.view(), View::Onboarding);
        app.toggle_subject("Chemistry").unwrap();
        app.finish_onboarding().unwrap();
        assert_eq!(app.view(), View::Home);
        assert_eq!(app.profile().unwrap().name, "Ada");
        assert_eq!(app.questions_remaining(), Some(5));
    }

    #[test]
    fn test_interrupted_onboarding_survives_restart() {
        let dir = TempDir::new().unwrap();
        {
            let mut app = App::new(test_config(&dir), FakeModel::new()).unwrap();
            app.enter().unwrap();
            app.authenticate(Credentials::SignIn {
                identifier: "ada@example.com".to_string(),
                password: "pw".to_string(),
            })
            .unwrap();
            app.submit_otp("123456").unwrap();
            app.submit_name("Ada").unwrap();
        }

        // The account exists from OTP acceptance; onboarding restarts.
        let app = App::new(test_config(&dir), FakeModel::new()).unwrap();
        assert_eq!(app.view(), View::Onboarding);
        assert_eq!(app.profile().unwrap().username, "ada");
        assert!(!app.profile().unwrap().onboarded);
    }

    #[test]
    fn test_restore_resumes_active_session() {
        let dir = TempDir::new().unwrap();
        let model = FakeModel::new();
        {
            signed_in_app(&dir, Arc::clone(&model));
        }
        let app = App::new(test_config(&dir), model).unwrap();
        assert_eq!(app.view(), View::Home);
        assert_eq!(app.profile().unwrap().name, "Ada");
    }

    #[tokio::test]
    async fn test_ask_advances_counter_and_persists() {
        let dir = TempDir::new().unwrap();
        let mut app = signed_in_app(&dir, FakeModel::new());

        let outcome = app.ask_tutor("What is a force?", vec![]).await.unwrap();
        assert_eq!(outcome, AskOutcome::Answered);
        assert_eq!(app.transcript().len(), 2);
        assert_eq!(app.history().len(), 1);
        assert_eq!(app.questions_remaining(), Some(4));

        // Reloads see both the counter and the lesson.
        let reopened = App::new(test_config(&dir), FakeModel::new()).unwrap();
        assert_eq!(reopened.profile().unwrap().question_count, 1);
        assert_eq!(reopened.history().len(), 1);
    }

    #[tokio::test]
    async fn test_ask_failure_appends_fallback_without_counting() {
        let dir = TempDir::new().unwrap();
        let model = FakeModel::new();
        let mut app = signed_in_app(&dir, Arc::clone(&model));
        model.set_failing(true);

        let outcome = app.ask_tutor("hello?", vec![]).await.unwrap();
        assert_eq!(outcome, AskOutcome::Fallback);
        assert_eq!(app.transcript().len(), 2);
        assert_eq!(
            app.transcript()[1].content,
            crate::chat::FALLBACK_REPLY
        );
        assert_eq!(app.questions_remaining(), Some(5));
        assert!(app.history().is_empty());
    }

    #[tokio::test]
    async fn test_empty_ask_rejected() {
        let dir = TempDir::new().unwrap();
        let mut app = signed_in_app(&dir, FakeModel::new());
        assert!(matches!(
            app.ask_tutor("   ", vec![]).await,
            Err(TutorBrainError::NothingToSend)
        ));
        assert!(app.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_gate_blocks_sixth_question() {
        let dir = TempDir::new().unwrap();
        let mut app = signed_in_app(&dir, FakeModel::new());

        for _ in 0..5 {
            assert_eq!(
                app.ask_tutor("q", vec![]).await.unwrap(),
                AskOutcome::Answered
            );
        }
        assert_eq!(
            app.ask_tutor("q", vec![]).await.unwrap(),
            AskOutcome::UpgradeRequired
        );
        // Nothing appended for the refused request.
        assert_eq!(app.transcript().len(), 10);
    }

    #[tokio::test]
    async fn test_upgrade_unlocks_the_gate() {
        let dir = TempDir::new().unwrap();
        let mut app = signed_in_app(&dir, FakeModel::new());
        for _ in 0..5 {
            app.ask_tutor("q", vec![]).await.unwrap();
        }

        app.open_payment().unwrap();
        assert_eq!(app.offered_plan().unwrap().name, "Exam Success");
        app.process_payment(PaymentMethod::Card).await.unwrap();
        assert!(app.payment().unwrap().settled());
        app.close_payment();

        assert!(app.profile().unwrap().is_premium);
        assert_eq!(app.questions_remaining(), None);
        assert_eq!(
            app.ask_tutor("q", vec![]).await.unwrap(),
            AskOutcome::Answered
        );

        // Premium survives a restart.
        drop(app);
        let reopened = App::new(test_config(&dir), FakeModel::new()).unwrap();
        assert!(reopened.profile().unwrap().is_premium);
    }

    #[tokio::test]
    async fn test_unsettled_close_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut app = signed_in_app(&dir, FakeModel::new());
        app.open_payment().unwrap();
        app.close_payment();
        assert!(!app.profile().unwrap().is_premium);
        assert!(matches!(
            app.process_payment(PaymentMethod::Card).await,
            Err(TutorBrainError::Session(SessionError::PaymentNotOpen))
        ));
    }

    #[tokio::test]
    async fn test_exam_generation_counts_against_gate() {
        let dir = TempDir::new().unwrap();
        let mut app = signed_in_app(&dir, FakeModel::new());
        app.select_exam_department(crate::catalog::Department::Science)
            .unwrap();

        let outcome = app.start_exam("Physics", None).await.unwrap();
        assert_eq!(outcome, ExamStartOutcome::Started);
        assert_eq!(app.questions_remaining(), Some(4));
        assert!(app.exam().active().is_some());
    }

    #[tokio::test]
    async fn test_failed_generation_returns_to_selection_uncounted() {
        let dir = TempDir::new().unwrap();
        let model = FakeModel::new();
        let mut app = signed_in_app(&dir, Arc::clone(&model));
        app.select_exam_department(crate::catalog::Department::Science)
            .unwrap();
        model.set_failing(true);

        let outcome = app.start_exam("Physics", None).await.unwrap();
        assert_eq!(outcome, ExamStartOutcome::Failed);
        assert_eq!(app.questions_remaining(), Some(5));
        assert!(app.exam().active().is_none());
    }

    #[tokio::test]
    async fn test_exam_submit_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut app = signed_in_app(&dir, FakeModel::new());
        app.select_exam_department(crate::catalog::Department::Science)
            .unwrap();
        app.start_exam("Physics", None).await.unwrap();

        app.select_answer(0).unwrap(); // correct
        app.next_question().unwrap();
        app.select_answer(1).unwrap(); // wrong
        app.request_submit_exam().unwrap();
        assert_eq!(app.confirm_exam_action().unwrap(), PendingConfirm::Submit);

        let report = app.exam().report().unwrap();
        assert_eq!(report.score, 1);
        assert_eq!(report.percentage, 5);
        app.retake_exam().unwrap();
    }

    #[tokio::test]
    async fn test_sign_out_clears_both_records() {
        let dir = TempDir::new().unwrap();
        let mut app = signed_in_app(&dir, FakeModel::new());
        app.ask_tutor("q", vec![]).await.unwrap();
        app.sign_out().unwrap();
        assert_eq!(app.view(), View::Landing);
        assert!(app.transcript().is_empty());
        assert!(app.history().is_empty());

        let reopened = App::new(test_config(&dir), FakeModel::new()).unwrap();
        assert_eq!(reopened.view(), View::Landing);
        assert!(reopened.history().is_empty());
    }

    #[test]
    fn test_level_edit_resets_exam_center() {
        let dir = TempDir::new().unwrap();
        let mut app = signed_in_app(&dir, FakeModel::new());
        app.select_exam_department(crate::catalog::Department::Science)
            .unwrap();

        app.edit_profile(ProfileEdit {
            name: "Ada".to_string(),
            level: EducationLevel::College,
            subjects: vec!["Law".to_string()],
        })
        .unwrap();
        assert_eq!(
            app.exam().stage(),
            crate::exam::TopicStage::Courses
        );
    }

    #[test]
    fn test_tabs_require_active_session() {
        let dir = TempDir::new().unwrap();
        let mut app = App::new(test_config(&dir), FakeModel::new()).unwrap();
        assert!(app.set_tab(Tab::History).is_err());

        let mut app = signed_in_app(&dir, FakeModel::new());
        app.set_tab(Tab::Exam).unwrap();
        assert_eq!(app.tab(), Tab::Exam);
    }

    #[test]
    fn test_onboarding_back_exits_to_landing() {
        let dir = TempDir::new().unwrap();
        let mut app = App::new(test_config(&dir), FakeModel::new()).unwrap();
        app.enter().unwrap();
        app.authenticate(Credentials::SignIn {
            identifier: "ada@example.com".to_string(),
            password: "pw".to_string(),
        })
        .unwrap();
        app.submit_otp("123456").unwrap();
        app.onboarding_back().unwrap();
        assert_eq!(app.view(), View::Landing);

        // The abandoned account record is gone on the next startup.
        let reopened = App::new(test_config(&dir), FakeModel::new()).unwrap();
        assert_eq!(reopened.view(), View::Landing);
    }

    #[test]
    fn test_otp_can_be_cancelled_back_to_login() {
        let dir = TempDir::new().unwrap();
        let mut app = App::new(test_config(&dir), FakeModel::new()).unwrap();
        assert!(app.cancel_otp().is_err());

        app.enter().unwrap();
        app.authenticate(Credentials::SignIn {
            identifier: "ada@example.com".to_string(),
            password: "pw".to_string(),
        })
        .unwrap();
        app.cancel_otp().unwrap();
        assert_eq!(app.view(), View::Login);
    }

    #[tokio::test]
    async fn test_bookmark_persists() {
        let dir = TempDir::new().unwrap();
        let mut app = signed_in_app(&dir, FakeModel::new());
        app.ask_tutor("q", vec![]).await.unwrap();
        let id = app.history().messages()[0].id.clone();

        assert!(app.toggle_bookmark(&id).unwrap());
        assert!(!app.toggle_bookmark("missing").unwrap());

        let reopened = App::new(test_config(&dir), FakeModel::new()).unwrap();
        assert!(reopened.history().messages()[0].bookmarked);
    }
}
