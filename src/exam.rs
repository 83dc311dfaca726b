//! The CBT exam center: topic selection, timed attempts, and reports.
//!
//! One attempt at a time. The lifecycle is a strict loop: topic selection,
//! generation, in-progress, submitted, back to topic selection. Answers are
//! graded only at submission; nothing about an attempt outlives its report.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::catalog::{self, Department};
use crate::config::ExamConfig;
use crate::errors::ExamError;
use crate::profile::EducationLevel;

/// One generated multiple-choice question. Field names match the
/// collaborator's JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: String,
    /// Step-by-step derivation, possibly empty for non-quantitative topics.
    pub workings: Vec<String>,
}

/// Channel end the countdown task pushes one-per-second ticks into.
pub type TickSender = UnboundedSender<()>;

/// Countdown task handle. Emits one tick per second until cancelled;
/// dropping the handle cancels the task.
#[derive(Debug)]
pub struct ExamTimer {
    handle: JoinHandle<()>,
}

impl ExamTimer {
    /// Must be called from within a tokio runtime.
    fn spawn(ticks: TickSender) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // The first tick of a tokio interval fires immediately; burn it
            // so the countdown starts one full second after installation.
            interval.tick().await;
            loop {
                interval.tick().await;
                if ticks.send(()).is_err() {
                    break;
                }
            }
        });
        Self { handle }
    }

    fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for ExamTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Destructive exam action awaiting explicit confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingConfirm {
    /// Grade the attempt and show the report.
    Submit,
    /// Discard the attempt entirely.
    Abandon,
}

/// A live attempt. Created by [`ExamCenter::install_exam`], consumed by
/// submission or abandonment.
#[derive(Debug)]
pub struct ActiveExam {
    subject: String,
    questions: Vec<QuizQuestion>,
    current: usize,
    answers: HashMap<usize, usize>,
    remaining_secs: u32,
    pending: Option<PendingConfirm>,
    timer: Option<ExamTimer>,
}

impl ActiveExam {
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> &QuizQuestion {
        &self.questions[self.current]
    }

    pub fn answer_for(&self, index: usize) -> Option<usize> {
        self.answers.get(&index).copied()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn pending(&self) -> Option<PendingConfirm> {
        self.pending
    }
}

/// Graded outcome of a finished attempt. Questions and the student's
/// answers are retained for the corrections review.
#[derive(Debug)]
pub struct ExamReport {
    pub subject: String,
    pub questions: Vec<QuizQuestion>,
    pub answers: HashMap<usize, usize>,
    pub score: usize,
    pub percentage: u32,
    /// True when the countdown expired and submission was forced.
    pub forced: bool,
}

impl ExamReport {
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Whether the student answered question `index` correctly.
    pub fn is_correct(&self, index: usize) -> bool {
        self.questions
            .get(index)
            .zip(self.answers.get(&index))
            .is_some_and(|(q, &a)| q.correct_index == a)
    }
}

fn grade(questions: &[QuizQuestion], answers: &HashMap<usize, usize>) -> usize {
    questions
        .iter()
        .enumerate()
        .filter(|(i, q)| answers.get(i) == Some(&q.correct_index))
        .count()
}

/// Whole-number percentage, rounded half-up. Zero questions grade to zero.
pub fn percentage(score: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((score as f64 / total as f64) * 100.0).round() as u32
}

/// Where the student stands inside topic selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicStage {
    /// Tier without CBT support; no path to generation exists.
    Restricted,
    /// Secondary: pick a department first.
    Departments,
    /// Secondary: pick a subject within the chosen department.
    Subjects(Department),
    /// College: pick a course major.
    Courses,
    /// College: confirm the chosen course before generation.
    CourseConfirm(String),
}

#[derive(Debug)]
pub enum Phase {
    TopicSelect,
    Generating { topic: String },
    InProgress(ActiveExam),
    Submitted(ExamReport),
}

/// Owns the exam lifecycle for the signed-in student's tier.
#[derive(Debug)]
pub struct ExamCenter {
    level: EducationLevel,
    department: Option<Department>,
    course: Option<String>,
    phase: Phase,
    question_count: usize,
    duration_secs: u32,
}

impl ExamCenter {
    pub fn new(level: EducationLevel, config: &ExamConfig) -> Self {
        Self {
            level,
            department: None,
            course: None,
            phase: Phase::TopicSelect,
            question_count: config.question_count,
            duration_secs: config.duration_secs,
        }
    }

    /// CBT exams exist for secondary and college tiers only.
    pub fn available(&self) -> bool {
        matches!(
            self.level,
            EducationLevel::Secondary | EducationLevel::College
        )
    }

    pub fn level(&self) -> EducationLevel {
        self.level
    }

    /// Changing tier invalidates every selection and any live attempt.
    pub fn set_level(&mut self, level: EducationLevel) {
        if level != self.level {
            self.level = level;
            self.reset();
        }
    }

    /// Back to a blank topic selection. Drops any live attempt, which
    /// cancels its countdown task.
    pub fn reset(&mut self) {
        self.department = None;
        self.course = None;
        self.phase = Phase::TopicSelect;
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn active(&self) -> Option<&ActiveExam> {
        match &self.phase {
            Phase::InProgress(exam) => Some(exam),
            _ => None,
        }
    }

    pub fn report(&self) -> Option<&ExamReport> {
        match &self.phase {
            Phase::Submitted(report) => Some(report),
            _ => None,
        }
    }

    /// Current position within topic selection, derived from tier and the
    /// selections made so far.
    pub fn stage(&self) -> TopicStage {
        match self.level {
            EducationLevel::Primary => TopicStage::Restricted,
            EducationLevel::Secondary => match self.department {
                Some(department) => TopicStage::Subjects(department),
                None => TopicStage::Departments,
            },
            EducationLevel::College => match &self.course {
                Some(course) => TopicStage::CourseConfirm(course.clone()),
                None => TopicStage::Courses,
            },
        }
    }

    /// Secondary only: narrow topic selection to one department's subjects.
    pub fn select_department(&mut self, department: Department) -> Result<(), ExamError> {
        if !matches!(self.phase, Phase::TopicSelect) {
            return Err(ExamError::WrongStage("topic selection"));
        }
        if self.level != EducationLevel::Secondary {
            return Err(ExamError::WrongStage("department selection"));
        }
        self.department = Some(department);
        Ok(())
    }

    /// College only: stage a course major for confirmation.
    pub fn select_course(&mut self, course: &str) -> Result<(), ExamError> {
        if !matches!(self.phase, Phase::TopicSelect) {
            return Err(ExamError::WrongStage("topic selection"));
        }
        if self.level != EducationLevel::College {
            return Err(ExamError::WrongStage("course selection"));
        }
        if !catalog::college_courses().contains(&course) {
            return Err(ExamError::UnknownTopic(course.to_string()));
        }
        self.course = Some(course.to_string());
        Ok(())
    }

    /// One step back within topic selection. A no-op at the top level and
    /// outside topic selection.
    pub fn back(&mut self) {
        if !matches!(self.phase, Phase::TopicSelect) {
            return;
        }
        match self.level {
            EducationLevel::Secondary => self.department = None,
            EducationLevel::College => self.course = None,
            EducationLevel::Primary => {}
        }
    }

    /// Validate the topic against the tier's catalog and move to the
    /// generating phase. The caller then drives the model call and reports
    /// back via [`install_exam`](Self::install_exam) or
    /// [`generation_failed`](Self::generation_failed).
    pub fn begin_generation(&mut self, topic: &str) -> Result<(), ExamError> {
        if !matches!(self.phase, Phase::TopicSelect) {
            return Err(ExamError::WrongStage("topic selection"));
        }
        match self.level {
            EducationLevel::Primary => {
                return Err(ExamError::NotAvailable {
                    level: self.level.to_string(),
                });
            }
            EducationLevel::Secondary => {
                let department = self
                    .department
                    .ok_or(ExamError::WrongStage("subject selection"))?;
                if !catalog::subjects_for_department(department).contains(&topic) {
                    return Err(ExamError::UnknownTopic(topic.to_string()));
                }
            }
            EducationLevel::College => {
                if !catalog::college_courses().contains(&topic) {
                    return Err(ExamError::UnknownTopic(topic.to_string()));
                }
                self.course = Some(topic.to_string());
            }
        }
        info!(topic, "generating exam paper");
        self.phase = Phase::Generating {
            topic: topic.to_string(),
        };
        Ok(())
    }

    /// The model call failed; return to topic selection with the previous
    /// department or course still staged.
    pub fn generation_failed(&mut self) {
        if matches!(self.phase, Phase::Generating { .. }) {
            self.phase = Phase::TopicSelect;
        }
    }

    /// Accept a generated paper and start the attempt. Passing a tick
    /// sender spawns the countdown task; passing `None` leaves the clock
    /// under manual [`tick`](Self::tick) control.
    ///
    /// A paper with the wrong question count or a malformed question is
    /// rejected whole, and the center returns to topic selection.
    pub fn install_exam(
        &mut self,
        questions: Vec<QuizQuestion>,
        ticks: Option<TickSender>,
    ) -> Result<(), ExamError> {
        let topic = match &self.phase {
            Phase::Generating { topic } => topic.clone(),
            _ => return Err(ExamError::WrongStage("generation")),
        };
        if questions.len() != self.question_count {
            self.phase = Phase::TopicSelect;
            return Err(ExamError::WrongQuestionCount {
                got: questions.len(),
                expected: self.question_count,
            });
        }
        for (index, question) in questions.iter().enumerate() {
            if question.options.len() != 4 || question.correct_index >= question.options.len() {
                self.phase = Phase::TopicSelect;
                return Err(ExamError::MalformedQuestion { index });
            }
        }

        let timer = ticks.map(ExamTimer::spawn);
        info!(subject = %topic, count = questions.len(), "exam attempt started");
        self.phase = Phase::InProgress(ActiveExam {
            subject: topic,
            questions,
            current: 0,
            answers: HashMap::new(),
            remaining_secs: self.duration_secs,
            pending: None,
            timer,
        });
        Ok(())
    }

    fn active_mut(&mut self) -> Result<&mut ActiveExam, ExamError> {
        match &mut self.phase {
            Phase::InProgress(exam) => Ok(exam),
            _ => Err(ExamError::NotInProgress),
        }
    }

    /// Record (or overwrite) the answer for the current question.
    pub fn select_answer(&mut self, option: usize) -> Result<(), ExamError> {
        let exam = self.active_mut()?;
        if option >= exam.questions[exam.current].options.len() {
            return Err(ExamError::OptionOutOfRange { index: option });
        }
        exam.answers.insert(exam.current, option);
        Ok(())
    }

    /// Move to the next question. A no-op on the last one: finishing the
    /// attempt always goes through the submit confirmation.
    pub fn next_question(&mut self) -> Result<(), ExamError> {
        let exam = self.active_mut()?;
        if exam.current + 1 < exam.questions.len() {
            exam.current += 1;
        }
        Ok(())
    }

    /// Move to the previous question. A no-op on the first.
    pub fn previous_question(&mut self) -> Result<(), ExamError> {
        let exam = self.active_mut()?;
        exam.current = exam.current.saturating_sub(1);
        Ok(())
    }

    pub fn request_submit(&mut self) -> Result<(), ExamError> {
        self.active_mut()?.pending = Some(PendingConfirm::Submit);
        Ok(())
    }

    pub fn request_abandon(&mut self) -> Result<(), ExamError> {
        self.active_mut()?.pending = Some(PendingConfirm::Abandon);
        Ok(())
    }

    /// Dismiss the pending confirmation; the attempt continues untouched.
    pub fn cancel_pending(&mut self) -> Result<(), ExamError> {
        self.active_mut()?.pending = None;
        Ok(())
    }

    /// Carry out the pending action: submit grades the attempt, abandon
    /// discards it and returns to topic selection.
    pub fn confirm_pending(&mut self) -> Result<PendingConfirm, ExamError> {
        let exam = self.active_mut()?;
        let action = exam.pending.take().ok_or(ExamError::NothingPending)?;
        match action {
            PendingConfirm::Submit => self.finish(false),
            PendingConfirm::Abandon => {
                info!("exam attempt abandoned");
                self.phase = Phase::TopicSelect;
            }
        }
        Ok(action)
    }

    /// Apply one countdown second. At zero the attempt is submitted
    /// immediately, bypassing confirmation. Ticks arriving outside a live
    /// attempt are stale and ignored.
    pub fn tick(&mut self) {
        let Phase::InProgress(exam) = &mut self.phase else {
            return;
        };
        exam.remaining_secs = exam.remaining_secs.saturating_sub(1);
        if exam.remaining_secs == 0 {
            info!("exam time expired, forcing submission");
            self.finish(true);
        } else {
            debug!(remaining = exam.remaining_secs, "exam tick");
        }
    }

    fn finish(&mut self, forced: bool) {
        let Phase::InProgress(mut exam) = std::mem::replace(&mut self.phase, Phase::TopicSelect)
        else {
            return;
        };
        if let Some(timer) = exam.timer.take() {
            timer.cancel();
        }
        let score = grade(&exam.questions, &exam.answers);
        let percentage = percentage(score, exam.questions.len());
        info!(subject = %exam.subject, score, percentage, forced, "exam graded");
        self.phase = Phase::Submitted(ExamReport {
            subject: exam.subject,
            questions: exam.questions,
            answers: exam.answers,
            score,
            percentage,
            forced,
        });
    }

    /// From the report back to topic selection, keeping the department or
    /// course so the same topic is one step away.
    pub fn retake(&mut self) -> Result<(), ExamError> {
        if !matches!(self.phase, Phase::Submitted(_)) {
            return Err(ExamError::WrongStage("report"));
        }
        self.phase = Phase::TopicSelect;
        Ok(())
    }

    /// From the report back to a blank topic selection.
    pub fn exit_to_top(&mut self) -> Result<(), ExamError> {
        if !matches!(self.phase, Phase::Submitted(_)) {
            return Err(ExamError::WrongStage("report"));
        }
        self.reset();
        Ok(())
    }
}
