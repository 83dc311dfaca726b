//! Property checks for the pure product rules.

use proptest::prelude::*;

use tutorbrain::catalog::{subjects_for_department, Department};
use tutorbrain::config::ExamConfig;
use tutorbrain::exam::{percentage, ExamCenter, QuizQuestion};
use tutorbrain::gate::{GateDecision, UsageGate};
use tutorbrain::profile::{EducationLevel, UserProfile};
use tutorbrain::session::verify_otp;

fn profile(question_count: u32, is_premium: bool) -> UserProfile {
    UserProfile {
        email: "p@q.r".to_string(),
        phone: String::new(),
        name: "P".to_string(),
        username: "p".to_string(),
        dob: String::new(),
        password: String::new(),
        level: EducationLevel::Secondary,
        subjects: vec!["Mathematics".to_string()],
        onboarded: true,
        question_count,
        is_premium,
    }
}

fn paper(count: usize) -> Vec<QuizQuestion> {
    (0..count)
        .map(|i| QuizQuestion {
            id: format!("q{i}"),
            question: format!("q{i}"),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_index: i % 4,
            explanation: "e".to_string(),
            workings: vec![],
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_gate_never_lets_free_tier_past_the_limit(count in any::<u32>(), limit in 1u32..100) {
        let gate = UsageGate::new(limit);
        let decision = gate.check(&profile(count, false));
        prop_assert_eq!(decision == GateDecision::Allowed, count < limit);
    }

    #[test]
    fn prop_gate_always_allows_premium(count in any::<u32>(), limit in 1u32..100) {
        let gate = UsageGate::new(limit);
        prop_assert_eq!(gate.check(&profile(count, true)), GateDecision::Allowed);
        prop_assert!(gate.remaining(&profile(count, true)).is_none());
    }

    #[test]
    fn prop_percentage_stays_in_bounds(score in 0usize..=500, extra in 0usize..=500) {
        let total = score + extra;
        let pct = percentage(score, total);
        prop_assert!(pct <= 100);
        if total > 0 && score == total {
            prop_assert_eq!(pct, 100);
        }
        if score == 0 {
            prop_assert_eq!(pct, 0);
        }
    }

    #[test]
    fn prop_otp_accepts_exactly_six_ascii_digits(code in "[0-9]{6}") {
        prop_assert!(verify_otp(&code).is_ok());
    }

    #[test]
    fn prop_otp_never_panics_and_rejects_non_digits(code in ".*") {
        let well_formed = code.trim().len() == 6
            && code.trim().chars().all(|c| c.is_ascii_digit());
        prop_assert_eq!(verify_otp(&code).is_ok(), well_formed);
    }

    #[test]
    fn prop_answer_bookkeeping_is_consistent(
        moves in prop::collection::vec((0usize..25, 0usize..6), 0..200)
    ) {
        let mut center = ExamCenter::new(EducationLevel::Secondary, &ExamConfig::default());
        center.select_department(Department::Science).unwrap();
        center.begin_generation("Physics").unwrap();
        center.install_exam(paper(20), None).unwrap();

        for (hops, option) in moves {
            for _ in 0..hops {
                center.next_question().unwrap();
            }
            let _ = center.select_answer(option);
            for _ in 0..hops {
                center.previous_question().unwrap();
            }
        }

        let exam = center.active().unwrap();
        // Never more answers than questions, and every stored answer is a
        // legal option index.
        prop_assert!(exam.answered_count() <= exam.total());
        for i in 0..exam.total() {
            if let Some(answer) = exam.answer_for(i) {
                prop_assert!(answer < 4);
            }
        }

        center.request_submit().unwrap();
        center.confirm_pending().unwrap();
        let report = center.report().unwrap();
        prop_assert!(report.score <= report.total());
        prop_assert!(report.percentage <= 100);
    }

    #[test]
    fn prop_department_topics_always_pass_validation(
        dept_index in 0usize..3,
        pick in any::<prop::sample::Index>(),
    ) {
        let department = Department::ALL[dept_index];
        let subjects = subjects_for_department(department);
        let topic = subjects[pick.index(subjects.len())];

        let mut center = ExamCenter::new(EducationLevel::Secondary, &ExamConfig::default());
        center.select_department(department).unwrap();
        prop_assert!(center.begin_generation(topic).is_ok());
    }
}
