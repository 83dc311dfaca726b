//! Free-tier usage gate.
//!
//! Pure decision over `(question_count, is_premium)`. Checked before every
//! tutor request and every exam generation; on denial the action is fully
//! discarded and the upgrade prompt is surfaced. The counter itself is
//! advanced elsewhere, once per successful request.

use crate::profile::UserProfile;

/// Free requests before the upgrade prompt.
pub const FREE_QUESTION_LIMIT: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    UpgradeRequired,
}

#[derive(Debug, Clone, Copy)]
pub struct UsageGate {
    limit: u32,
}

impl Default for UsageGate {
    fn default() -> Self {
        Self::new(FREE_QUESTION_LIMIT)
    }
}

impl UsageGate {
    pub fn new(limit: u32) -> Self {
        Self { limit }
    }

    pub fn check(&self, profile: &UserProfile) -> GateDecision {
        if profile.is_premium || profile.question_count < self.limit {
            GateDecision::Allowed
        } else {
            GateDecision::UpgradeRequired
        }
    }

    /// Free requests left, or `None` for premium accounts (unlimited).
    pub fn remaining(&self, profile: &UserProfile) -> Option<u32> {
        if profile.is_premium {
            None
        } else {
            Some(self.limit.saturating_sub(profile.question_count))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::EducationLevel;

    fn profile(question_count: u32, is_premium: bool) -> UserProfile {
        UserProfile {
            email: "a@b.c".to_string(),
            phone: String::new(),
            name: "Student".to_string(),
            username: "student".to_string(),
            dob: String::new(),
            password: String::new(),
            level: EducationLevel::Secondary,
            subjects: vec!["Mathematics".to_string()],
            onboarded: true,
            question_count,
            is_premium,
        }
    }

    #[test]
    fn test_free_tier_allowed_below_limit() {
        let gate = UsageGate::default();
        for count in 0..FREE_QUESTION_LIMIT {
            assert_eq!(gate.check(&profile(count, false)), GateDecision::Allowed);
        }
    }

    #[test]
    fn test_free_tier_denied_at_limit_and_beyond() {
        let gate = UsageGate::default();
        assert_eq!(
            gate.check(&profile(FREE_QUESTION_LIMIT, false)),
            GateDecision::UpgradeRequired
        );
        assert_eq!(
            gate.check(&profile(100, false)),
            GateDecision::UpgradeRequired
        );
    }

    #[test]
    fn test_premium_always_allowed() {
        let gate = UsageGate::default();
        for count in [0, 5, 1000, u32::MAX] {
            assert_eq!(gate.check(&profile(count, true)), GateDecision::Allowed);
        }
    }

    #[test]
    fn test_remaining_counts_down_and_saturates() {
        let gate = UsageGate::default();
        assert_eq!(gate.remaining(&profile(0, false)), Some(5));
        assert_eq!(gate.remaining(&profile(3, false)), Some(2));
        assert_eq!(gate.remaining(&profile(9, false)), Some(0));
        assert_eq!(gate.remaining(&profile(3, true)), None);
    }
}
