//! Static curriculum and plan lookup tables.
//!
//! These hierarchies are fixed product data, not user-editable. Every
//! option set offered here is non-empty; topic selection never dead-ends.

use serde::{Deserialize, Serialize};

use crate::profile::EducationLevel;

/// Secondary-tier study track. Picking a department narrows the subject
/// list for the exam center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Department {
    Science,
    Art,
    Commercial,
}

impl Department {
    pub const ALL: [Department; 3] = [Self::Science, Self::Art, Self::Commercial];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Science => "Science Student",
            Self::Art => "Art Student",
            Self::Commercial => "Commercial Student",
        }
    }
}

impl std::fmt::Display for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Subjects offered during onboarding and profile edits, per tier.
pub fn subjects_for_level(level: EducationLevel) -> &'static [&'static str] {
    match level {
        EducationLevel::Primary => &[
            "Mathematics",
            "English Language",
            "Civic Education",
            "Agricultural Science",
            "Verbal Reasoning",
            "Quantitative Reasoning",
            "Home Economics",
            "History",
            "Computer Science",
            "Creative Art",
            "Physical and Health Education",
            "Christian Religious Studies",
            "Yoruba",
        ],
        EducationLevel::Secondary => &[
            "Mathematics",
            "English Language",
            "Physics",
            "Chemistry",
            "Biology",
            "Economics",
            "Geography",
            "Government",
            "Literature in English",
            "Further Mathematics",
            "Commerce",
            "Financial Accounting",
            "Agricultural Science",
            "Computer Science",
        ],
        EducationLevel::College => &[
            "Mathematics",
            "Physics",
            "Chemistry",
            "Biology",
            "Computer Science",
            "Economics",
            "Philosophy",
            "Engineering",
            "Medicine",
            "Law",
            "Political Science",
            "Sociology",
            "Psychology",
        ],
    }
}

/// Exam subjects per secondary department.
pub fn subjects_for_department(department: Department) -> &'static [&'static str] {
    match department {
        Department::Science => &[
            "Mathematics",
            "English Language",
            "Physics",
            "Chemistry",
            "Biology",
            "Further Mathematics",
            "Agricultural Science",
            "Geography",
            "Computer Science",
        ],
        Department::Art => &[
            "Mathematics",
            "English Language",
            "Government",
            "Literature in English",
            "History",
            "Christian Religious Studies",
            "Yoruba",
            "Economics",
        ],
        Department::Commercial => &[
            "Mathematics",
            "English Language",
            "Financial Accounting",
            "Commerce",
            "Economics",
            "Government",
        ],
    }
}

/// College exam topics are the course majors themselves.
pub fn college_courses() -> &'static [&'static str] {
    subjects_for_level(EducationLevel::College)
}

/// A premium subscription plan tied to an education tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PremiumPlan {
    pub name: &'static str,
    pub price: &'static str,
    pub perks: &'static [&'static str],
}

pub fn plan_for_level(level: EducationLevel) -> PremiumPlan {
    match level {
        EducationLevel::Primary => PremiumPlan {
            name: "Junior Explorer",
            price: "$0.99",
            perks: &[
                "Unlimited 20-Question Exams",
                "Voice Notes Enabled",
                "Simple Step Explanations",
                "No Daily Limits",
            ],
        },
        EducationLevel::Secondary => PremiumPlan {
            name: "Exam Success",
            price: "$1.99",
            perks: &[
                "Unlimited 20-Question Mock tests",
                "WAEC/JAMB/IGCSE Logic",
                "Photo Homework Uploads",
                "Priority AI Thinking",
            ],
        },
        EducationLevel::College => PremiumPlan {
            name: "Academic Mastery",
            price: "$2.99",
            perks: &[
                "Unlimited Advanced Assessments",
                "Technical Term Glossary",
                "Citation Assistance",
                "Complex Problem Solving",
            ],
        },
    }
}
