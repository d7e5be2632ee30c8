// src/models/exam.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::question::{NewQuestion, PublicQuestion, Question};

/// Represents the 'exams' table in the database.
///
/// The window is half-open: an exam is active for
/// `start_time <= now < end_time`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: Uuid,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Late submissions are accepted (and flagged as expired).
    pub allow_answer_when_expired: bool,
    /// Questions are delivered in a seeded shuffled order.
    pub random_question: bool,
}

impl Exam {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now < self.end_time
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now
    }

    /// A submission graded at `now` is flagged as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.end_time
    }
}

/// DTO for creating an exam together with its question set.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub allow_answer_when_expired: bool,
    #[serde(default)]
    pub random_question: bool,
    #[validate(length(min = 1, max = 999, message = "An exam needs between 1 and 999 questions."))]
    pub questions: Vec<NewQuestion>,
}

/// DTO for editing an exam. Absent fields keep their current value; a
/// present `questions` list replaces the whole set.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExamRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub allow_answer_when_expired: Option<bool>,
    pub random_question: Option<bool>,
    #[validate(length(min = 1, max = 999, message = "An exam needs between 1 and 999 questions."))]
    pub questions: Option<Vec<NewQuestion>>,
}

impl UpdateExamRequest {
    pub fn apply_to(&self, exam: &Exam) -> Exam {
        Exam {
            id: exam.id,
            name: self.name.clone().unwrap_or_else(|| exam.name.clone()),
            start_time: self.start_time.unwrap_or(exam.start_time),
            end_time: self.end_time.unwrap_or(exam.end_time),
            allow_answer_when_expired: self
                .allow_answer_when_expired
                .unwrap_or(exam.allow_answer_when_expired),
            random_question: self.random_question.unwrap_or(exam.random_question),
        }
    }
}

/// Teacher view of one exam with its canonical question order.
#[derive(Debug, Serialize)]
pub struct ExamDetail {
    #[serde(flatten)]
    pub exam: Exam,
    pub questions: Vec<Question>,
}

/// Student landing view: the current exam and whether the caller already
/// has a score for it.
#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentExamResponse {
    pub exam: Option<Exam>,
    pub done: bool,
}

/// Questions as delivered for one attempt. `seed` is present only for
/// randomized exams and must be echoed back on submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveredExam {
    pub exam: Exam,
    pub questions: Vec<PublicQuestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}
