// src/models/score.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Represents the 'scores' table in the database.
/// One row per graded submission; retakes are not deduplicated.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Score {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub user_id: Uuid,
    /// Percentage in 0..=100.
    pub score: i32,
    /// Graded after the exam's end time.
    pub expired_flag: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for submitting an exam attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitExamRequest {
    /// Exam id.
    pub id: Uuid,

    /// Seed returned when the questions were delivered.
    /// Required for randomized exams, ignored otherwise.
    pub seed: Option<i64>,

    /// Answers in the order the questions were delivered.
    pub answers: Vec<f64>,
}

/// Result of grading one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeOutcome {
    pub score: u32,
    pub expired: bool,
}

/// A score joined with the exam it belongs to.
#[derive(Debug, Serialize)]
pub struct StudentScoreEntry {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub exam_name: String,
    pub score: i32,
    pub expired: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A score joined with the student who earned it.
#[derive(Debug, Serialize)]
pub struct ExamScoreEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub name: String,
    pub score: i32,
    pub expired: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
