// src/store/mod.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{exam::Exam, question::Question, score::Score, user::User},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Persistence collaborator.
///
/// Every lookup reports absence as `Ok(None)` / `Ok(false)` and failures as
/// `Err`; nothing is swallowed. Deleting an exam removes its questions and
/// scores with it.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_exam(&self, id: Uuid) -> Result<Option<Exam>, AppError>;

    /// Exams ordered by start time; `None` lists all of them.
    async fn list_exams(&self, limit: Option<i64>) -> Result<Vec<Exam>, AppError>;

    async fn insert_exam(&self, exam: &Exam, questions: &[Question]) -> Result<(), AppError>;

    /// Overwrites the exam row and, when `questions` is given, replaces its
    /// question set. Returns `false` if the exam does not exist.
    async fn update_exam(
        &self,
        exam: &Exam,
        questions: Option<&[Question]>,
    ) -> Result<bool, AppError>;

    async fn delete_exam(&self, id: Uuid) -> Result<bool, AppError>;

    /// Questions of one exam in insertion order.
    async fn list_questions(&self, exam_id: Uuid) -> Result<Vec<Question>, AppError>;

    async fn insert_score(&self, score: &Score) -> Result<(), AppError>;

    async fn list_scores_by_exam(&self, exam_id: Uuid) -> Result<Vec<Score>, AppError>;

    async fn list_scores_by_user(&self, user_id: Uuid) -> Result<Vec<Score>, AppError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Fails with `Conflict` when the username is taken.
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;

    /// Inserts all of `users` or none of them. Any taken username (in the
    /// store or twice in the batch) fails the batch with `Conflict`.
    async fn insert_users(&self, users: &[User]) -> Result<(), AppError>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, AppError>;

    /// Students imported by `teacher_id`.
    async fn list_students(&self, teacher_id: Uuid) -> Result<Vec<User>, AppError>;

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError>;
}
