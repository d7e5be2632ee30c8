// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{exam::Exam, question::Question, score::Score, user::User},
    store::Store,
};

const EXAM_COLUMNS: &str =
    "id, name, start_time, end_time, allow_answer_when_expired, random_question";
const QUESTION_COLUMNS: &str = "id, exam_id, operand1, operator, operand2";
const SCORE_COLUMNS: &str = "id, exam_id, user_id, score, expired_flag, created_at";
const USER_COLUMNS: &str =
    "id, username, password, role, name, class_name, number, belong_to, created_at";

/// `Store` backed by Postgres (see `migrations/`).
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_questions(
    tx: &mut Transaction<'_, Postgres>,
    questions: &[Question],
) -> Result<(), sqlx::Error> {
    for (position, q) in questions.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO questions (id, exam_id, position, operand1, operator, operand2)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(q.id)
        .bind(q.exam_id)
        .bind(position as i32)
        .bind(q.operand1)
        .bind(q.operator.code())
        .bind(q.operand2)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn find_exam(&self, id: Uuid) -> Result<Option<Exam>, AppError> {
        let exam = sqlx::query_as::<_, Exam>(&format!(
            "SELECT {EXAM_COLUMNS} FROM exams WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(exam)
    }

    async fn list_exams(&self, limit: Option<i64>) -> Result<Vec<Exam>, AppError> {
        // LIMIT NULL means no limit in Postgres.
        let exams = sqlx::query_as::<_, Exam>(&format!(
            "SELECT {EXAM_COLUMNS} FROM exams ORDER BY start_time, id LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list exams: {:?}", e);
            AppError::from(e)
        })?;
        Ok(exams)
    }

    async fn insert_exam(&self, exam: &Exam, questions: &[Question]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO exams (id, name, start_time, end_time, allow_answer_when_expired, random_question)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(exam.id)
        .bind(&exam.name)
        .bind(exam.start_time)
        .bind(exam.end_time)
        .bind(exam.allow_answer_when_expired)
        .bind(exam.random_question)
        .execute(&mut *tx)
        .await?;

        insert_questions(&mut tx, questions).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_exam(
        &self,
        exam: &Exam,
        questions: Option<&[Question]>,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE exams
            SET name = $2, start_time = $3, end_time = $4,
                allow_answer_when_expired = $5, random_question = $6
            WHERE id = $1
            "#,
        )
        .bind(exam.id)
        .bind(&exam.name)
        .bind(exam.start_time)
        .bind(exam.end_time)
        .bind(exam.allow_answer_when_expired)
        .bind(exam.random_question)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(questions) = questions {
            sqlx::query("DELETE FROM questions WHERE exam_id = $1")
                .bind(exam.id)
                .execute(&mut *tx)
                .await?;
            insert_questions(&mut tx, questions).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_exam(&self, id: Uuid) -> Result<bool, AppError> {
        // questions and scores cascade
        let result = sqlx::query("DELETE FROM exams WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_questions(&self, exam_id: Uuid) -> Result<Vec<Question>, AppError> {
        let questions = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE exam_id = $1 ORDER BY position"
        ))
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch questions: {:?}", e);
            AppError::from(e)
        })?;
        Ok(questions)
    }

    async fn insert_score(&self, score: &Score) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO scores (id, exam_id, user_id, score, expired_flag, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(score.id)
        .bind(score.exam_id)
        .bind(score.user_id)
        .bind(score.score)
        .bind(score.expired_flag)
        .bind(score.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert score: {:?}", e);
            AppError::from(e)
        })?;
        Ok(())
    }

    async fn list_scores_by_exam(&self, exam_id: Uuid) -> Result<Vec<Score>, AppError> {
        let scores = sqlx::query_as::<_, Score>(&format!(
            "SELECT {SCORE_COLUMNS} FROM scores WHERE exam_id = $1 ORDER BY created_at"
        ))
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(scores)
    }

    async fn list_scores_by_user(&self, user_id: Uuid) -> Result<Vec<Score>, AppError> {
        let scores = sqlx::query_as::<_, Score>(&format!(
            "SELECT {SCORE_COLUMNS} FROM scores WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(scores)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Login DB error: {:?}", e);
            AppError::from(e)
        })?;
        Ok(user)
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        self.insert_users(std::slice::from_ref(user)).await
    }

    async fn insert_users(&self, users: &[User]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        for user in users {
            sqlx::query(
                r#"
                INSERT INTO users (id, username, password, role, name, class_name, number, belong_to, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.password)
            .bind(user.role.as_str())
            .bind(&user.name)
            .bind(&user.class_name)
            .bind(user.number)
            .bind(user.belong_to)
            .bind(user.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::Conflict(_) => {
                    AppError::Conflict(format!("Username '{}' already exists", user.username))
                }
                other => {
                    tracing::error!("Failed to insert user: {:?}", other);
                    other
                }
            })?;
        }

        // Dropping `tx` on an early return rolls the whole batch back.
        tx.commit().await?;
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_students(&self, teacher_id: Uuid) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = 'student' AND belong_to = $1 ORDER BY number, username"
        ))
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
