// src/handlers/student.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppError,
    handlers::current_user,
    models::{
        exam::{CurrentExamResponse, DeliveredExam, Exam},
        score::{Score, StudentScoreEntry, SubmitExamRequest},
    },
    services::{
        delivery::{deliver_questions, grade_submission},
        directory::select_current,
    },
    state::AppState,
    utils::jwt::Session,
};

async fn load_exam(state: &AppState, id: Uuid) -> Result<Exam, AppError> {
    state
        .store
        .find_exam(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Exam {id} not found")))
}

/// The exam a student should see right now, plus whether they already
/// submitted it.
pub(crate) async fn current_exam_for(
    state: &AppState,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<CurrentExamResponse, AppError> {
    // Unbounded: the listing is oldest first, so a cap would drop the
    // active and upcoming exams.
    let exams = state.store.list_exams(None).await?;

    let Some(exam) = select_current(&exams, now).cloned() else {
        return Ok(CurrentExamResponse {
            exam: None,
            done: false,
        });
    };

    let done = state
        .store
        .list_scores_by_user(user_id)
        .await?
        .iter()
        .any(|s| s.exam_id == exam.id);

    Ok(CurrentExamResponse {
        exam: Some(exam),
        done,
    })
}

/// Score history of one student, newest first, joined with exam names.
pub(crate) async fn scores_for(
    state: &AppState,
    user_id: Uuid,
) -> Result<Vec<StudentScoreEntry>, AppError> {
    let scores = state.store.list_scores_by_user(user_id).await?;

    let mut names: HashMap<Uuid, String> = HashMap::new();
    let mut entries = Vec::with_capacity(scores.len());
    for score in scores {
        if !names.contains_key(&score.exam_id) {
            // Scores cascade with their exam, so a miss is a race with a delete.
            let Some(exam) = state.store.find_exam(score.exam_id).await? else {
                continue;
            };
            names.insert(exam.id, exam.name);
        }
        entries.push(StudentScoreEntry {
            id: score.id,
            exam_id: score.exam_id,
            exam_name: names[&score.exam_id].clone(),
            score: score.score,
            expired: score.expired_flag,
            created_at: score.created_at,
        });
    }
    Ok(entries)
}

/// GET /api/student/exam
pub async fn current_exam(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<CurrentExamResponse>, AppError> {
    let user_id = session.user_id()?;
    let response = current_exam_for(&state, user_id, Utc::now()).await?;
    Ok(Json(response))
}

/// Delivers the questions of one exam.
///
/// Randomized exams come back shuffled together with the seed that
/// produced the order; the client must send it back on submission.
pub async fn get_exam_questions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliveredExam>, AppError> {
    let exam = load_exam(&state, id).await?;
    let now = Utc::now();

    if !exam.has_started(now) {
        return Err(AppError::BadRequest(format!(
            "Exam '{}' has not started yet",
            exam.name
        )));
    }

    let questions = state.store.list_questions(exam.id).await?;
    if questions.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Exam '{}' has no questions",
            exam.name
        )));
    }

    Ok(Json(deliver_questions(&exam, questions, now)))
}

/// Grades a submission and records the score.
pub async fn submit_exam(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = current_user(&state, &session).await?;
    let exam = load_exam(&state, payload.id).await?;
    let now = Utc::now();

    if !exam.has_started(now) {
        return Err(AppError::BadRequest(format!(
            "Exam '{}' has not started yet",
            exam.name
        )));
    }

    let questions = state.store.list_questions(exam.id).await?;
    let outcome = grade_submission(&exam, questions, payload.seed, &payload.answers, now)?;

    let score = Score {
        id: Uuid::new_v4(),
        exam_id: exam.id,
        user_id: user.id,
        score: outcome.score as i32,
        expired_flag: outcome.expired,
        created_at: now,
    };
    state.store.insert_score(&score).await?;

    tracing::info!(
        user_id = %user.id,
        exam_id = %exam.id,
        score = outcome.score,
        expired = outcome.expired,
        "Exam submitted"
    );

    Ok(Json(json!({
        "score": outcome.score,
        "expired": outcome.expired,
        "message": "Exam submitted",
    })))
}

/// GET /api/student/scores
pub async fn list_scores(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<StudentScoreEntry>>, AppError> {
    let user_id = session.user_id()?;
    Ok(Json(scores_for(&state, user_id).await?))
}
