// src/handlers/teacher.rs

use std::collections::{HashMap, HashSet};

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::EXAM_LIST_LIMIT,
    error::AppError,
    models::{
        exam::{CreateExamRequest, Exam, ExamDetail, UpdateExamRequest},
        question::build_question_set,
        score::ExamScoreEntry,
        user::{Profile, Role, StudentImport, User},
    },
    state::AppState,
    utils::{hash::hash_password, jwt::Session},
};

fn exam_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Exam {id} not found"))
}

/// GET /api/teacher/exams
pub async fn list_exams(State(state): State<AppState>) -> Result<Json<Vec<Exam>>, AppError> {
    let exams = state.store.list_exams(Some(EXAM_LIST_LIMIT)).await?;
    Ok(Json(exams))
}

/// Creates an exam with its question set.
///
/// Rejects windows with `start_time >= end_time` (400) and windows that
/// overlap any existing exam (409). Touching windows are allowed.
pub async fn create_exam(
    State(state): State<AppState>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let exam = Exam {
        id: Uuid::new_v4(),
        name: payload.name,
        start_time: payload.start_time,
        end_time: payload.end_time,
        allow_answer_when_expired: payload.allow_answer_when_expired,
        random_question: payload.random_question,
    };
    let questions = build_question_set(exam.id, &payload.questions)?;

    let exam = state
        .scheduler
        .create(state.store.as_ref(), exam, questions.clone())
        .await?;

    Ok((StatusCode::CREATED, Json(ExamDetail { exam, questions })))
}

/// GET /api/teacher/exams/{id}
pub async fn get_exam(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExamDetail>, AppError> {
    let exam = state
        .store
        .find_exam(id)
        .await?
        .ok_or_else(|| exam_not_found(id))?;
    let questions = state.store.list_questions(id).await?;
    Ok(Json(ExamDetail { exam, questions }))
}

/// Edits an exam. The edited window is checked against every other exam.
pub async fn update_exam(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateExamRequest>,
) -> Result<Json<ExamDetail>, AppError> {
    payload.validate()?;

    let questions = payload
        .questions
        .as_deref()
        .map(|drafts| build_question_set(id, drafts))
        .transpose()?;

    let exam = state
        .scheduler
        .update(state.store.as_ref(), id, &payload, questions)
        .await?;
    let questions = state.store.list_questions(id).await?;

    Ok(Json(ExamDetail { exam, questions }))
}

/// DELETE /api/teacher/exams/{id}
///
/// Questions and scores of the exam go with it.
pub async fn delete_exam(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.store.delete_exam(id).await? {
        return Err(exam_not_found(id));
    }
    tracing::info!(exam_id = %id, "Exam deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/teacher/exams/{id}/scores
pub async fn exam_scores(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ExamScoreEntry>>, AppError> {
    if state.store.find_exam(id).await?.is_none() {
        return Err(exam_not_found(id));
    }

    let scores = state.store.list_scores_by_exam(id).await?;
    let mut users: HashMap<Uuid, User> = HashMap::new();
    let mut entries = Vec::with_capacity(scores.len());

    for score in scores {
        if !users.contains_key(&score.user_id) {
            let Some(user) = state.store.find_user(score.user_id).await? else {
                continue;
            };
            users.insert(user.id, user);
        }
        let user = &users[&score.user_id];
        entries.push(ExamScoreEntry {
            id: score.id,
            user_id: user.id,
            username: user.username.clone(),
            name: user.name.clone(),
            score: score.score,
            expired: score.expired_flag,
            created_at: score.created_at,
        });
    }

    Ok(Json(entries))
}

/// Students imported by the calling teacher.
pub(crate) async fn students_of(
    state: &AppState,
    teacher_id: Uuid,
) -> Result<Vec<Profile>, AppError> {
    let students = state.store.list_students(teacher_id).await?;
    Ok(students.iter().map(Profile::from).collect())
}

/// GET /api/teacher/students
pub async fn list_students(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<Profile>>, AppError> {
    let teacher_id = session.user_id()?;
    Ok(Json(students_of(&state, teacher_id).await?))
}

/// Imports a batch of student accounts owned by the caller.
///
/// Every row is checked before anything is written and the batch is stored
/// atomically; one bad row (or a username taken concurrently) rejects the
/// whole batch.
pub async fn import_students(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(rows): Json<Vec<StudentImport>>,
) -> Result<impl IntoResponse, AppError> {
    let teacher_id = session.user_id()?;

    if rows.is_empty() {
        return Err(AppError::BadRequest("No students to import".to_string()));
    }

    let mut seen = HashSet::new();
    for (index, row) in rows.iter().enumerate() {
        row.validate()
            .map_err(|e| AppError::BadRequest(format!("Row {}: {}", index + 1, e)))?;
        if !seen.insert(row.username.as_str()) {
            return Err(AppError::Conflict(format!(
                "Row {}: username '{}' appears twice",
                index + 1,
                row.username
            )));
        }
        if state
            .store
            .find_user_by_username(&row.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "Row {}: username '{}' already exists",
                index + 1,
                row.username
            )));
        }
    }

    let now = Utc::now();
    let students = rows
        .into_iter()
        .map(|row| -> Result<User, AppError> {
            Ok(User {
                id: Uuid::new_v4(),
                password: hash_password(&row.password)?,
                username: row.username,
                role: Role::Student,
                name: row.name,
                class_name: row.class_name,
                number: row.number,
                belong_to: Some(teacher_id),
                created_at: now,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    state.store.insert_users(&students).await?;
    let imported: Vec<Profile> = students.iter().map(Profile::from).collect();

    tracing::info!(%teacher_id, count = imported.len(), "Students imported");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "imported": imported.len(), "students": imported })),
    ))
}

/// Deletes one of the caller's students together with their scores.
pub async fn delete_student(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let teacher_id = session.user_id()?;

    let owned = state
        .store
        .find_user(id)
        .await?
        .is_some_and(|u| u.role == Role::Student && u.belong_to == Some(teacher_id));
    if !owned {
        return Err(AppError::NotFound(format!("Student {id} not found")));
    }

    state.store.delete_user(id).await?;
    tracing::info!(%teacher_id, student_id = %id, "Student deleted");
    Ok(StatusCode::NO_CONTENT)
}
