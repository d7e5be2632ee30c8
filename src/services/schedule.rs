// src/services/schedule.rs

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        exam::{Exam, UpdateExamRequest},
        question::Question,
    },
    store::Store,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("Exam must start before it ends (start {start}, end {end})")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("Exam window overlaps with '{name}' ({start} to {end})")]
    Conflict {
        name: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Half-open interval intersection: `[s1,e1)` and `[s2,e2)` touch but do not
/// overlap when `e1 == s2`.
pub fn windows_overlap(
    (s1, e1): (DateTime<Utc>, DateTime<Utc>),
    (s2, e2): (DateTime<Utc>, DateTime<Utc>),
) -> bool {
    !(e1 <= s2 || e2 <= s1)
}

/// Rejects `candidate` when its window is empty or intersects any exam in
/// `existing` other than `exclude_id`.
pub fn check_no_overlap(
    candidate: &Exam,
    existing: &[Exam],
    exclude_id: Option<Uuid>,
) -> Result<(), ScheduleError> {
    if candidate.start_time >= candidate.end_time {
        return Err(ScheduleError::InvalidWindow {
            start: candidate.start_time,
            end: candidate.end_time,
        });
    }

    let window = (candidate.start_time, candidate.end_time);
    match existing
        .iter()
        .filter(|e| Some(e.id) != exclude_id)
        .find(|e| windows_overlap(window, (e.start_time, e.end_time)))
    {
        Some(other) => Err(ScheduleError::Conflict {
            name: other.name.clone(),
            start: other.start_time,
            end: other.end_time,
        }),
        None => Ok(()),
    }
}

/// Serializes exam create/edit so the overlap check and the write happen as
/// one step. One instance per process; the database exclusion constraint
/// covers multi-process deployments.
#[derive(Debug, Default)]
pub struct ExamScheduler {
    writer: Mutex<()>,
}

impl ExamScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(
        &self,
        store: &dyn Store,
        exam: Exam,
        questions: Vec<Question>,
    ) -> Result<Exam, AppError> {
        let _guard = self.writer.lock().await;

        let existing = store.list_exams(None).await?;
        check_no_overlap(&exam, &existing, None)?;
        store.insert_exam(&exam, &questions).await?;

        tracing::info!(
            exam_id = %exam.id,
            name = %exam.name,
            questions = questions.len(),
            "Exam created"
        );
        Ok(exam)
    }

    /// Applies `patch` to the stored exam `id`. The read, the overlap check
    /// and the write all happen under the lock, so concurrent edits of the
    /// same exam never drop each other's fields. `questions`, when given,
    /// replaces the whole question set.
    pub async fn update(
        &self,
        store: &dyn Store,
        id: Uuid,
        patch: &UpdateExamRequest,
        questions: Option<Vec<Question>>,
    ) -> Result<Exam, AppError> {
        let _guard = self.writer.lock().await;

        let existing = store.list_exams(None).await?;
        let current = existing
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Exam {id} not found")))?;
        let exam = patch.apply_to(current);
        check_no_overlap(&exam, &existing, Some(id))?;

        let updated = store.update_exam(&exam, questions.as_deref()).await?;
        if !updated {
            return Err(AppError::NotFound(format!("Exam {id} not found")));
        }

        tracing::info!(exam_id = %exam.id, name = %exam.name, "Exam updated");
        Ok(exam)
    }
}
