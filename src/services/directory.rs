// src/services/directory.rs

use std::cmp::Reverse;

use chrono::{DateTime, Utc};

use crate::models::exam::Exam;

/// Picks the exam a student landing page should show at `now`.
///
/// Priority is active > upcoming > past:
/// * an active exam (earliest start if several overlap),
/// * otherwise the upcoming exam that starts soonest,
/// * otherwise the exam that ended most recently.
///
/// Ties inside a tier fall back to id order.
pub fn select_current(exams: &[Exam], now: DateTime<Utc>) -> Option<&Exam> {
    let active: Vec<&Exam> = exams.iter().filter(|e| e.is_active(now)).collect();
    if active.len() > 1 {
        // The scheduler is supposed to make this impossible.
        tracing::warn!(
            count = active.len(),
            "Several exams are active at once; picking the earliest-starting one"
        );
    }
    if let Some(exam) = active.into_iter().min_by_key(|e| (e.start_time, e.id)) {
        return Some(exam);
    }

    if let Some(exam) = exams
        .iter()
        .filter(|e| e.start_time > now)
        .min_by_key(|e| (e.start_time, e.id))
    {
        return Some(exam);
    }

    exams
        .iter()
        .filter(|e| e.end_time <= now)
        .min_by_key(|e| (Reverse(e.end_time), e.id))
}
