// src/services/delivery.rs

use chrono::{DateTime, Utc};

use crate::{
    models::{
        exam::{DeliveredExam, Exam},
        question::{PublicQuestion, Question},
        score::GradeOutcome,
    },
    services::{
        scoring::{self, ScoringError},
        sequencer,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GradeError {
    #[error("A randomized exam must be submitted with the seed it was delivered with")]
    MissingSeed,
    #[error("Exam '{0}' has ended and does not accept late answers")]
    SubmissionClosed(String),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

/// Orders `questions` (canonical order) for one attempt.
///
/// Randomized exams are shuffled with a seed taken from `now`; the seed is
/// returned so the grader can rebuild the same order later.
pub fn deliver_questions(exam: &Exam, questions: Vec<Question>, now: DateTime<Utc>) -> DeliveredExam {
    let (ordered, seed) = if exam.random_question {
        let seed = sequencer::seed_at(now);
        (sequencer::shuffled_sequence(&questions, seed), Some(seed))
    } else {
        (sequencer::canonical_sequence(questions), None)
    };

    DeliveredExam {
        exam: exam.clone(),
        questions: ordered.iter().map(PublicQuestion::from).collect(),
        seed,
    }
}

/// Rebuilds the delivered order from `seed` and grades `answers` against it.
///
/// The seed is ignored for non-randomized exams. Late submissions are
/// rejected unless the exam allows them, in which case they are flagged.
pub fn grade_submission(
    exam: &Exam,
    questions: Vec<Question>,
    seed: Option<i64>,
    answers: &[f64],
    now: DateTime<Utc>,
) -> Result<GradeOutcome, GradeError> {
    let expired = exam.is_expired(now);
    if expired && !exam.allow_answer_when_expired {
        return Err(GradeError::SubmissionClosed(exam.name.clone()));
    }

    let ordered = if exam.random_question {
        let seed = seed.ok_or(GradeError::MissingSeed)?;
        sequencer::shuffled_sequence(&questions, seed)
    } else {
        sequencer::canonical_sequence(questions)
    };

    let score = scoring::score(&ordered, answers)?;
    Ok(GradeOutcome { score, expired })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Operator;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn exam(random_question: bool, allow_answer_when_expired: bool) -> Exam {
        Exam {
            id: Uuid::new_v4(),
            name: "Arithmetic".to_string(),
            start_time: at(1_000),
            end_time: at(2_000),
            allow_answer_when_expired,
            random_question,
        }
    }

    fn questions(exam: &Exam, count: i32) -> Vec<Question> {
        (1..=count)
            .map(|i| Question {
                id: Uuid::new_v4(),
                exam_id: exam.id,
                operand1: i,
                operator: Operator::Mul,
                operand2: 10,
            })
            .collect()
    }

    fn answers_for(delivered: &DeliveredExam) -> Vec<f64> {
        delivered
            .questions
            .iter()
            .map(|q| q.operator.apply(q.operand1, q.operand2))
            .collect()
    }

    #[test]
    fn test_round_trip_randomized() {
        let exam = exam(true, false);
        let qs = questions(&exam, 12);

        let delivered = deliver_questions(&exam, qs.clone(), at(1_500));
        assert_eq!(delivered.seed, Some(1_500));

        let answers = answers_for(&delivered);
        let outcome = grade_submission(&exam, qs, delivered.seed, &answers, at(1_600)).unwrap();
        assert_eq!(outcome, GradeOutcome { score: 100, expired: false });
    }

    #[test]
    fn test_wrong_seed_misgrades() {
        let exam = exam(true, false);
        let qs = questions(&exam, 12);
        let delivered = deliver_questions(&exam, qs.clone(), at(1_500));
        let answers = answers_for(&delivered);

        let outcome = grade_submission(&exam, qs, Some(1_501), &answers, at(1_600)).unwrap();
        assert!(outcome.score < 100);
    }

    #[test]
    fn test_canonical_order_without_randomization() {
        let exam = exam(false, false);
        let qs = questions(&exam, 5);
        let delivered = deliver_questions(&exam, qs.clone(), at(1_500));

        assert_eq!(delivered.seed, None);
        let ids: Vec<Uuid> = delivered.questions.iter().map(|q| q.id).collect();
        let expected: Vec<Uuid> = qs.iter().map(|q| q.id).collect();
        assert_eq!(ids, expected);

        // Seed is ignored when the exam is not randomized.
        let answers = answers_for(&delivered);
        let outcome = grade_submission(&exam, qs, Some(99), &answers, at(1_600)).unwrap();
        assert_eq!(outcome.score, 100);
    }

    #[test]
    fn test_randomized_requires_seed() {
        let exam = exam(true, false);
        let qs = questions(&exam, 3);
        assert_eq!(
            grade_submission(&exam, qs, None, &[10.0, 20.0, 30.0], at(1_600)),
            Err(GradeError::MissingSeed)
        );
    }

    #[test]
    fn test_late_submission_rules() {
        let closed = exam(false, false);
        let qs = questions(&closed, 2);
        assert!(matches!(
            grade_submission(&closed, qs.clone(), None, &[10.0, 20.0], at(2_001)),
            Err(GradeError::SubmissionClosed(_))
        ));

        let open = Exam { allow_answer_when_expired: true, ..closed.clone() };
        let outcome = grade_submission(&open, qs.clone(), None, &[10.0, 20.0], at(2_001)).unwrap();
        assert_eq!(outcome, GradeOutcome { score: 100, expired: true });

        // Exactly at the end instant is not yet past it.
        let outcome = grade_submission(&closed, qs, None, &[10.0, 0.0], at(2_000)).unwrap();
        assert_eq!(outcome, GradeOutcome { score: 50, expired: false });
    }

    #[test]
    fn test_empty_question_set_is_rejected() {
        let exam = exam(false, false);
        assert_eq!(
            grade_submission(&exam, Vec::new(), None, &[], at(1_500)),
            Err(GradeError::Scoring(ScoringError::EmptyQuestionSet))
        );
    }
}
