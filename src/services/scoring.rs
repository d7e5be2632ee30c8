// src/services/scoring.rs

use crate::models::question::Question;

/// Answers are compared after rounding both sides to this many parts per unit
/// (two decimal places), so `10 / 3` accepts `3.33`.
pub const ANSWER_SCALE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoringError {
    #[error("Cannot score an exam without questions")]
    EmptyQuestionSet,
    #[error("Received {received} answers for {expected} questions")]
    TooManyAnswers { expected: usize, received: usize },
}

/// Whether `submitted` matches `expected` at two-decimal precision.
/// Non-finite answers never match.
pub fn answer_matches(expected: f64, submitted: f64) -> bool {
    if !expected.is_finite() || !submitted.is_finite() {
        return false;
    }
    (expected * ANSWER_SCALE).round() == (submitted * ANSWER_SCALE).round()
}

/// Number of questions answered correctly, position by position.
/// Missing trailing answers count as wrong.
pub fn count_correct(questions: &[Question], answers: &[f64]) -> usize {
    questions
        .iter()
        .zip(answers)
        .filter(|(q, answer)| answer_matches(q.correct_result(), **answer))
        .count()
}

/// Grades `answers` against `questions` (already in delivery order).
///
/// Returns `floor(100 * correct / total)`.
pub fn score(questions: &[Question], answers: &[f64]) -> Result<u32, ScoringError> {
    if questions.is_empty() {
        return Err(ScoringError::EmptyQuestionSet);
    }
    if answers.len() > questions.len() {
        return Err(ScoringError::TooManyAnswers {
            expected: questions.len(),
            received: answers.len(),
        });
    }

    let correct = count_correct(questions, answers);
    // correct <= total, so the result fits in 0..=100.
    Ok((correct * 100 / questions.len()) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Operator;
    use uuid::Uuid;

    fn q(operand1: i32, operator: Operator, operand2: i32) -> Question {
        Question {
            id: Uuid::new_v4(),
            exam_id: Uuid::nil(),
            operand1,
            operator,
            operand2,
        }
    }

    #[test]
    fn test_score_examples() {
        let questions = vec![q(2, Operator::Add, 3), q(10, Operator::Sub, 4)];
        assert_eq!(score(&questions, &[5.0, 6.0]), Ok(100));
        assert_eq!(score(&questions, &[5.0, 0.0]), Ok(50));
        assert_eq!(score(&questions, &[0.0, 0.0]), Ok(0));
    }

    #[test]
    fn test_score_rejects_empty_question_set() {
        assert_eq!(score(&[], &[1.0]), Err(ScoringError::EmptyQuestionSet));
        assert_eq!(score(&[], &[]), Err(ScoringError::EmptyQuestionSet));
    }

    #[test]
    fn test_score_truncates() {
        let questions = vec![
            q(1, Operator::Add, 1),
            q(1, Operator::Add, 1),
            q(1, Operator::Add, 1),
        ];
        // 2/3 = 66.67% truncates to 66.
        assert_eq!(score(&questions, &[2.0, 2.0, 0.0]), Ok(66));
        assert_eq!(score(&questions, &[2.0, 0.0, 0.0]), Ok(33));
    }

    #[test]
    fn test_score_missing_answers_are_wrong() {
        let questions = vec![q(1, Operator::Add, 1), q(2, Operator::Mul, 2)];
        assert_eq!(score(&questions, &[2.0]), Ok(50));
        assert_eq!(score(&questions, &[]), Ok(0));
    }

    #[test]
    fn test_score_rejects_surplus_answers() {
        let questions = vec![q(1, Operator::Add, 1)];
        assert_eq!(
            score(&questions, &[2.0, 3.0]),
            Err(ScoringError::TooManyAnswers {
                expected: 1,
                received: 2
            })
        );
    }

    #[test]
    fn test_division_matches_at_two_decimals() {
        let third = q(10, Operator::Div, 3);
        assert!(answer_matches(third.correct_result(), 3.33));
        assert!(!answer_matches(third.correct_result(), 3.3));
        assert!(answer_matches(Operator::Div.apply(2, 3), 0.67));
        assert!(!answer_matches(Operator::Div.apply(2, 3), 0.66));
        assert!(answer_matches(Operator::Div.apply(7, 2), 3.5));
    }

    #[test]
    fn test_non_finite_answers_never_match() {
        assert!(!answer_matches(1.0, f64::NAN));
        assert!(!answer_matches(1.0, f64::INFINITY));
    }

    #[test]
    fn test_negative_results() {
        let questions = vec![q(3, Operator::Sub, 10), q(-4, Operator::Mul, 5)];
        assert_eq!(score(&questions, &[-7.0, -20.0]), Ok(100));
    }
}
