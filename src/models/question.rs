// src/models/question.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Arithmetic operator of a question.
///
/// Serialized as its symbol; persisted as a small integer code
/// (0..=3 for + - * /).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
}

impl Operator {
    pub fn code(&self) -> i16 {
        match self {
            Operator::Add => 0,
            Operator::Sub => 1,
            Operator::Mul => 2,
            Operator::Div => 3,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
        }
    }

    /// Applies the operator with real-valued division.
    pub fn apply(&self, lhs: i32, rhs: i32) -> f64 {
        let (lhs, rhs) = (f64::from(lhs), f64::from(rhs));
        match self {
            Operator::Add => lhs + rhs,
            Operator::Sub => lhs - rhs,
            Operator::Mul => lhs * rhs,
            Operator::Div => lhs / rhs,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown operator code {0}")]
pub struct UnknownOperator(pub i16);

impl TryFrom<i16> for Operator {
    type Error = UnknownOperator;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Operator::Add),
            1 => Ok(Operator::Sub),
            2 => Ok(Operator::Mul),
            3 => Ok(Operator::Div),
            other => Err(UnknownOperator(other)),
        }
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub operand1: i32,
    #[sqlx(try_from = "i16")]
    pub operator: Operator,
    pub operand2: i32,
}

impl Question {
    /// Recomputes the expected answer.
    pub fn correct_result(&self) -> f64 {
        self.operator.apply(self.operand1, self.operand2)
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidQuestion {
    #[error("question {index} divides by zero")]
    DivisionByZero { index: usize },
}

/// A parsed `(operand1, operator, operand2)` tuple, before it is attached
/// to an exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub operand1: i32,
    pub operator: Operator,
    pub operand2: i32,
}

impl NewQuestion {
    pub fn into_question(self, exam_id: Uuid) -> Question {
        Question {
            id: Uuid::new_v4(),
            exam_id,
            operand1: self.operand1,
            operator: self.operator,
            operand2: self.operand2,
        }
    }
}

/// Checks every tuple and attaches the batch to `exam_id`, preserving order.
pub fn build_question_set(
    exam_id: Uuid,
    drafts: &[NewQuestion],
) -> Result<Vec<Question>, InvalidQuestion> {
    drafts
        .iter()
        .enumerate()
        .map(|(index, draft)| {
            if draft.operator == Operator::Div && draft.operand2 == 0 {
                Err(InvalidQuestion::DivisionByZero { index })
            } else {
                Ok(draft.into_question(exam_id))
            }
        })
        .collect()
}

/// DTO for sending a question to a student (no exam id, no answer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: Uuid,
    pub operand1: i32,
    pub operator: Operator,
    pub operand2: i32,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            operand1: q.operand1,
            operator: q.operator,
            operand2: q.operand2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_codes_round_trip() {
        for op in [Operator::Add, Operator::Sub, Operator::Mul, Operator::Div] {
            assert_eq!(Operator::try_from(op.code()).unwrap(), op);
        }
        assert!(Operator::try_from(4).is_err());
    }

    #[test]
    fn operator_serializes_as_symbol() {
        let json = serde_json::to_string(&Operator::Mul).unwrap();
        assert_eq!(json, "\"*\"");
        let op: Operator = serde_json::from_str("\"/\"").unwrap();
        assert_eq!(op, Operator::Div);
    }

    #[test]
    fn division_is_real_valued() {
        assert_eq!(Operator::Div.apply(7, 2), 3.5);
        assert_eq!(Operator::Sub.apply(2, 5), -3.0);
    }

    #[test]
    fn build_question_set_rejects_division_by_zero() {
        let exam_id = Uuid::new_v4();
        let drafts = [
            NewQuestion { operand1: 1, operator: Operator::Add, operand2: 1 },
            NewQuestion { operand1: 4, operator: Operator::Div, operand2: 0 },
        ];
        assert_eq!(
            build_question_set(exam_id, &drafts),
            Err(InvalidQuestion::DivisionByZero { index: 1 })
        );
    }

    #[test]
    fn build_question_set_keeps_order() {
        let exam_id = Uuid::new_v4();
        let drafts = [
            NewQuestion { operand1: 3, operator: Operator::Mul, operand2: 3 },
            NewQuestion { operand1: 1, operator: Operator::Sub, operand2: 9 },
        ];
        let questions = build_question_set(exam_id, &drafts).unwrap();
        assert_eq!(questions.len(), 2);
        assert!(questions.iter().all(|q| q.exam_id == exam_id));
        assert_eq!(questions[0].operand1, 3);
        assert_eq!(questions[1].operand2, 9);
    }
}
