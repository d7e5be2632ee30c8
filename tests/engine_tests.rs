// tests/engine_tests.rs
//
// Properties of the scheduling and scoring engine, exercised through the
// public library API without a server.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use examhall::{
    models::{
        exam::Exam,
        question::{NewQuestion, Operator, Question, build_question_set},
        user::Role,
    },
    services::{
        delivery::{deliver_questions, grade_submission},
        directory::select_current,
        schedule::{ScheduleError, check_no_overlap},
        scoring::{ScoringError, score},
        sequencer::shuffled_sequence,
    },
    utils::jwt::{AuthError, SessionAuthority},
};
use uuid::Uuid;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn exam(name: &str, start: i64, end: i64) -> Exam {
    Exam {
        id: Uuid::new_v4(),
        name: name.to_string(),
        start_time: at(start),
        end_time: at(end),
        allow_answer_when_expired: false,
        random_question: false,
    }
}

fn questions(exam_id: Uuid, n: i32) -> Vec<Question> {
    let drafts: Vec<NewQuestion> = (1..=n)
        .map(|i| NewQuestion {
            operand1: i,
            operator: Operator::Mul,
            operand2: i + 1,
        })
        .collect();
    build_question_set(exam_id, &drafts).unwrap()
}

#[test]
fn shuffle_is_deterministic_per_seed() {
    let items: Vec<u32> = (0..20).collect();
    for seed in [0, 1, 42, 1_700_000_000, -5] {
        assert_eq!(shuffled_sequence(&items, seed), shuffled_sequence(&items, seed));
    }
}

#[test]
fn shuffle_is_a_permutation() {
    for len in 0..12u32 {
        let items: Vec<u32> = (0..len).collect();
        for seed in 0..50 {
            let mut shuffled = shuffled_sequence(&items, seed);
            assert_eq!(shuffled.len(), items.len());
            shuffled.sort_unstable();
            assert_eq!(shuffled, items);
        }
    }
}

#[test]
fn different_seeds_usually_give_different_orders() {
    let items: Vec<u32> = (0..8).collect();
    let baseline = shuffled_sequence(&items, 0);

    let differing = (1..=200)
        .filter(|&seed| shuffled_sequence(&items, seed) != baseline)
        .count();

    // 8! orders; a handful of collisions at most.
    assert!(differing >= 180, "only {differing} of 200 seeds differed");
}

#[test]
fn overlap_check_is_symmetric() {
    let points = [0, 5, 10, 15, 20];
    for &s1 in &points {
        for &e1 in points.iter().filter(|&&e| e > s1) {
            for &s2 in &points {
                for &e2 in points.iter().filter(|&&e| e > s2) {
                    let a = exam("A", s1, e1);
                    let b = exam("B", s2, e2);
                    let ab = check_no_overlap(&a, std::slice::from_ref(&b), None).is_ok();
                    let ba = check_no_overlap(&b, std::slice::from_ref(&a), None).is_ok();
                    assert_eq!(ab, ba, "[{s1},{e1}) vs [{s2},{e2})");
                }
            }
        }
    }
}

#[test]
fn touching_windows_do_not_overlap() {
    let first = exam("First", 0, 10);
    assert!(check_no_overlap(&exam("Next", 10, 20), &[first.clone()], None).is_ok());

    match check_no_overlap(&exam("Clash", 9, 20), &[first], None) {
        Err(ScheduleError::Conflict { name, start, end }) => {
            assert_eq!(name, "First");
            assert_eq!((start, end), (at(0), at(10)));
        }
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[test]
fn editing_an_exam_ignores_its_own_window() {
    let existing = exam("Self", 0, 10);
    let mut edited = existing.clone();
    edited.end_time = at(12);
    assert!(check_no_overlap(&edited, &[existing.clone()], Some(existing.id)).is_ok());
}

#[test]
fn empty_question_set_is_rejected() {
    assert_eq!(score(&[], &[1.0]), Err(ScoringError::EmptyQuestionSet));
}

#[test]
fn scoring_examples() {
    let id = Uuid::new_v4();
    let drafts = [
        NewQuestion {
            operand1: 2,
            operator: Operator::Add,
            operand2: 3,
        },
        NewQuestion {
            operand1: 10,
            operator: Operator::Sub,
            operand2: 4,
        },
    ];
    let set = build_question_set(id, &drafts).unwrap();

    assert_eq!(score(&set, &[5.0, 6.0]), Ok(100));
    assert_eq!(score(&set, &[5.0, 0.0]), Ok(50));
    assert_eq!(score(&set, &[0.0, 0.0]), Ok(0));
}

#[test]
fn directory_selection_examples() {
    let exams = vec![exam("A", 100, 200), exam("B", 300, 400)];

    assert_eq!(select_current(&exams, at(150)).unwrap().name, "A");
    assert_eq!(select_current(&exams, at(250)).unwrap().name, "B");
    assert_eq!(select_current(&exams, at(500)).unwrap().name, "B");
    assert!(select_current(&[], at(500)).is_none());
}

#[test]
fn revoked_token_fails_validation() {
    let authority = SessionAuthority::new("engine_test_secret", 3600);
    let token = authority
        .issue(Role::Student, Some(&Uuid::new_v4().to_string()))
        .unwrap();
    assert!(authority.validate(&token).is_ok());

    authority.revoke(&token);
    assert_eq!(authority.validate(&token).unwrap_err(), AuthError::Revoked);
    // The signature itself is still fine.
    assert!(authority.verify_signature(&token).is_ok());
}

#[test]
fn seeded_delivery_grades_answers_by_question() {
    let mut live = exam("Live", 0, 1_000);
    live.random_question = true;
    let set = questions(live.id, 10);
    let expected: HashMap<Uuid, f64> = set.iter().map(|q| (q.id, q.correct_result())).collect();

    let delivered = deliver_questions(&live, set.clone(), at(500));
    let seed = delivered.seed.unwrap();
    assert_eq!(seed, 500);

    // All answers right, in delivered order.
    let answers: Vec<f64> = delivered.questions.iter().map(|q| expected[&q.id]).collect();
    let outcome = grade_submission(&live, set.clone(), Some(seed), &answers, at(600)).unwrap();
    assert_eq!(outcome.score, 100);
    assert!(!outcome.expired);

    // Only the first delivered question answered: exactly one of ten is right.
    let first_only = vec![expected[&delivered.questions[0].id]];
    let outcome = grade_submission(&live, set, Some(seed), &first_only, at(600)).unwrap();
    assert_eq!(outcome.score, 10);
}
