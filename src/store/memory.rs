// src/store/memory.rs

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        exam::Exam,
        question::Question,
        score::Score,
        user::{Role, User},
    },
    store::Store,
};

#[derive(Default)]
struct Tables {
    exams: HashMap<Uuid, Exam>,
    // Vec order is insertion order.
    questions: HashMap<Uuid, Vec<Question>>,
    scores: Vec<Score>,
    users: HashMap<Uuid, User>,
}

/// In-process `Store`. Used by the test suite and for running without a
/// database; contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_exam(&self, id: Uuid) -> Result<Option<Exam>, AppError> {
        Ok(self.tables.read().await.exams.get(&id).cloned())
    }

    async fn list_exams(&self, limit: Option<i64>) -> Result<Vec<Exam>, AppError> {
        let tables = self.tables.read().await;
        let mut exams: Vec<Exam> = tables.exams.values().cloned().collect();
        exams.sort_by_key(|e| (e.start_time, e.id));
        if let Some(limit) = limit {
            exams.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        }
        Ok(exams)
    }

    async fn insert_exam(&self, exam: &Exam, questions: &[Question]) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if tables.exams.contains_key(&exam.id) {
            return Err(AppError::Conflict("Record already exists".to_string()));
        }
        tables.exams.insert(exam.id, exam.clone());
        tables.questions.insert(exam.id, questions.to_vec());
        Ok(())
    }

    async fn update_exam(
        &self,
        exam: &Exam,
        questions: Option<&[Question]>,
    ) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let Some(slot) = tables.exams.get_mut(&exam.id) else {
            return Ok(false);
        };
        *slot = exam.clone();
        if let Some(questions) = questions {
            tables.questions.insert(exam.id, questions.to_vec());
        }
        Ok(true)
    }

    async fn delete_exam(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.exams.remove(&id).is_none() {
            return Ok(false);
        }
        tables.questions.remove(&id);
        tables.scores.retain(|s| s.exam_id != id);
        Ok(true)
    }

    async fn list_questions(&self, exam_id: Uuid) -> Result<Vec<Question>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.questions.get(&exam_id).cloned().unwrap_or_default())
    }

    async fn insert_score(&self, score: &Score) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if !tables.exams.contains_key(&score.exam_id) {
            return Err(AppError::NotFound("Exam not found".to_string()));
        }
        tables.scores.push(score.clone());
        Ok(())
    }

    async fn list_scores_by_exam(&self, exam_id: Uuid) -> Result<Vec<Score>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .scores
            .iter()
            .filter(|s| s.exam_id == exam_id)
            .cloned()
            .collect())
    }

    async fn list_scores_by_user(&self, user_id: Uuid) -> Result<Vec<Score>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .scores
            .iter()
            .rev()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        self.insert_users(std::slice::from_ref(user)).await
    }

    async fn insert_users(&self, users: &[User]) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;

        let mut batch = HashSet::new();
        for user in users {
            let taken = !batch.insert(user.username.as_str())
                || tables.users.values().any(|u| u.username == user.username);
            if taken {
                return Err(AppError::Conflict(format!(
                    "Username '{}' already exists",
                    user.username
                )));
            }
        }

        for user in users {
            tables.users.insert(user.id, user.clone());
        }
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some(user) => {
                user.password = password_hash.to_owned();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_students(&self, teacher_id: Uuid) -> Result<Vec<User>, AppError> {
        let tables = self.tables.read().await;
        let mut students: Vec<User> = tables
            .users
            .values()
            .filter(|u| u.role == Role::Student && u.belong_to == Some(teacher_id))
            .cloned()
            .collect();
        students.sort_by(|a, b| (a.number, &a.username).cmp(&(b.number, &b.username)));
        Ok(students)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.scores.retain(|s| s.user_id != id);
        for user in tables.users.values_mut() {
            if user.belong_to == Some(id) {
                user.belong_to = None;
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Operator;
    use chrono::{Duration, Utc};

    fn exam(offset_hours: i64) -> Exam {
        let start = Utc::now() + Duration::hours(offset_hours);
        Exam {
            id: Uuid::new_v4(),
            name: format!("exam {offset_hours}"),
            start_time: start,
            end_time: start + Duration::minutes(30),
            allow_answer_when_expired: false,
            random_question: false,
        }
    }

    fn question(exam_id: Uuid, operand1: i32) -> Question {
        Question {
            id: Uuid::new_v4(),
            exam_id,
            operand1,
            operator: Operator::Add,
            operand2: 1,
        }
    }

    fn user(username: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password: "hash".to_string(),
            role: Role::Student,
            name: "Student".to_string(),
            class_name: None,
            number: 1,
            belong_to: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_questions_keep_insertion_order() {
        let store = MemoryStore::new();
        let exam = exam(1);
        let questions: Vec<Question> = [5, 1, 3].iter().map(|&n| question(exam.id, n)).collect();
        store.insert_exam(&exam, &questions).await.unwrap();

        let listed = store.list_questions(exam.id).await.unwrap();
        let operands: Vec<i32> = listed.iter().map(|q| q.operand1).collect();
        assert_eq!(operands, vec![5, 1, 3]);
    }

    #[tokio::test]
    async fn test_list_exams_sorted_and_limited() {
        let store = MemoryStore::new();
        for offset in [3, 1, 2] {
            store.insert_exam(&exam(offset), &[]).await.unwrap();
        }
        let all = store.list_exams(None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].start_time <= w[1].start_time));
        assert_eq!(store.list_exams(Some(2)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_exam_cascades() {
        let store = MemoryStore::new();
        let exam = exam(1);
        store
            .insert_exam(&exam, &[question(exam.id, 1)])
            .await
            .unwrap();
        let student = user("student1");
        store
            .insert_score(&Score {
                id: Uuid::new_v4(),
                exam_id: exam.id,
                user_id: student.id,
                score: 100,
                expired_flag: false,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(store.delete_exam(exam.id).await.unwrap());
        assert!(store.find_exam(exam.id).await.unwrap().is_none());
        assert!(store.list_questions(exam.id).await.unwrap().is_empty());
        assert!(store.list_scores_by_exam(exam.id).await.unwrap().is_empty());
        assert!(!store.delete_exam(exam.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_score_for_unknown_exam_is_rejected() {
        let store = MemoryStore::new();
        let result = store
            .insert_score(&Score {
                id: Uuid::new_v4(),
                exam_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                score: 0,
                expired_flag: false,
                created_at: Utc::now(),
            })
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = MemoryStore::new();
        store.insert_user(&user("alice")).await.unwrap();
        let result = store.insert_user(&user("alice")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_exam_replaces_questions_only_when_given() {
        let store = MemoryStore::new();
        let mut exam = exam(1);
        store
            .insert_exam(&exam, &[question(exam.id, 1), question(exam.id, 2)])
            .await
            .unwrap();

        exam.name = "renamed".to_string();
        assert!(store.update_exam(&exam, None).await.unwrap());
        assert_eq!(store.list_questions(exam.id).await.unwrap().len(), 2);

        let replacement = [question(exam.id, 9)];
        assert!(store.update_exam(&exam, Some(&replacement)).await.unwrap());
        let questions = store.list_questions(exam.id).await.unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].operand1, 9);
        assert_eq!(store.find_exam(exam.id).await.unwrap().unwrap().name, "renamed");
    }

    #[tokio::test]
    async fn test_insert_users_is_all_or_nothing() {
        let store = MemoryStore::new();
        store.insert_user(&user("taken")).await.unwrap();

        let batch = [user("fresh1"), user("fresh2"), user("taken")];
        let result = store.insert_users(&batch).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert!(store.find_user_by_username("fresh1").await.unwrap().is_none());
        assert!(store.find_user_by_username("fresh2").await.unwrap().is_none());

        let repeated = [user("twin"), user("twin")];
        assert!(store.insert_users(&repeated).await.is_err());
        assert!(store.find_user_by_username("twin").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_students_skips_other_roles() {
        let store = MemoryStore::new();
        let teacher_id = Uuid::new_v4();

        let mut student = user("student1");
        student.belong_to = Some(teacher_id);
        let mut colleague = user("teacher2");
        colleague.role = Role::Teacher;
        colleague.belong_to = Some(teacher_id);
        store.insert_users(&[student, colleague]).await.unwrap();

        let listed = store.list_students(teacher_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].username, "student1");
    }
}
