//! Application state: the in-memory document store and its snapshot feeds.
//!
//! This module owns:
//!   - the three collections (questions, users, assignments)
//!   - a `watch` channel per collection broadcasting the full sorted
//!     snapshot after every mutation (last snapshot wins)
//!   - the two write operations: whole-document assignment creation and the
//!     compare-and-set completion write
//!
//! Questions and users are read-only after startup (config first, then
//! built-in seeds for any id still absent). Assignments start empty.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, RwLock};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::load_roster_config_from_env;
use crate::domain::{Assignment, AssignmentDraft, Question, Role, User};
use crate::error::PersistenceError;
use crate::seeds::{seed_questions, seed_users};

pub struct AppState {
    // The bank is immutable after startup; its feed value IS the store.
    questions_tx: watch::Sender<Arc<Vec<Question>>>,
    users: RwLock<BTreeMap<String, User>>,
    users_tx: watch::Sender<Arc<Vec<User>>>,
    assignments: RwLock<BTreeMap<String, Assignment>>,
    assignments_tx: watch::Sender<Arc<Vec<Assignment>>>,
}

impl AppState {
    /// Build state from env: load the TOML roster if configured, fill the
    /// gaps with built-in seeds, and open the snapshot feeds.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_roster_config_from_env().unwrap_or_default();

        let mut questions = BTreeMap::<String, Question>::new();
        for q in cfg.valid_questions() {
            questions.insert(q.id.clone(), q);
        }
        for q in seed_questions() {
            questions.entry(q.id.clone()).or_insert(q);
        }

        let mut users = BTreeMap::<String, User>::new();
        for u in cfg.valid_users() {
            users.insert(u.id.clone(), u);
        }
        for u in seed_users() {
            users.entry(u.id.clone()).or_insert(u);
        }

        // Inventory summary: bank size by topic, roster size by role.
        let mut by_topic = BTreeMap::<String, usize>::new();
        for q in questions.values() {
            *by_topic.entry(q.topic.clone()).or_default() += 1;
        }
        for (topic, count) in by_topic {
            info!(target: "mentora_backend", %topic, count, "Startup question bank inventory");
        }
        let teachers = users.values().filter(|u| u.role == Role::Teacher).count();
        let students = users.values().filter(|u| u.role == Role::Student).count();
        info!(target: "mentora_backend", teachers, students, "Startup roster inventory");

        Self::from_documents(questions, users)
    }

    /// Build state from explicit documents (tests use this directly).
    #[allow(dead_code)]
    pub fn with_roster(questions: Vec<Question>, users: Vec<User>) -> Self {
        Self::from_documents(
            questions.into_iter().map(|q| (q.id.clone(), q)).collect(),
            users.into_iter().map(|u| (u.id.clone(), u)).collect(),
        )
    }

    fn from_documents(questions: BTreeMap<String, Question>, users: BTreeMap<String, User>) -> Self {
        let (questions_tx, _) = watch::channel(Arc::new(questions.into_values().collect::<Vec<_>>()));
        let (users_tx, _) = watch::channel(Arc::new(users.values().cloned().collect::<Vec<_>>()));
        let (assignments_tx, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            questions_tx,
            users: RwLock::new(users),
            users_tx,
            assignments: RwLock::new(BTreeMap::new()),
            assignments_tx,
        }
    }

    //
    // Snapshot feeds. Receivers are dropped on connection teardown, which is
    // the unsubscribe.
    //

    pub fn subscribe_questions(&self) -> watch::Receiver<Arc<Vec<Question>>> {
        self.questions_tx.subscribe()
    }

    pub fn subscribe_users(&self) -> watch::Receiver<Arc<Vec<User>>> {
        self.users_tx.subscribe()
    }

    pub fn subscribe_assignments(&self) -> watch::Receiver<Arc<Vec<Assignment>>> {
        self.assignments_tx.subscribe()
    }

    /// The current bank snapshot (what a session or composer resolves against).
    pub fn question_bank(&self) -> Arc<Vec<Question>> {
        self.questions_tx.borrow().clone()
    }

    pub fn users_snapshot(&self) -> Arc<Vec<User>> {
        self.users_tx.borrow().clone()
    }

    pub fn assignments_snapshot(&self) -> Arc<Vec<Assignment>> {
        self.assignments_tx.borrow().clone()
    }

    //
    // Reads.
    //

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_user(&self, id: &str) -> Option<User> {
        self.users.read().await.get(id).cloned()
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_assignment(&self, id: &str) -> Option<Assignment> {
        self.assignments.read().await.get(id).cloned()
    }

    /// Students owned by `teacher_id`, in id order.
    pub async fn students_of(&self, teacher_id: &str) -> Vec<User> {
        self.users
            .read()
            .await
            .values()
            .filter(|u| u.role == Role::Student && u.teacher_id.as_deref() == Some(teacher_id))
            .cloned()
            .collect()
    }

    /// Assignments addressed to `student_id`, oldest first.
    pub async fn assignments_for(&self, student_id: &str) -> Vec<Assignment> {
        let mut out: Vec<Assignment> = self
            .assignments
            .read()
            .await
            .values()
            .filter(|a| a.student_id == student_id)
            .cloned()
            .collect();
        out.sort_by(|x, y| x.created_at.cmp(&y.created_at).then_with(|| x.id.cmp(&y.id)));
        out
    }

    //
    // Writes. An assignment is created or updated as a whole document.
    //

    /// Persist a composed draft as a new assignment document and publish the
    /// new assignments snapshot.
    #[instrument(level = "info", skip(self, draft), fields(%student_id, %teacher_id, title = %draft.title))]
    pub async fn create_assignment(
        &self,
        draft: AssignmentDraft,
        student_id: &str,
        teacher_id: &str,
    ) -> Assignment {
        let assignment = Assignment {
            id: Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            teacher_id: teacher_id.to_string(),
            title: draft.title,
            question_ids: draft.question_ids,
            completed: false,
            score: None,
            created_at: Utc::now(),
        };
        let mut assignments = self.assignments.write().await;
        assignments.insert(assignment.id.clone(), assignment.clone());
        self.publish_assignments(&assignments);
        info!(target: "assignment", id = %assignment.id, questions = assignment.question_ids.len(), "Assignment created");
        assignment
    }

    /// The sole authorized mutation: flip `completed` and set the score, as
    /// one document write, guarded by `completed == false`. Two racing
    /// completion writes for the same id cannot both succeed.
    #[instrument(level = "info", skip(self), fields(%id, score))]
    pub async fn complete_assignment(
        &self,
        id: &str,
        score: u8,
    ) -> Result<Assignment, PersistenceError> {
        let mut assignments = self.assignments.write().await;
        let assignment = assignments
            .get_mut(id)
            .ok_or_else(|| PersistenceError::NotFound(id.to_string()))?;
        if assignment.completed {
            return Err(PersistenceError::AlreadyCompleted(id.to_string()));
        }
        assignment.completed = true;
        assignment.score = Some(score);
        let updated = assignment.clone();
        self.publish_assignments(&assignments);
        info!(target: "assignment", %id, score, "Assignment completed");
        Ok(updated)
    }

    fn publish_assignments(&self, assignments: &BTreeMap<String, Assignment>) {
        let mut snapshot: Vec<Assignment> = assignments.values().cloned().collect();
        snapshot.sort_by(|x, y| x.created_at.cmp(&y.created_at).then_with(|| x.id.cmp(&y.id)));
        self.assignments_tx.send_replace(Arc::new(snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AssignmentDraft;

    fn roster() -> AppState {
        AppState::with_roster(seed_questions(), seed_users())
    }

    fn draft() -> AssignmentDraft {
        AssignmentDraft {
            title: "Weekly".into(),
            question_ids: vec!["q-alg-1".into(), "q-geo-1".into()],
        }
    }

    #[tokio::test]
    async fn creation_publishes_a_snapshot() {
        let state = roster();
        let mut rx = state.subscribe_assignments();
        assert!(rx.borrow_and_update().is_empty());

        let a = state.create_assignment(draft(), "student-demo-1", "teacher-demo").await;
        rx.changed().await.expect("snapshot");
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, a.id);
        assert!(!snapshot[0].completed);
        assert_eq!(snapshot[0].score, None);
    }

    #[tokio::test]
    async fn completion_is_compare_and_set() {
        let state = roster();
        let a = state.create_assignment(draft(), "student-demo-1", "teacher-demo").await;

        let done = state.complete_assignment(&a.id, 50).await.expect("first write");
        assert!(done.completed);
        assert_eq!(done.score, Some(50));

        let err = state.complete_assignment(&a.id, 100).await.unwrap_err();
        assert_eq!(err, PersistenceError::AlreadyCompleted(a.id.clone()));

        let err = state.complete_assignment("nope", 10).await.unwrap_err();
        assert_eq!(err, PersistenceError::NotFound("nope".into()));
    }

    #[tokio::test]
    async fn roster_reads_are_role_filtered() {
        let state = roster();
        let students = state.students_of("teacher-demo").await;
        assert_eq!(students.len(), 2);
        assert!(students.iter().all(|u| u.role == Role::Student));

        state.create_assignment(draft(), "student-demo-1", "teacher-demo").await;
        state.create_assignment(draft(), "student-demo-2", "teacher-demo").await;
        let mine = state.assignments_for("student-demo-1").await;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].student_id, "student-demo-1");
    }
}
