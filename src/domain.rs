//! Domain documents used by the backend: questions, users, and assignments.
//!
//! Field names serialize in camelCase so documents match what the SPA
//! expects on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who is signed in, and which dashboard they land on.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Teacher,
  Student,
}

/// A user document. Students carry a reference to their owning teacher.
/// Read-only from this backend's perspective.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: String,
  pub name: String,
  pub role: Role,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub teacher_id: Option<String>,
}

/// One quiz question in the bank. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub id: String,
  pub topic: String,
  pub content: String,
  pub options: Vec<String>,
  pub answer: String,
}

impl Question {
  /// Bank invariants: non-empty id, non-empty options, answer is one of them.
  pub fn is_well_formed(&self) -> bool {
    !self.id.trim().is_empty()
      && !self.options.is_empty()
      && self.options.iter().any(|o| o == &self.answer)
  }
}

/// A quiz instance a teacher assigned to a student.
///
/// Mutated exactly once after creation: `completed` flips false→true with
/// `score` assigned atomically. `score` is present iff `completed`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
  pub id: String,
  pub student_id: String,
  pub teacher_id: String,
  pub title: String,
  pub question_ids: Vec<String>,
  pub completed: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub score: Option<u8>,
  pub created_at: DateTime<Utc>,
}

/// Composer output: an assignment minus everything the store stamps at
/// creation time (id, parties, timestamp, completion state).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssignmentDraft {
  pub title: String,
  pub question_ids: Vec<String>,
}
