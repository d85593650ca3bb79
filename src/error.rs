//! Error taxonomy shared by the domain core and both transport surfaces.
//!
//! Three families:
//! - `ValidationError`: reported synchronously to the caller, never retried.
//! - `PersistenceError`: a whole-document write was refused; surfaced as a
//!   generic failure, flow state left unchanged.
//! - `DataIntegrityError`: an assignment references data the bank no longer
//!   holds; fatal for the session being constructed.

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
  #[error("assignment title must not be empty")]
  EmptyTitle,
  #[error("an assignment needs at least one question")]
  EmptySelection,
  #[error("unknown user: {0}")]
  UnknownUser(String),
  #[error("unknown question: {0}")]
  UnknownQuestion(String),
  #[error("unknown assignment: {0}")]
  UnknownAssignment(String),
  #[error("user {0} is not a student of the signed-in teacher")]
  NotOwnStudent(String),
  #[error("'{option}' is not an option of question {question_id}")]
  NotAnOption { question_id: String, option: String },
  #[error("expected {expected} answers, got {got}")]
  AnswerCountMismatch { expected: usize, got: usize },
  #[error("the practice session is already finished")]
  SessionFinished,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PersistenceError {
  #[error("assignment {0} does not exist")]
  NotFound(String),
  #[error("assignment {0} is already completed")]
  AlreadyCompleted(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DataIntegrityError {
  #[error("assignment {assignment_id} references missing question {question_id}")]
  MissingQuestion {
    assignment_id: String,
    question_id: String,
  },
  #[error("assignment {0} has no questions")]
  EmptyAssignment(String),
}
