//! Practice session engine: drives a student through one assignment's
//! questions in order and produces the final score.
//!
//! The engine is presentation-agnostic. It resolves the assignment's
//! question ids against a bank snapshot once at start (a missing id fails
//! construction, since skipping it would corrupt score accounting) and runs
//! a small state machine: `Active(index, answers)` until the last answer,
//! `Finished(score)` after it. The terminal state accepts no transitions.

use std::collections::HashMap;

use crate::domain::{Assignment, Question};
use crate::error::{DataIntegrityError, ValidationError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
  Active {
    index: usize,
    answers: HashMap<String, String>,
  },
  Finished {
    score: u8,
  },
}

/// Outcome of one `submit_answer` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Turn {
  /// Advanced to the question at `index`.
  Next { index: usize },
  /// Last answer recorded; the session is over.
  Finished { score: u8 },
}

#[derive(Clone, Debug)]
pub struct PracticeSession {
  assignment_id: String,
  questions: Vec<Question>,
  state: SessionState,
}

impl PracticeSession {
  /// Resolve `assignment.question_ids` against `bank`, in order.
  ///
  /// Fails with a `DataIntegrityError` when the assignment is empty or any
  /// id no longer resolves.
  pub fn start(assignment: &Assignment, bank: &[Question]) -> Result<Self, DataIntegrityError> {
    if assignment.question_ids.is_empty() {
      return Err(DataIntegrityError::EmptyAssignment(assignment.id.clone()));
    }
    let mut questions = Vec::with_capacity(assignment.question_ids.len());
    for qid in &assignment.question_ids {
      match bank.iter().find(|q| &q.id == qid) {
        Some(q) => questions.push(q.clone()),
        None => {
          return Err(DataIntegrityError::MissingQuestion {
            assignment_id: assignment.id.clone(),
            question_id: qid.clone(),
          })
        }
      }
    }
    Ok(Self {
      assignment_id: assignment.id.clone(),
      questions,
      state: SessionState::Active {
        index: 0,
        answers: HashMap::new(),
      },
    })
  }

  pub fn assignment_id(&self) -> &str {
    &self.assignment_id
  }

  pub fn state(&self) -> &SessionState {
    &self.state
  }

  pub fn total(&self) -> usize {
    self.questions.len()
  }

  /// The question awaiting an answer, or None once finished.
  pub fn current_question(&self) -> Option<&Question> {
    match &self.state {
      SessionState::Active { index, .. } => self.questions.get(*index),
      SessionState::Finished { .. } => None,
    }
  }

  /// Record `chosen` for the current question and advance.
  ///
  /// Valid only while `Active`; the chosen option must be one of the current
  /// question's options. Re-answering a question overwrites the prior answer
  /// (last write wins).
  pub fn submit_answer(&mut self, chosen: &str) -> Result<Turn, ValidationError> {
    let (index, answers) = match &mut self.state {
      SessionState::Active { index, answers } => (*index, answers),
      SessionState::Finished { .. } => return Err(ValidationError::SessionFinished),
    };
    let question = &self.questions[index];
    if !question.options.iter().any(|o| o == chosen) {
      return Err(ValidationError::NotAnOption {
        question_id: question.id.clone(),
        option: chosen.to_string(),
      });
    }
    answers.insert(question.id.clone(), chosen.to_string());

    if index + 1 == self.questions.len() {
      let score = score_answers(&self.questions, answers);
      self.state = SessionState::Finished { score };
      Ok(Turn::Finished { score })
    } else {
      let next = index + 1;
      if let SessionState::Active { index, .. } = &mut self.state {
        *index = next;
      }
      Ok(Turn::Next { index: next })
    }
  }
}

/// Count exact matches (string equality, no normalization) and turn them
/// into a 0..=100 percentage. Unanswered questions count as incorrect.
fn score_answers(questions: &[Question], answers: &HashMap<String, String>) -> u8 {
  let correct = questions
    .iter()
    .filter(|q| answers.get(&q.id) == Some(&q.answer))
    .count();
  round_half_up_percent(correct, questions.len())
}

/// `round(100 * correct / total)` with ties rounding up, in integer
/// arithmetic. Float-to-int rounding differs across ecosystems; this keeps
/// the tie rule explicit.
pub fn round_half_up_percent(correct: usize, total: usize) -> u8 {
  debug_assert!(total > 0 && correct <= total);
  ((200 * correct + total) / (2 * total)) as u8
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  fn q(id: &str, options: &[&str], answer: &str) -> Question {
    Question {
      id: id.into(),
      topic: "algebra".into(),
      content: format!("prompt {id}"),
      options: options.iter().map(|s| s.to_string()).collect(),
      answer: answer.into(),
    }
  }

  fn assignment(question_ids: &[&str]) -> Assignment {
    Assignment {
      id: "a1".into(),
      student_id: "s1".into(),
      teacher_id: "t1".into(),
      title: "Weekly".into(),
      question_ids: question_ids.iter().map(|s| s.to_string()).collect(),
      completed: false,
      score: None,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn rounding_is_half_up() {
    assert_eq!(round_half_up_percent(0, 3), 0);
    assert_eq!(round_half_up_percent(3, 3), 100);
    assert_eq!(round_half_up_percent(1, 2), 50);
    assert_eq!(round_half_up_percent(1, 3), 33);
    assert_eq!(round_half_up_percent(2, 3), 67);
    // 1/8 = 12.5%: the tie goes up.
    assert_eq!(round_half_up_percent(1, 8), 13);
  }

  #[test]
  fn start_fails_on_missing_question() {
    let bank = vec![q("1", &["A", "B"], "A")];
    let err = PracticeSession::start(&assignment(&["1", "2"]), &bank).unwrap_err();
    assert_eq!(
      err,
      DataIntegrityError::MissingQuestion {
        assignment_id: "a1".into(),
        question_id: "2".into(),
      }
    );
  }

  #[test]
  fn start_fails_on_empty_assignment() {
    let err = PracticeSession::start(&assignment(&[]), &[]).unwrap_err();
    assert_eq!(err, DataIntegrityError::EmptyAssignment("a1".into()));
  }

  #[test]
  fn index_advances_by_one_and_finishes_exactly_once() {
    let bank = vec![
      q("1", &["A", "B"], "A"),
      q("2", &["C", "D"], "D"),
      q("3", &["E", "F"], "E"),
    ];
    let mut s = PracticeSession::start(&assignment(&["1", "2", "3"]), &bank).expect("session");
    assert_eq!(s.current_question().map(|q| q.id.as_str()), Some("1"));
    assert_eq!(s.submit_answer("A"), Ok(Turn::Next { index: 1 }));
    assert_eq!(s.submit_answer("C"), Ok(Turn::Next { index: 2 }));
    assert_eq!(s.submit_answer("E"), Ok(Turn::Finished { score: 67 }));
    assert_eq!(s.current_question(), None);
    assert_eq!(s.submit_answer("E"), Err(ValidationError::SessionFinished));
  }

  #[test]
  fn chosen_option_must_be_offered() {
    let bank = vec![q("1", &["A", "B"], "A")];
    let mut s = PracticeSession::start(&assignment(&["1"]), &bank).expect("session");
    assert_eq!(
      s.submit_answer("Z"),
      Err(ValidationError::NotAnOption {
        question_id: "1".into(),
        option: "Z".into(),
      })
    );
    // Rejected submissions do not advance the session.
    assert_eq!(s.current_question().map(|q| q.id.as_str()), Some("1"));
  }

  #[test]
  fn playback_order_follows_assignment_not_bank() {
    let bank = vec![q("1", &["A", "B"], "A"), q("2", &["C", "D"], "D")];
    let mut s = PracticeSession::start(&assignment(&["2", "1"]), &bank).expect("session");
    assert_eq!(s.current_question().map(|q| q.id.as_str()), Some("2"));
    s.submit_answer("D").expect("turn");
    assert_eq!(s.current_question().map(|q| q.id.as_str()), Some("1"));
  }

  #[test]
  fn all_correct_and_half_correct_end_to_end() {
    let bank = vec![q("1", &["A", "B"], "A"), q("2", &["C", "D"], "D")];

    let mut s = PracticeSession::start(&assignment(&["1", "2"]), &bank).expect("session");
    s.submit_answer("A").expect("turn");
    assert_eq!(s.submit_answer("D"), Ok(Turn::Finished { score: 100 }));

    let mut s = PracticeSession::start(&assignment(&["1", "2"]), &bank).expect("session");
    s.submit_answer("B").expect("turn");
    assert_eq!(s.submit_answer("D"), Ok(Turn::Finished { score: 50 }));
  }
}
