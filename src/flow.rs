//! Per-connection session flow, shared by the WebSocket handler.
//!
//! `SessionFlow` holds exactly what one signed-in browser session holds: the
//! resolved identity, the current navigator view, and the active practice
//! session. Every client event maps to domain calls plus a list of server
//! messages; all failures funnel through `FlowError` and surface as a single
//! typed error message with a stable wire code.
//!
//! There is no default identity. A connection with no resolved identity gets
//! every command except `sign_in`/`ping` rejected with an `auth` error.

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::composer::{compose, resolve_selection};
use crate::domain::{Role, User};
use crate::error::{DataIntegrityError, PersistenceError, ValidationError};
use crate::navigator::{transition, NavEvent, NavigationError, View};
use crate::protocol::{question_out, ClientWsMessage, ServerWsMessage};
use crate::session::{PracticeSession, SessionState, Turn};
use crate::state::AppState;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowError {
  #[error("not signed in")]
  NotSignedIn,
  #[error(transparent)]
  Validation(#[from] ValidationError),
  #[error(transparent)]
  Persistence(#[from] PersistenceError),
  #[error(transparent)]
  Integrity(#[from] DataIntegrityError),
  #[error(transparent)]
  Navigation(#[from] NavigationError),
}

impl FlowError {
  /// Stable wire code, shared by the WS error message and HTTP error body.
  pub fn code(&self) -> &'static str {
    match self {
      FlowError::NotSignedIn => "auth",
      FlowError::Validation(_) => "validation",
      FlowError::Persistence(_) => "persistence",
      FlowError::Integrity(_) => "data_integrity",
      FlowError::Navigation(_) => "navigation",
    }
  }
}

#[derive(Default)]
pub struct SessionFlow {
  identity: Option<User>,
  view: Option<View>,
  practice: Option<PracticeSession>,
}

impl SessionFlow {
  pub fn new() -> Self {
    Self::default()
  }

  /// Dispatch one client message. Failures become a single `error` message;
  /// flow state is never left half-updated.
  #[instrument(level = "debug", skip_all)]
  pub async fn handle(&mut self, state: &AppState, msg: ClientWsMessage) -> Vec<ServerWsMessage> {
    let result = match msg {
      ClientWsMessage::Ping => Ok(vec![ServerWsMessage::Pong]),
      ClientWsMessage::SignIn { user_id } => self.sign_in(state, &user_id).await,
      ClientWsMessage::SignOut => self.sign_out(),
      ClientWsMessage::SelectStudent { student_id } => {
        self.navigate_to_student(state, student_id, false).await
      }
      ClientWsMessage::OpenComposer { student_id } => {
        self.navigate_to_student(state, student_id, true).await
      }
      ClientWsMessage::Back => self.simple_nav(NavEvent::Back),
      ClientWsMessage::Cancel => self.simple_nav(NavEvent::Cancel),
      ClientWsMessage::Assign { title, question_ids } => {
        self.assign(state, &title, question_ids).await
      }
      ClientWsMessage::StartAssignment { assignment_id } => {
        self.start_assignment(state, &assignment_id).await
      }
      ClientWsMessage::SubmitAnswer { option } => self.submit_answer(state, &option).await,
    };
    result.unwrap_or_else(|e| {
      warn!(target: "session", code = e.code(), error = %e, "Flow event rejected");
      vec![ServerWsMessage::Error { code: e.code(), message: e.to_string() }]
    })
  }

  fn signed_in(&self) -> Result<User, FlowError> {
    self.identity.clone().ok_or(FlowError::NotSignedIn)
  }

  fn current_view(&self) -> Result<View, FlowError> {
    self.view.clone().ok_or(FlowError::NotSignedIn)
  }

  /// Resolve an externally-issued user id against the user collection.
  async fn sign_in(&mut self, state: &AppState, user_id: &str) -> Result<Vec<ServerWsMessage>, FlowError> {
    let user = state
      .get_user(user_id)
      .await
      .ok_or_else(|| ValidationError::UnknownUser(user_id.to_string()))?;
    let view = View::initial(user.role);
    info!(target: "session", id = %user.id, role = ?user.role, "Identity resolved");
    self.identity = Some(user.clone());
    self.view = Some(view.clone());
    self.practice = None;
    Ok(vec![
      ServerWsMessage::Identity { user: Some(crate::protocol::user_out(&user)) },
      ServerWsMessage::View { view },
    ])
  }

  fn sign_out(&mut self) -> Result<Vec<ServerWsMessage>, FlowError> {
    if let Some(user) = &self.identity {
      info!(target: "session", id = %user.id, "Signed out");
    }
    self.identity = None;
    self.view = None;
    self.practice = None;
    Ok(vec![ServerWsMessage::Identity { user: None }])
  }

  /// `select_student` / `open_composer`: both land on a view scoped to one
  /// of the signed-in teacher's own students.
  async fn navigate_to_student(
    &mut self,
    state: &AppState,
    student_id: String,
    composer: bool,
  ) -> Result<Vec<ServerWsMessage>, FlowError> {
    let user = self.signed_in()?;
    let view = self.current_view()?;
    verify_own_student(state, &user, &student_id).await?;
    let event = if composer {
      NavEvent::NavigateToComposer { student_id }
    } else {
      NavEvent::SelectStudent { student_id }
    };
    let next = transition(&view, event, &user)?;
    self.view = Some(next.clone());
    Ok(vec![ServerWsMessage::View { view: next }])
  }

  fn simple_nav(&mut self, event: NavEvent<'_>) -> Result<Vec<ServerWsMessage>, FlowError> {
    let user = self.signed_in()?;
    let view = self.current_view()?;
    let next = transition(&view, event, &user)?;
    self.view = Some(next.clone());
    Ok(vec![ServerWsMessage::View { view: next }])
  }

  /// Compose the selection against the current bank snapshot, persist the
  /// draft, and return to the student profile. Validation failures surface
  /// before anything is persisted.
  async fn assign(
    &mut self,
    state: &AppState,
    title: &str,
    question_ids: Vec<String>,
  ) -> Result<Vec<ServerWsMessage>, FlowError> {
    let user = self.signed_in()?;
    let view = self.current_view()?;
    let student_id = match &view {
      View::AssignmentComposer { student_id } => student_id.clone(),
      _ => return Err(NavigationError::InvalidTransition.into()),
    };

    let bank = state.question_bank();
    let selection = resolve_selection(&bank, &question_ids)?;
    let draft = compose(title, &selection)?;

    let assignment = state.create_assignment(draft, &student_id, &user.id).await;
    info!(target: "session", teacher = %user.id, student = %student_id, assignment = %assignment.id, "Assignment handed out");

    let next = transition(&view, NavEvent::AssignSucceeded, &user)?;
    self.view = Some(next.clone());
    Ok(vec![ServerWsMessage::View { view: next }])
  }

  /// Start practicing one of the signed-in student's open assignments.
  /// Resolution failure (a question id missing from the bank) fails the
  /// whole session rather than skipping the question.
  async fn start_assignment(
    &mut self,
    state: &AppState,
    assignment_id: &str,
  ) -> Result<Vec<ServerWsMessage>, FlowError> {
    let user = self.signed_in()?;
    let view = self.current_view()?;
    let assignment = state
      .get_assignment(assignment_id)
      .await
      .ok_or_else(|| ValidationError::UnknownAssignment(assignment_id.to_string()))?;

    let next = transition(&view, NavEvent::StartAssignment { assignment: &assignment }, &user)?;

    let bank = state.question_bank();
    let practice = PracticeSession::start(&assignment, &bank)?;
    info!(target: "session", student = %user.id, assignment = %assignment.id, questions = practice.total(), "Practice session started");

    let mut out = vec![ServerWsMessage::View { view: next.clone() }];
    out.extend(prompt(&practice));
    self.view = Some(next);
    self.practice = Some(practice);
    Ok(out)
  }

  /// Record one answer. On the final answer the score is persisted through
  /// the compare-and-set completion write before the results view is
  /// entered; if that write fails the flow stays where it is.
  async fn submit_answer(
    &mut self,
    state: &AppState,
    option: &str,
  ) -> Result<Vec<ServerWsMessage>, FlowError> {
    let user = self.signed_in()?;
    let view = self.current_view()?;
    let practice = self
      .practice
      .as_mut()
      .ok_or(FlowError::Navigation(NavigationError::InvalidTransition))?;

    match practice.submit_answer(option)? {
      Turn::Next { .. } => Ok(prompt(practice).into_iter().collect()),
      Turn::Finished { score } => {
        state.complete_assignment(practice.assignment_id(), score).await?;
        info!(target: "session", student = %user.id, assignment = %practice.assignment_id(), score, "Practice session finished");
        let next = transition(&view, NavEvent::SessionFinished { score }, &user)?;
        self.view = Some(next.clone());
        self.practice = None;
        Ok(vec![ServerWsMessage::View { view: next }])
      }
    }
  }
}

/// The current practice prompt: question plus (index, total) progress.
fn prompt(practice: &PracticeSession) -> Option<ServerWsMessage> {
  let index = match practice.state() {
    SessionState::Active { index, .. } => *index,
    SessionState::Finished { .. } => return None,
  };
  practice.current_question().map(|q| ServerWsMessage::Question {
    index,
    total: practice.total(),
    question: question_out(q),
  })
}

/// The target must exist, be a student, and belong to the signed-in teacher.
async fn verify_own_student(
  state: &AppState,
  teacher: &User,
  student_id: &str,
) -> Result<(), FlowError> {
  match state.get_user(student_id).await {
    Some(s) if s.role == Role::Student && s.teacher_id.as_deref() == Some(teacher.id.as_str()) => {
      Ok(())
    }
    Some(_) => Err(ValidationError::NotOwnStudent(student_id.to_string()).into()),
    None => Err(ValidationError::UnknownUser(student_id.to_string()).into()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::seeds::{seed_questions, seed_users};

  fn roster() -> AppState {
    AppState::with_roster(seed_questions(), seed_users())
  }

  fn error_code(msgs: &[ServerWsMessage]) -> Option<&'static str> {
    msgs.iter().find_map(|m| match m {
      ServerWsMessage::Error { code, .. } => Some(*code),
      _ => None,
    })
  }

  fn current_view(msgs: &[ServerWsMessage]) -> Option<&View> {
    msgs.iter().rev().find_map(|m| match m {
      ServerWsMessage::View { view } => Some(view),
      _ => None,
    })
  }

  async fn assign_weekly(state: &AppState) -> String {
    let mut teacher = SessionFlow::new();
    teacher.handle(state, ClientWsMessage::SignIn { user_id: "teacher-demo".into() }).await;
    teacher
      .handle(state, ClientWsMessage::SelectStudent { student_id: "student-demo-1".into() })
      .await;
    teacher
      .handle(state, ClientWsMessage::OpenComposer { student_id: "student-demo-1".into() })
      .await;
    let msgs = teacher
      .handle(
        state,
        ClientWsMessage::Assign {
          title: "Weekly".into(),
          question_ids: vec!["q-alg-1".into(), "q-geo-1".into()],
        },
      )
      .await;
    assert_eq!(error_code(&msgs), None);
    let assignments = state.assignments_for("student-demo-1").await;
    assert_eq!(assignments.len(), 1);
    assignments[0].id.clone()
  }

  #[tokio::test]
  async fn unauthenticated_commands_are_rejected() {
    let state = roster();
    let mut flow = SessionFlow::new();
    let msgs = flow
      .handle(&state, ClientWsMessage::SelectStudent { student_id: "student-demo-1".into() })
      .await;
    assert_eq!(error_code(&msgs), Some("auth"));
  }

  #[tokio::test]
  async fn sign_in_resolves_identity_and_lands_on_dashboard() {
    let state = roster();
    let mut flow = SessionFlow::new();
    let msgs = flow
      .handle(&state, ClientWsMessage::SignIn { user_id: "teacher-demo".into() })
      .await;
    assert_eq!(current_view(&msgs), Some(&View::TeacherDashboard));

    let msgs = flow.handle(&state, ClientWsMessage::SignIn { user_id: "ghost".into() }).await;
    assert_eq!(error_code(&msgs), Some("validation"));
  }

  #[tokio::test]
  async fn teacher_composes_and_hands_out_an_assignment() {
    let state = roster();
    let id = assign_weekly(&state).await;
    let assignment = state.get_assignment(&id).await.expect("stored");
    assert_eq!(assignment.question_ids, vec!["q-alg-1".to_string(), "q-geo-1".to_string()]);
    assert!(!assignment.completed);
  }

  #[tokio::test]
  async fn assign_rejects_unknown_questions_and_blank_titles() {
    let state = roster();
    let mut teacher = SessionFlow::new();
    teacher.handle(&state, ClientWsMessage::SignIn { user_id: "teacher-demo".into() }).await;
    teacher
      .handle(&state, ClientWsMessage::SelectStudent { student_id: "student-demo-1".into() })
      .await;
    teacher
      .handle(&state, ClientWsMessage::OpenComposer { student_id: "student-demo-1".into() })
      .await;

    let msgs = teacher
      .handle(
        &state,
        ClientWsMessage::Assign { title: "Weekly".into(), question_ids: vec!["ghost".into()] },
      )
      .await;
    assert_eq!(error_code(&msgs), Some("validation"));

    let msgs = teacher
      .handle(
        &state,
        ClientWsMessage::Assign { title: "  ".into(), question_ids: vec!["q-alg-1".into()] },
      )
      .await;
    assert_eq!(error_code(&msgs), Some("validation"));
    // Nothing was persisted.
    assert!(state.assignments_for("student-demo-1").await.is_empty());
  }

  #[tokio::test]
  async fn student_practices_to_a_perfect_score() {
    let state = roster();
    let id = assign_weekly(&state).await;

    let mut student = SessionFlow::new();
    student.handle(&state, ClientWsMessage::SignIn { user_id: "student-demo-1".into() }).await;
    let msgs = student
      .handle(&state, ClientWsMessage::StartAssignment { assignment_id: id.clone() })
      .await;
    assert_eq!(error_code(&msgs), None);
    assert!(msgs.iter().any(|m| matches!(
      m,
      ServerWsMessage::Question { index: 0, total: 2, .. }
    )));

    student.handle(&state, ClientWsMessage::SubmitAnswer { option: "4".into() }).await;
    let msgs = student.handle(&state, ClientWsMessage::SubmitAnswer { option: "180".into() }).await;
    assert_eq!(current_view(&msgs), Some(&View::Results { score: 100 }));

    let assignment = state.get_assignment(&id).await.expect("stored");
    assert!(assignment.completed);
    assert_eq!(assignment.score, Some(100));

    // Completed assignments cannot be started again.
    let msgs = student
      .handle(&state, ClientWsMessage::StartAssignment { assignment_id: id })
      .await;
    assert_eq!(error_code(&msgs), Some("navigation"));
  }

  #[tokio::test]
  async fn wrong_option_does_not_advance_the_session() {
    let state = roster();
    let id = assign_weekly(&state).await;

    let mut student = SessionFlow::new();
    student.handle(&state, ClientWsMessage::SignIn { user_id: "student-demo-1".into() }).await;
    student.handle(&state, ClientWsMessage::StartAssignment { assignment_id: id }).await;

    let msgs = student
      .handle(&state, ClientWsMessage::SubmitAnswer { option: "not-an-option".into() })
      .await;
    assert_eq!(error_code(&msgs), Some("validation"));

    // Still on the first question.
    let msgs = student.handle(&state, ClientWsMessage::SubmitAnswer { option: "4".into() }).await;
    assert!(msgs.iter().any(|m| matches!(
      m,
      ServerWsMessage::Question { index: 1, total: 2, .. }
    )));
  }

  #[tokio::test]
  async fn teachers_never_start_practice_sessions() {
    let state = roster();
    let id = assign_weekly(&state).await;

    let mut teacher = SessionFlow::new();
    teacher.handle(&state, ClientWsMessage::SignIn { user_id: "teacher-demo".into() }).await;
    let msgs = teacher
      .handle(&state, ClientWsMessage::StartAssignment { assignment_id: id })
      .await;
    assert_eq!(error_code(&msgs), Some("navigation"));
  }

  #[tokio::test]
  async fn foreign_students_are_not_selectable() {
    let mut users = seed_users();
    users.push(User {
      id: "t2".into(),
      name: "Second Teacher".into(),
      role: Role::Teacher,
      teacher_id: None,
    });
    let state = AppState::with_roster(seed_questions(), users);

    let mut flow = SessionFlow::new();
    flow.handle(&state, ClientWsMessage::SignIn { user_id: "t2".into() }).await;
    let msgs = flow
      .handle(&state, ClientWsMessage::SelectStudent { student_id: "student-demo-1".into() })
      .await;
    assert_eq!(error_code(&msgs), Some("validation"));
  }

  #[tokio::test]
  async fn sign_out_clears_the_session() {
    let state = roster();
    let mut flow = SessionFlow::new();
    flow.handle(&state, ClientWsMessage::SignIn { user_id: "student-demo-1".into() }).await;
    let msgs = flow.handle(&state, ClientWsMessage::SignOut).await;
    assert!(msgs
      .iter()
      .any(|m| matches!(m, ServerWsMessage::Identity { user: None })));
    let msgs = flow.handle(&state, ClientWsMessage::Back).await;
    assert_eq!(error_code(&msgs), Some("auth"));
  }
}
