//! HTTP endpoint handlers. These are thin wrappers that forward to the same
//! core the WebSocket flow uses; each handler is instrumented and errors map
//! to a status code plus a `{code, message}` body.

use std::sync::Arc;

use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};

use crate::composer::{compose, filter_by_topic, resolve_selection, topics, TOPIC_ALL};
use crate::domain::Role;
use crate::error::{PersistenceError, ValidationError};
use crate::flow::FlowError;
use crate::navigator::NavigationError;
use crate::protocol::*;
use crate::session::{PracticeSession, SessionState};
use crate::state::AppState;

/// FlowError carried through an HTTP handler, with its status mapping.
pub struct ApiError(FlowError);

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self.0 {
      FlowError::NotSignedIn => StatusCode::UNAUTHORIZED,
      FlowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
      FlowError::Persistence(PersistenceError::NotFound(_)) => StatusCode::NOT_FOUND,
      FlowError::Persistence(PersistenceError::AlreadyCompleted(_)) => StatusCode::CONFLICT,
      FlowError::Integrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
      FlowError::Navigation(_) => StatusCode::FORBIDDEN,
    };
    warn!(target: "mentora_backend", code = self.0.code(), error = %self.0, "HTTP request rejected");
    (status, Json(ErrorOut { code: self.0.code(), message: self.0.to_string() })).into_response()
  }
}

impl<E> From<E> for ApiError
where
  E: Into<FlowError>,
{
  fn from(e: E) -> Self {
    ApiError(e.into())
  }
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { ok: true })
}

/// Bank listing with the composer's topic filter. `exclude` carries the
/// in-progress selection as comma-separated ids.
#[instrument(level = "info", skip(state))]
pub async fn http_get_questions(
  State(state): State<Arc<AppState>>,
  Query(q): Query<QuestionQuery>,
) -> impl IntoResponse {
  let bank = state.question_bank();
  let topic = q.topic.unwrap_or_else(|| TOPIC_ALL.into());
  let excluded: Vec<_> = match &q.exclude {
    Some(csv) => {
      let ids: Vec<&str> = csv.split(',').map(str::trim).collect();
      bank.iter().filter(|q| ids.contains(&q.id.as_str())).cloned().collect()
    }
    None => Vec::new(),
  };
  let filtered = filter_by_topic(&bank, &topic, &excluded);
  info!(target: "mentora_backend", %topic, count = filtered.len(), "HTTP bank filtered");
  Json(filtered.into_iter().map(question_out).collect::<Vec<_>>())
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_topics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(TopicsOut { topics: topics(&state.question_bank()) })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_users(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(users_out(&state.users_snapshot()))
}

#[instrument(level = "info", skip(state), fields(%q.teacher_id))]
pub async fn http_get_students(
  State(state): State<Arc<AppState>>,
  Query(q): Query<StudentsQuery>,
) -> impl IntoResponse {
  Json(users_out(&state.students_of(&q.teacher_id).await))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_assignments(
  State(state): State<Arc<AppState>>,
  Query(q): Query<AssignmentsQuery>,
) -> impl IntoResponse {
  let assignments = match &q.student_id {
    Some(student_id) => state.assignments_for(student_id).await,
    None => state.assignments_snapshot().as_ref().clone(),
  };
  Json(assignments_out(&assignments))
}

/// Compose and persist a new assignment. Same validation path as the
/// WebSocket flow: unknown parties/questions and blank titles never reach
/// the store.
#[instrument(level = "info", skip(state, body), fields(%body.teacher_id, %body.student_id, title = %body.title))]
pub async fn http_post_assignment(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CreateAssignmentIn>,
) -> Result<Json<AssignmentOut>, ApiError> {
  let teacher = state
    .get_user(&body.teacher_id)
    .await
    .ok_or_else(|| ValidationError::UnknownUser(body.teacher_id.clone()))?;
  if teacher.role != Role::Teacher {
    return Err(NavigationError::NotPermitted.into());
  }
  let student = state
    .get_user(&body.student_id)
    .await
    .ok_or_else(|| ValidationError::UnknownUser(body.student_id.clone()))?;
  if student.role != Role::Student || student.teacher_id.as_deref() != Some(teacher.id.as_str()) {
    return Err(ValidationError::NotOwnStudent(body.student_id.clone()).into());
  }

  let bank = state.question_bank();
  let selection = resolve_selection(&bank, &body.question_ids)?;
  let draft = compose(&body.title, &selection)?;
  let assignment = state.create_assignment(draft, &student.id, &teacher.id).await;
  info!(target: "assignment", id = %assignment.id, "HTTP assignment created");
  Ok(Json(assignment_out(&assignment)))
}

/// Replay a whole ordered answer sheet through the practice engine and
/// persist the score via the compare-and-set completion write.
#[instrument(level = "info", skip(state, body), fields(%assignment_id, %body.student_id, answers = body.answers.len()))]
pub async fn http_post_submit(
  State(state): State<Arc<AppState>>,
  Path(assignment_id): Path<String>,
  Json(body): Json<SubmitAnswersIn>,
) -> Result<Json<ScoreOut>, ApiError> {
  let student = state
    .get_user(&body.student_id)
    .await
    .ok_or_else(|| ValidationError::UnknownUser(body.student_id.clone()))?;
  let assignment = state
    .get_assignment(&assignment_id)
    .await
    .ok_or_else(|| ValidationError::UnknownAssignment(assignment_id.clone()))?;
  if student.role != Role::Student || assignment.student_id != student.id {
    return Err(NavigationError::NotPermitted.into());
  }
  if body.answers.len() != assignment.question_ids.len() {
    return Err(
      ValidationError::AnswerCountMismatch {
        expected: assignment.question_ids.len(),
        got: body.answers.len(),
      }
      .into(),
    );
  }

  let bank = state.question_bank();
  let mut practice = PracticeSession::start(&assignment, &bank)?;
  for answer in &body.answers {
    practice.submit_answer(answer)?;
  }
  let score = match practice.state() {
    SessionState::Finished { score } => *score,
    // Unreachable: the count check above guarantees the replay finishes.
    SessionState::Active { .. } => {
      return Err(
        ValidationError::AnswerCountMismatch {
          expected: assignment.question_ids.len(),
          got: body.answers.len(),
        }
        .into(),
      )
    }
  };
  state.complete_assignment(&assignment.id, score).await?;
  info!(target: "session", assignment = %assignment.id, score, "HTTP answer sheet graded");
  Ok(Json(ScoreOut { score }))
}
