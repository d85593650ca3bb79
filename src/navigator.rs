//! Session navigator: a finite-state router over the application's views.
//!
//! Views are a tagged variant and transitions an explicit guard table, so
//! role checks live here instead of being scattered through rendering code.
//! An event that is not valid for the current view (or not permitted for the
//! signed-in role) is rejected; callers treat that as a logic error, not a
//! recoverable end-user condition.

use serde::Serialize;
use thiserror::Error;

use crate::domain::{Assignment, Role, User};

/// The currently active view, tagged with whatever entity it is scoped to.
/// Serialized form uses the SPA's page names (`teacherDashboard`, ...).
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "name", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum View {
  TeacherDashboard,
  StudentProfile { student_id: String },
  AssignmentComposer { student_id: String },
  StudentDashboard,
  PracticeSession { assignment_id: String },
  Results { score: u8 },
}

impl View {
  /// Landing view for a freshly resolved identity.
  pub fn initial(role: Role) -> Self {
    match role {
      Role::Teacher => View::TeacherDashboard,
      Role::Student => View::StudentDashboard,
    }
  }
}

/// Navigation events. `StartAssignment` carries the assignment document so
/// the ownership/completion guard can be checked without a store lookup.
#[derive(Debug)]
pub enum NavEvent<'a> {
  SelectStudent { student_id: String },
  NavigateToComposer { student_id: String },
  Back,
  AssignSucceeded,
  Cancel,
  StartAssignment { assignment: &'a Assignment },
  SessionFinished { score: u8 },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NavigationError {
  #[error("event is not valid in the current view")]
  InvalidTransition,
  #[error("event is not permitted for this role")]
  NotPermitted,
}

/// The guard table. Pure: (view, event, identity) → next view.
pub fn transition(
  view: &View,
  event: NavEvent<'_>,
  identity: &User,
) -> Result<View, NavigationError> {
  use NavEvent::*;
  match (view, event) {
    (View::TeacherDashboard, SelectStudent { student_id }) => {
      guard_role(identity, Role::Teacher)?;
      Ok(View::StudentProfile { student_id })
    }
    (View::StudentProfile { .. }, NavigateToComposer { student_id }) => {
      guard_role(identity, Role::Teacher)?;
      Ok(View::AssignmentComposer { student_id })
    }
    (View::StudentProfile { .. }, Back) => Ok(View::TeacherDashboard),
    (View::AssignmentComposer { student_id }, AssignSucceeded)
    | (View::AssignmentComposer { student_id }, Cancel) => Ok(View::StudentProfile {
      student_id: student_id.clone(),
    }),
    (View::StudentDashboard, StartAssignment { assignment }) => {
      guard_role(identity, Role::Student)?;
      if assignment.student_id != identity.id || assignment.completed {
        return Err(NavigationError::NotPermitted);
      }
      Ok(View::PracticeSession {
        assignment_id: assignment.id.clone(),
      })
    }
    (View::PracticeSession { .. }, SessionFinished { score }) => Ok(View::Results { score }),
    (View::Results { .. }, Back) => Ok(View::initial(identity.role)),
    _ => Err(NavigationError::InvalidTransition),
  }
}

fn guard_role(identity: &User, role: Role) -> Result<(), NavigationError> {
  if identity.role == role {
    Ok(())
  } else {
    Err(NavigationError::NotPermitted)
  }
}
