//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Assignment, Question, Role, User};
use crate::navigator::View;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    SignIn {
        #[serde(rename = "userId")]
        user_id: String,
    },
    SignOut,
    SelectStudent {
        #[serde(rename = "studentId")]
        student_id: String,
    },
    OpenComposer {
        #[serde(rename = "studentId")]
        student_id: String,
    },
    Back,
    Cancel,
    Assign {
        title: String,
        #[serde(rename = "questionIds")]
        question_ids: Vec<String>,
    },
    StartAssignment {
        #[serde(rename = "assignmentId")]
        assignment_id: String,
    },
    SubmitAnswer {
        option: String,
    },
}

/// Messages the server sends back over WebSocket. Snapshots are full
/// collection replacements, pushed at connect and on every change.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Identity {
        user: Option<UserOut>,
    },
    Questions {
        questions: Vec<QuestionOut>,
    },
    Users {
        users: Vec<UserOut>,
    },
    Assignments {
        assignments: Vec<AssignmentOut>,
    },
    View {
        view: View,
    },
    Question {
        index: usize,
        total: usize,
        question: QuestionOut,
    },
    Error {
        code: &'static str,
        message: String,
    },
}

/// Question DTO. Deliberately omits `answer`: scoring is server-side and the
/// correct answer never crosses the wire.
#[derive(Debug, Serialize)]
pub struct QuestionOut {
    pub id: String,
    pub topic: String,
    pub content: String,
    pub options: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOut {
    pub id: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentOut {
    pub id: String,
    pub student_id: String,
    pub teacher_id: String,
    pub title: String,
    pub question_ids: Vec<String>,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Convert internal documents to the public DTOs.
pub fn question_out(q: &Question) -> QuestionOut {
    QuestionOut {
        id: q.id.clone(),
        topic: q.topic.clone(),
        content: q.content.clone(),
        options: q.options.clone(),
    }
}

pub fn user_out(u: &User) -> UserOut {
    UserOut {
        id: u.id.clone(),
        name: u.name.clone(),
        role: u.role,
        teacher_id: u.teacher_id.clone(),
    }
}

pub fn assignment_out(a: &Assignment) -> AssignmentOut {
    AssignmentOut {
        id: a.id.clone(),
        student_id: a.student_id.clone(),
        teacher_id: a.teacher_id.clone(),
        title: a.title.clone(),
        question_ids: a.question_ids.clone(),
        completed: a.completed,
        score: a.score,
        created_at: a.created_at,
    }
}

pub fn questions_out(qs: &[Question]) -> Vec<QuestionOut> {
    qs.iter().map(question_out).collect()
}

pub fn users_out(us: &[User]) -> Vec<UserOut> {
    us.iter().map(user_out).collect()
}

pub fn assignments_out(assignments: &[Assignment]) -> Vec<AssignmentOut> {
    assignments.iter().map(assignment_out).collect()
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Debug, Deserialize)]
pub struct QuestionQuery {
    pub topic: Option<String>,
    /// Comma-separated question ids to exclude (an in-progress selection).
    pub exclude: Option<String>,
}

#[derive(Serialize)]
pub struct TopicsOut {
    pub topics: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct StudentsQuery {
    #[serde(rename = "teacherId")]
    pub teacher_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignmentsQuery {
    #[serde(rename = "studentId")]
    pub student_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAssignmentIn {
    #[serde(rename = "teacherId")]
    pub teacher_id: String,
    #[serde(rename = "studentId")]
    pub student_id: String,
    pub title: String,
    #[serde(rename = "questionIds")]
    pub question_ids: Vec<String>,
}

/// Whole ordered answer sheet for one assignment, one option per question.
#[derive(Debug, Deserialize)]
pub struct SubmitAnswersIn {
    #[serde(rename = "studentId")]
    pub student_id: String,
    pub answers: Vec<String>,
}

#[derive(Serialize)]
pub struct ScoreOut {
    pub score: u8,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub code: &'static str,
    pub message: String,
}
