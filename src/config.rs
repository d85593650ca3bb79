//! Loading the roster configuration (question bank + users) from TOML.
//!
//! See `RosterConfig` for the expected schema. Entries that violate the
//! document invariants are skipped with an error log rather than aborting
//! startup; the built-in seeds still guarantee a usable app.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{Question, Role, User};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct RosterConfig {
  #[serde(default)]
  pub questions: Vec<QuestionCfg>,
  #[serde(default)]
  pub users: Vec<UserCfg>,
}

/// Question entry accepted in TOML configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct QuestionCfg {
  pub id: String,
  pub topic: String,
  pub content: String,
  pub options: Vec<String>,
  pub answer: String,
}

/// User entry accepted in TOML configuration.
/// Students must name their owning teacher via `teacher_id`.
#[derive(Clone, Debug, Deserialize)]
pub struct UserCfg {
  pub id: String,
  pub name: String,
  pub role: Role,
  #[serde(default)]
  pub teacher_id: Option<String>,
}

impl RosterConfig {
  /// Validate config questions into domain documents, skipping bad entries.
  pub fn valid_questions(&self) -> Vec<Question> {
    let mut out = Vec::new();
    for qc in &self.questions {
      let q = Question {
        id: qc.id.clone(),
        topic: qc.topic.clone(),
        content: qc.content.clone(),
        options: qc.options.clone(),
        answer: qc.answer.clone(),
      };
      if !q.is_well_formed() {
        error!(target: "mentora_backend", id = %qc.id, "Skipping bank question: empty options or answer not among options.");
        continue;
      }
      out.push(q);
    }
    out
  }

  /// Validate config users, skipping students with no owning teacher.
  pub fn valid_users(&self) -> Vec<User> {
    let mut out = Vec::new();
    for uc in &self.users {
      if uc.id.trim().is_empty() {
        error!(target: "mentora_backend", "Skipping roster user with empty id.");
        continue;
      }
      if uc.role == Role::Student && uc.teacher_id.is_none() {
        error!(target: "mentora_backend", id = %uc.id, "Skipping student with no teacher_id.");
        continue;
      }
      out.push(User {
        id: uc.id.clone(),
        name: uc.name.clone(),
        role: uc.role,
        teacher_id: if uc.role == Role::Student { uc.teacher_id.clone() } else { None },
      });
    }
    out
  }
}

/// Attempt to load `RosterConfig` from ROSTER_CONFIG_PATH.
/// On any parsing/IO error, returns None.
pub fn load_roster_config_from_env() -> Option<RosterConfig> {
  let path = std::env::var("ROSTER_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<RosterConfig>(&s) {
      Ok(cfg) => {
        info!(target: "mentora_backend", %path, "Loaded roster config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "mentora_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "mentora_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn malformed_entries_are_skipped() {
    let cfg: RosterConfig = toml::from_str(
      r#"
      [[questions]]
      id = "ok"
      topic = "algebra"
      content = "1 + 1 = ?"
      options = ["1", "2"]
      answer = "2"

      [[questions]]
      id = "bad"
      topic = "algebra"
      content = "answer is not offered"
      options = ["1", "2"]
      answer = "3"

      [[users]]
      id = "t1"
      name = "Dana"
      role = "teacher"

      [[users]]
      id = "orphan"
      name = "No Teacher"
      role = "student"
      "#,
    )
    .expect("toml");

    let questions = cfg.valid_questions();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].id, "ok");

    let users = cfg.valid_users();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, "t1");
  }
}
