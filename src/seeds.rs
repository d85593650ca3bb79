//! Seed data: a small built-in question bank and demo roster so the app is
//! usable without any external config.

use crate::domain::{Question, Role, User};

/// Minimal built-in bank covering two topics. Config-provided questions take
/// precedence; these only fill in ids that are absent.
pub fn seed_questions() -> Vec<Question> {
  vec![
    Question {
      id: "q-alg-1".into(),
      topic: "algebra".into(),
      content: "What is the value of x in 2x + 3 = 11?".into(),
      options: vec!["3".into(), "4".into(), "5".into(), "8".into()],
      answer: "4".into(),
    },
    Question {
      id: "q-alg-2".into(),
      topic: "algebra".into(),
      content: "Simplify: 3(a + 2) - 2a".into(),
      options: vec!["a + 6".into(), "5a + 6".into(), "a + 2".into()],
      answer: "a + 6".into(),
    },
    Question {
      id: "q-geo-1".into(),
      topic: "geometry".into(),
      content: "How many degrees do the angles of a triangle sum to?".into(),
      options: vec!["90".into(), "180".into(), "270".into(), "360".into()],
      answer: "180".into(),
    },
    Question {
      id: "q-geo-2".into(),
      topic: "geometry".into(),
      content: "A square has a side of 5. What is its area?".into(),
      options: vec!["10".into(), "20".into(), "25".into()],
      answer: "25".into(),
    },
  ]
}

/// One teacher with two students. Identity resolution is still delegated to
/// the caller; these are documents, not an auto-login.
pub fn seed_users() -> Vec<User> {
  vec![
    User {
      id: "teacher-demo".into(),
      name: "Dana Levi".into(),
      role: Role::Teacher,
      teacher_id: None,
    },
    User {
      id: "student-demo-1".into(),
      name: "Noa Peretz".into(),
      role: Role::Student,
      teacher_id: Some("teacher-demo".into()),
    },
    User {
      id: "student-demo-2".into(),
      name: "Omer Azulay".into(),
      role: Role::Student,
      teacher_id: Some("teacher-demo".into()),
    },
  ]
}
