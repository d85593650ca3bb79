//! Assignment composer: pure helpers a teacher uses to build a new
//! assignment from the question bank.
//!
//! Everything here is side-effect free. The caller resolves ids against the
//! current bank snapshot, builds a selection incrementally, and finally
//! `compose`s a draft which the store persists as a whole document.

use crate::domain::{AssignmentDraft, Question};
use crate::error::ValidationError;

/// Topic filter sentinel that matches every bank entry.
pub const TOPIC_ALL: &str = "all";

/// Ordered subsequence of `bank` whose topic matches `topic` (or all of it
/// for [`TOPIC_ALL`]), excluding entries already picked into `selected`.
pub fn filter_by_topic<'a>(
  bank: &'a [Question],
  topic: &str,
  selected: &[Question],
) -> Vec<&'a Question> {
  bank
    .iter()
    .filter(|q| !selected.iter().any(|s| s.id == q.id))
    .filter(|q| topic == TOPIC_ALL || q.topic == topic)
    .collect()
}

/// Sorted, deduplicated topic tags of the bank (for filter dropdowns).
pub fn topics(bank: &[Question]) -> Vec<String> {
  let mut out: Vec<String> = bank.iter().map(|q| q.topic.clone()).collect();
  out.sort();
  out.dedup();
  out
}

/// Append `q` to the selection unless its id is already present.
/// Idempotent under duplicate calls with the same question.
pub fn add_question(mut selection: Vec<Question>, q: Question) -> Vec<Question> {
  if !selection.iter().any(|s| s.id == q.id) {
    selection.push(q);
  }
  selection
}

/// Remove the question with `id` from the selection, if present.
/// Selection editing happens client-side; the server only sees the final
/// list, so nothing in the routes calls this yet.
#[allow(dead_code)]
pub fn remove_question(mut selection: Vec<Question>, id: &str) -> Vec<Question> {
  selection.retain(|q| q.id != id);
  selection
}

/// Resolve a list of question ids against a bank snapshot into a selection,
/// deduplicating while preserving first-occurrence order.
pub fn resolve_selection(
  bank: &[Question],
  ids: &[String],
) -> Result<Vec<Question>, ValidationError> {
  let mut selection = Vec::new();
  for id in ids {
    let q = bank
      .iter()
      .find(|q| &q.id == id)
      .ok_or_else(|| ValidationError::UnknownQuestion(id.clone()))?;
    selection = add_question(selection, q.clone());
  }
  Ok(selection)
}

/// Validate and freeze a selection into a draft.
///
/// Fails when the trimmed title is empty or nothing was selected; on success
/// the draft preserves the selection order in `question_ids`.
pub fn compose(title: &str, selected: &[Question]) -> Result<AssignmentDraft, ValidationError> {
  let title = title.trim();
  if title.is_empty() {
    return Err(ValidationError::EmptyTitle);
  }
  if selected.is_empty() {
    return Err(ValidationError::EmptySelection);
  }
  Ok(AssignmentDraft {
    title: title.to_string(),
    question_ids: selected.iter().map(|q| q.id.clone()).collect(),
  })
}
