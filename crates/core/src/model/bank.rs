use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{BookId, QuestionId};
use crate::model::question::{Question, QuestionError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionBankError {
    #[error("question bank is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    InvalidQuestion(#[from] QuestionError),

    #[error("duplicate question id {0}")]
    DuplicateId(QuestionId),
}

/// Immutable set of all questions loaded at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Build a bank from already constructed questions.
    ///
    /// # Errors
    ///
    /// Returns `QuestionBankError` if any question is invalid or an id repeats.
    pub fn new(questions: Vec<Question>) -> Result<Self, QuestionBankError> {
        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            question.validate()?;
            if !seen.insert(question.id()) {
                return Err(QuestionBankError::DuplicateId(question.id()));
            }
        }
        Ok(Self { questions })
    }

    /// Parse a JSON array of questions.
    ///
    /// # Errors
    ///
    /// Returns `QuestionBankError` on malformed JSON or invalid questions.
    pub fn from_json(json: &str) -> Result<Self, QuestionBankError> {
        let questions: Vec<Question> = serde_json::from_str(json)?;
        Self::new(questions)
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn get(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    /// Questions belonging to any of the given books, in bank order.
    pub fn in_books<'a>(&'a self, books: &'a [BookId]) -> impl Iterator<Item = &'a Question> {
        self.questions.iter().filter(|q| books.contains(&q.book()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"id": 1, "book": 1, "question": "Q1", "hint": "", "answers": {"a": true, "b": false}},
        {"id": 2, "book": 2, "question": "Q2", "hint": "", "answers": {"a": false, "b": true}},
        {"id": 3, "book": 2, "question": "Q3", "hint": "", "answers": {"a": true, "c": false}}
    ]"#;

    #[test]
    fn parses_and_filters_by_book() {
        let bank = QuestionBank::from_json(SAMPLE).unwrap();
        assert_eq!(bank.len(), 3);
        let ids: Vec<_> = bank.in_books(&[BookId::new(2)]).map(Question::id).collect();
        assert_eq!(ids, vec![QuestionId::new(2), QuestionId::new(3)]);
        assert_eq!(bank.in_books(&[]).count(), 0);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let json = r#"[
            {"id": 1, "book": 1, "question": "Q1", "answers": {"a": true, "b": false}},
            {"id": 1, "book": 2, "question": "Q2", "answers": {"a": true, "b": false}}
        ]"#;
        let err = QuestionBank::from_json(json).unwrap_err();
        assert!(matches!(err, QuestionBankError::DuplicateId(id) if id == QuestionId::new(1)));
    }

    #[test]
    fn rejects_question_without_correct_answer() {
        let json = r#"[{"id": 5, "book": 1, "question": "Q", "answers": {"a": false, "b": false}}]"#;
        let err = QuestionBank::from_json(json).unwrap_err();
        assert!(matches!(err, QuestionBankError::InvalidQuestion(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            QuestionBank::from_json("{not json"),
            Err(QuestionBankError::Parse(_))
        ));
    }
}
