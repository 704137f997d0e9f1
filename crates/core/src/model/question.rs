use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::ids::{BookId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {0} has an empty prompt")]
    EmptyPrompt(QuestionId),

    #[error("question {0} needs at least two answers")]
    TooFewAnswers(QuestionId),

    #[error("question {id} must have exactly one correct answer, found {found}")]
    CorrectAnswerCount { id: QuestionId, found: usize },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice trivia question as stored in the question bank.
///
/// `answers` maps answer text to its correctness flag. Exactly one entry is
/// `true` once the question has passed [`Question::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    book: BookId,
    #[serde(rename = "question")]
    prompt: String,
    #[serde(default)]
    hint: String,
    answers: BTreeMap<String, bool>,
}

impl Question {
    /// Build and validate a question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt is blank or the answers do not
    /// contain exactly one correct entry.
    pub fn new(
        id: QuestionId,
        book: BookId,
        prompt: impl Into<String>,
        hint: impl Into<String>,
        answers: impl IntoIterator<Item = (String, bool)>,
    ) -> Result<Self, QuestionError> {
        let question = Self {
            id,
            book,
            prompt: prompt.into(),
            hint: hint.into(),
            answers: answers.into_iter().collect(),
        };
        question.validate()?;
        Ok(question)
    }

    /// Check the invariants a deserialized question must satisfy.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` describing the first violated invariant.
    pub fn validate(&self) -> Result<(), QuestionError> {
        if self.prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt(self.id));
        }
        if self.answers.len() < 2 {
            return Err(QuestionError::TooFewAnswers(self.id));
        }
        let found = self.answers.values().filter(|correct| **correct).count();
        if found != 1 {
            return Err(QuestionError::CorrectAnswerCount { id: self.id, found });
        }
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn book(&self) -> BookId {
        self.book
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn hint(&self) -> &str {
        &self.hint
    }

    /// Answer texts in stable (sorted) order.
    pub fn answer_texts(&self) -> impl Iterator<Item = &str> {
        self.answers.keys().map(String::as_str)
    }

    /// The single correct answer text.
    #[must_use]
    pub fn correct_answer(&self) -> Option<&str> {
        self.answers
            .iter()
            .find(|(_, correct)| **correct)
            .map(|(text, _)| text.as_str())
    }

    #[must_use]
    pub fn is_correct(&self, answer: &str) -> bool {
        self.answers.get(answer).copied().unwrap_or(false)
    }
}
