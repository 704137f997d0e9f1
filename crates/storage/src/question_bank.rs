//! Loading the read-only question bank.

use std::path::Path;

use quiz_core::model::QuestionBank;

use crate::repository::StorageError;

/// Read and validate a question bank from a JSON file.
///
/// # Errors
///
/// Returns `StorageError::Io` if the file cannot be read and
/// `StorageError::Serialization` if it is not a valid bank.
pub async fn load_question_bank(path: impl AsRef<Path>) -> Result<QuestionBank, StorageError> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| StorageError::Io(format!("{}: {err}", path.display())))?;
    parse_question_bank(&json)
}

/// Validate a question bank already held in memory, e.g. one compiled into the binary.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the text is not a valid bank.
pub fn parse_question_bank(json: &str) -> Result<QuestionBank, StorageError> {
    let bank = QuestionBank::from_json(json)
        .map_err(|err| StorageError::Serialization(err.to_string()))?;
    tracing::debug!(questions = bank.len(), "loaded question bank");
    Ok(bank)
}
