use async_trait::async_trait;
use quiz_core::model::{BookStatus, RecentScores};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Persistence for the per-book status list.
#[async_trait]
pub trait BookStatusRepository: Send + Sync {
    /// Load the saved status list.
    ///
    /// Returns `Ok(None)` when nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the saved list exists but cannot be read.
    async fn load_statuses(&self) -> Result<Option<Vec<BookStatus>>, StorageError>;

    /// Replace the saved status list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the list cannot be written.
    async fn save_statuses(&self, statuses: &[BookStatus]) -> Result<(), StorageError>;
}

/// Persistence for the recent score history.
#[async_trait]
pub trait ScoreRepository: Send + Sync {
    /// Load the saved history.
    ///
    /// Returns `Ok(None)` when nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the saved history exists but cannot be read.
    async fn load_scores(&self) -> Result<Option<RecentScores>, StorageError>;

    /// Replace the saved history.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the history cannot be written.
    async fn save_scores(&self, scores: &RecentScores) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    statuses: Arc<Mutex<Option<Vec<BookStatus>>>>,
    scores: Arc<Mutex<Option<RecentScores>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStatusRepository for InMemoryRepository {
    async fn load_statuses(&self) -> Result<Option<Vec<BookStatus>>, StorageError> {
        let guard = self
            .statuses
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save_statuses(&self, statuses: &[BookStatus]) -> Result<(), StorageError> {
        let mut guard = self
            .statuses
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        *guard = Some(statuses.to_vec());
        Ok(())
    }
}

#[async_trait]
impl ScoreRepository for InMemoryRepository {
    async fn load_scores(&self) -> Result<Option<RecentScores>, StorageError> {
        let guard = self
            .scores
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(*guard)
    }

    async fn save_scores(&self, scores: &RecentScores) -> Result<(), StorageError> {
        let mut guard = self
            .scores
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        *guard = Some(*scores);
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub books: Arc<dyn BookStatusRepository>,
    pub scores: Arc<dyn ScoreRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let books: Arc<dyn BookStatusRepository> = Arc::new(repo.clone());
        let scores: Arc<dyn ScoreRepository> = Arc::new(repo);
        Self { books, scores }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_starts_empty_and_round_trips() {
        let storage = Storage::in_memory();
        assert!(storage.books.load_statuses().await.unwrap().is_none());
        assert!(storage.scores.load_scores().await.unwrap().is_none());

        storage
            .books
            .save_statuses(&[BookStatus::Locked, BookStatus::Enabled])
            .await
            .unwrap();
        storage
            .scores
            .save_scores(&RecentScores::new([3, 2, 1]))
            .await
            .unwrap();

        assert_eq!(
            storage.books.load_statuses().await.unwrap(),
            Some(vec![BookStatus::Locked, BookStatus::Enabled])
        );
        assert_eq!(
            storage.scores.load_scores().await.unwrap(),
            Some(RecentScores::new([3, 2, 1]))
        );
    }
}
