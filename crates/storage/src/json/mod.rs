use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::repository::{BookStatusRepository, ScoreRepository, Storage, StorageError};

mod book_repo;
mod score_repo;

pub(crate) const STORE_FILE: &str = "store.json";
pub(crate) const SCORES_FILE: &str = "scores.json";

/// Whole-document JSON persistence in an app-private directory.
///
/// Each repository owns one file that is rewritten in full on every save.
#[derive(Clone, Debug)]
pub struct JsonFileRepository {
    dir: PathBuf,
}

impl JsonFileRepository {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Read and decode `file`; a missing file yields `Ok(None)`.
    async fn read_document<T: DeserializeOwned>(
        &self,
        file: &str,
    ) -> Result<Option<T>, StorageError> {
        let bytes = match tokio::fs::read(self.path(file)).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StorageError::Io(err.to_string())),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|err| StorageError::Serialization(err.to_string()))
    }

    async fn write_document<T: Serialize + Sync + ?Sized>(
        &self,
        file: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let bytes =
            serde_json::to_vec(value).map_err(|err| StorageError::Serialization(err.to_string()))?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| StorageError::Io(err.to_string()))?;
        tokio::fs::write(self.path(file), bytes)
            .await
            .map_err(|err| StorageError::Io(err.to_string()))?;
        tracing::debug!(file, dir = %self.dir.display(), "saved document");
        Ok(())
    }
}

impl Storage {
    /// Build a `Storage` backed by JSON files under `dir`.
    ///
    /// The directory is created on first save.
    #[must_use]
    pub fn json(dir: impl Into<PathBuf>) -> Self {
        let repo = JsonFileRepository::new(dir);
        let books: Arc<dyn BookStatusRepository> = Arc::new(repo.clone());
        let scores: Arc<dyn ScoreRepository> = Arc::new(repo);
        Self { books, scores }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<JsonFileRepository>();
    }

    #[test]
    fn documents_live_in_the_data_dir() {
        let repo = JsonFileRepository::new("/tmp/quiz");
        assert_eq!(repo.path(STORE_FILE), PathBuf::from("/tmp/quiz/store.json"));
        assert_eq!(repo.path(SCORES_FILE), PathBuf::from("/tmp/quiz/scores.json"));
    }
}
