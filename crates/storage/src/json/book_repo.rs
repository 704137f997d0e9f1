use async_trait::async_trait;
use quiz_core::model::BookStatus;

use crate::repository::{BookStatusRepository, StorageError};

use super::{JsonFileRepository, STORE_FILE};

#[async_trait]
impl BookStatusRepository for JsonFileRepository {
    async fn load_statuses(&self) -> Result<Option<Vec<BookStatus>>, StorageError> {
        self.read_document(STORE_FILE).await
    }

    async fn save_statuses(&self, statuses: &[BookStatus]) -> Result<(), StorageError> {
        self.write_document(STORE_FILE, statuses).await
    }
}
