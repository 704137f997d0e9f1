use async_trait::async_trait;
use quiz_core::model::RecentScores;

use crate::repository::{ScoreRepository, StorageError};

use super::{JsonFileRepository, SCORES_FILE};

#[async_trait]
impl ScoreRepository for JsonFileRepository {
    async fn load_scores(&self) -> Result<Option<RecentScores>, StorageError> {
        self.read_document(SCORES_FILE).await
    }

    async fn save_scores(&self, scores: &RecentScores) -> Result<(), StorageError> {
        self.write_document(SCORES_FILE, scores).await
    }
}
