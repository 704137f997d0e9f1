//! Seam to the platform store that sells book unlocks.

use async_trait::async_trait;
use tokio::sync::broadcast;

use quiz_core::model::{
    Product, ProductId, PurchaseOutcome, Transaction, TransactionUpdate, Verification,
};

use crate::error::PurchaseError;

mod local;

pub use local::{LocalPurchaseBackend, ScriptedOutcome};

/// Contract for the external purchase backend.
#[async_trait]
pub trait PurchaseBackend: Send + Sync {
    /// Fetch catalogue entries for the given product ids.
    ///
    /// Unknown ids are skipped rather than reported.
    ///
    /// # Errors
    ///
    /// Returns `PurchaseError` if the catalogue cannot be reached.
    async fn products(&self, ids: &[ProductId]) -> Result<Vec<Product>, PurchaseError>;

    /// Run the purchase flow for one product.
    ///
    /// # Errors
    ///
    /// Returns `PurchaseError` if the purchase could not be attempted.
    async fn purchase(&self, product: &ProductId) -> Result<PurchaseOutcome, PurchaseError>;

    /// Latest transaction that entitles the user to `product`, if any.
    ///
    /// # Errors
    ///
    /// Returns `PurchaseError` if entitlement state cannot be queried.
    async fn current_entitlement(
        &self,
        product: &ProductId,
    ) -> Result<Option<Verification<Transaction>>, PurchaseError>;

    /// Stream of transaction changes pushed by the backend.
    fn subscribe_updates(&self) -> broadcast::Receiver<TransactionUpdate>;
}
