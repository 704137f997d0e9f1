use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::broadcast;

use quiz_core::Clock;
use quiz_core::model::{
    BookCatalog, Product, ProductId, PurchaseOutcome, Transaction, TransactionUpdate,
    Verification,
};

use super::PurchaseBackend;
use crate::error::PurchaseError;

const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// Result the next `purchase` call should produce.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScriptedOutcome {
    /// Record a verified transaction.
    #[default]
    Approve,
    /// Report a transaction that fails verification.
    Unverified(String),
    Cancel,
    /// Defer approval, e.g. waiting on a guardian; complete later with `grant`.
    Defer,
}

#[derive(Default)]
struct LocalState {
    catalog: BTreeMap<ProductId, Product>,
    transactions: HashMap<ProductId, Transaction>,
    /// Entitlements that fail verification, with the reason reported.
    unverified: HashMap<ProductId, String>,
    next_outcome: ScriptedOutcome,
    offline: bool,
}

/// In-process store backend for offline play and tests.
///
/// Purchases are approved according to the scripted outcome; `grant` and
/// `revoke` simulate changes made outside the app and push a
/// `TransactionUpdate` to subscribers.
#[derive(Clone)]
pub struct LocalPurchaseBackend {
    state: Arc<Mutex<LocalState>>,
    updates: broadcast::Sender<TransactionUpdate>,
    clock: Clock,
}

impl LocalPurchaseBackend {
    #[must_use]
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let catalog = products.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            state: Arc::new(Mutex::new(LocalState {
                catalog,
                ..LocalState::default()
            })),
            updates,
            clock: Clock::default(),
        }
    }

    /// One product per purchasable book in `catalog`.
    #[must_use]
    pub fn for_catalog(catalog: &BookCatalog) -> Self {
        Self::new(catalog.product_ids().into_iter().map(|id| {
            let display_name = match catalog.book_for_product(&id) {
                Some(book) => format!("Book {book}"),
                None => id.to_string(),
            };
            Product {
                id,
                display_name,
                display_price: "$3.99".to_owned(),
            }
        }))
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Set the result of the next `purchase` call. Later calls approve again.
    pub fn script_next(&self, outcome: ScriptedOutcome) {
        match self.state() {
            Ok(mut state) => state.next_outcome = outcome,
            Err(err) => tracing::warn!(error = %err, "failed to script purchase outcome"),
        }
    }

    /// Make every backend call fail until switched back.
    pub fn set_offline(&self, offline: bool) {
        match self.state() {
            Ok(mut state) => state.offline = offline,
            Err(err) => tracing::warn!(error = %err, offline, "failed to switch offline mode"),
        }
    }

    /// Record a verified purchase made elsewhere and notify subscribers.
    ///
    /// # Errors
    ///
    /// Returns `PurchaseError::UnknownProduct` if the product is not in the catalogue.
    pub fn grant(&self, product: &ProductId) -> Result<(), PurchaseError> {
        {
            let mut state = self.state()?;
            if !state.catalog.contains_key(product) {
                return Err(PurchaseError::UnknownProduct(product.clone()));
            }
            let transaction = self.transaction(product);
            state.transactions.insert(product.clone(), transaction);
            state.unverified.remove(product);
        }
        self.notify(product);
        Ok(())
    }

    /// Record a purchase made elsewhere whose entitlement fails verification,
    /// and notify subscribers. A later `grant` replaces it.
    ///
    /// # Errors
    ///
    /// Returns `PurchaseError::UnknownProduct` if the product is not in the catalogue.
    pub fn grant_unverified(
        &self,
        product: &ProductId,
        reason: impl Into<String>,
    ) -> Result<(), PurchaseError> {
        {
            let mut state = self.state()?;
            if !state.catalog.contains_key(product) {
                return Err(PurchaseError::UnknownProduct(product.clone()));
            }
            let transaction = self.transaction(product);
            state.transactions.insert(product.clone(), transaction);
            state.unverified.insert(product.clone(), reason.into());
        }
        self.notify(product);
        Ok(())
    }

    /// Mark an existing purchase as refunded and notify subscribers.
    ///
    /// # Errors
    ///
    /// Returns `PurchaseError::UnknownProduct` if there is no transaction to revoke.
    pub fn revoke(&self, product: &ProductId) -> Result<(), PurchaseError> {
        {
            let mut state = self.state()?;
            let now = self.clock.now();
            let Some(transaction) = state.transactions.get_mut(product) else {
                return Err(PurchaseError::UnknownProduct(product.clone()));
            };
            transaction.revoked_at = Some(now);
        }
        self.notify(product);
        Ok(())
    }

    fn transaction(&self, product: &ProductId) -> Transaction {
        Transaction {
            product_id: product.clone(),
            purchased_at: self.clock.now(),
            revoked_at: None,
        }
    }

    fn notify(&self, product: &ProductId) {
        // No receivers is fine: nobody is listening yet.
        let _ = self.updates.send(TransactionUpdate {
            product_id: product.clone(),
        });
    }

    fn state(&self) -> Result<MutexGuard<'_, LocalState>, PurchaseError> {
        self.state
            .lock()
            .map_err(|e| PurchaseError::Unavailable(e.to_string()))
    }

    fn online_state(&self) -> Result<MutexGuard<'_, LocalState>, PurchaseError> {
        let state = self.state()?;
        if state.offline {
            return Err(PurchaseError::Unavailable("offline".to_owned()));
        }
        Ok(state)
    }
}

#[async_trait]
impl PurchaseBackend for LocalPurchaseBackend {
    async fn products(&self, ids: &[ProductId]) -> Result<Vec<Product>, PurchaseError> {
        let state = self.online_state()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.catalog.get(id).cloned())
            .collect())
    }

    async fn purchase(&self, product: &ProductId) -> Result<PurchaseOutcome, PurchaseError> {
        let mut state = self.online_state()?;
        if !state.catalog.contains_key(product) {
            return Err(PurchaseError::UnknownProduct(product.clone()));
        }
        let outcome = std::mem::take(&mut state.next_outcome);
        let result = match outcome {
            ScriptedOutcome::Approve => {
                let transaction = self.transaction(product);
                state
                    .transactions
                    .insert(product.clone(), transaction.clone());
                PurchaseOutcome::Success(Verification::Verified(transaction))
            }
            ScriptedOutcome::Unverified(reason) => {
                PurchaseOutcome::Success(Verification::Unverified {
                    value: self.transaction(product),
                    reason,
                })
            }
            ScriptedOutcome::Cancel => PurchaseOutcome::UserCancelled,
            ScriptedOutcome::Defer => PurchaseOutcome::Pending,
        };
        Ok(result)
    }

    async fn current_entitlement(
        &self,
        product: &ProductId,
    ) -> Result<Option<Verification<Transaction>>, PurchaseError> {
        let state = self.online_state()?;
        let Some(transaction) = state.transactions.get(product).cloned() else {
            return Ok(None);
        };
        Ok(Some(match state.unverified.get(product) {
            Some(reason) => Verification::Unverified {
                value: transaction,
                reason: reason.clone(),
            },
            None => Verification::Verified(transaction),
        }))
    }

    fn subscribe_updates(&self) -> broadcast::Receiver<TransactionUpdate> {
        self.updates.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_now;

    fn backend() -> LocalPurchaseBackend {
        LocalPurchaseBackend::for_catalog(&BookCatalog::standard())
            .with_clock(Clock::fixed(fixed_now()))
    }

    #[tokio::test]
    async fn lists_only_known_products() {
        let backend = backend();
        let products = backend
            .products(&[ProductId::new("hp4"), ProductId::new("nope")])
            .await
            .unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].display_name, "Book 4");
    }

    #[tokio::test]
    async fn approved_purchase_becomes_entitlement() {
        let backend = backend();
        let product = ProductId::new("hp5");
        let outcome = backend.purchase(&product).await.unwrap();
        assert!(matches!(
            outcome,
            PurchaseOutcome::Success(Verification::Verified(_))
        ));

        let entitlement = backend.current_entitlement(&product).await.unwrap();
        let tx = entitlement.and_then(Verification::verified).unwrap();
        assert_eq!(tx.purchased_at, fixed_now());
        assert!(!tx.is_revoked());
    }

    #[tokio::test]
    async fn scripted_outcome_applies_once() {
        let backend = backend();
        let product = ProductId::new("hp6");
        backend.script_next(ScriptedOutcome::Cancel);
        assert_eq!(
            backend.purchase(&product).await.unwrap(),
            PurchaseOutcome::UserCancelled
        );
        assert!(backend.current_entitlement(&product).await.unwrap().is_none());
        assert!(matches!(
            backend.purchase(&product).await.unwrap(),
            PurchaseOutcome::Success(Verification::Verified(_))
        ));
    }

    #[tokio::test]
    async fn revoke_pushes_update() {
        let backend = backend();
        let product = ProductId::new("hp7");
        let mut updates = backend.subscribe_updates();

        backend.grant(&product).unwrap();
        backend.revoke(&product).unwrap();

        assert_eq!(updates.recv().await.unwrap().product_id, product);
        assert_eq!(updates.recv().await.unwrap().product_id, product);
        let tx = backend
            .current_entitlement(&product)
            .await
            .unwrap()
            .and_then(Verification::verified)
            .unwrap();
        assert!(tx.is_revoked());
    }

    #[tokio::test]
    async fn unverified_grant_reports_reason_until_regranted() {
        let backend = backend();
        let product = ProductId::new("hp4");
        let mut updates = backend.subscribe_updates();

        backend.grant_unverified(&product, "receipt mismatch").unwrap();
        assert_eq!(updates.recv().await.unwrap().product_id, product);
        match backend.current_entitlement(&product).await.unwrap() {
            Some(Verification::Unverified { value, reason }) => {
                assert_eq!(value.product_id, product);
                assert_eq!(reason, "receipt mismatch");
            }
            other => panic!("expected unverified entitlement, got {other:?}"),
        }

        backend.grant(&product).unwrap();
        assert!(matches!(
            backend.current_entitlement(&product).await.unwrap(),
            Some(Verification::Verified(_))
        ));
        assert!(matches!(
            backend.grant_unverified(&ProductId::new("nope"), "x"),
            Err(PurchaseError::UnknownProduct(_))
        ));
    }

    #[tokio::test]
    async fn offline_backend_errors() {
        let backend = backend();
        backend.set_offline(true);
        assert!(matches!(
            backend.purchase(&ProductId::new("hp4")).await,
            Err(PurchaseError::Unavailable(_))
        ));
        assert!(backend.revoke(&ProductId::new("hp4")).is_err());
    }
}
