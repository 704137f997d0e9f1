use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast::error::RecvError};
use tokio::task::JoinHandle;

use quiz_core::model::{
    BookCatalog, BookId, BookStatus, Product, ProductId, PurchaseOutcome, Verification,
};
use storage::repository::BookStatusRepository;

use crate::purchases::PurchaseBackend;

/// How a purchase attempt for a book ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseResult {
    /// Verified; the book is now enabled.
    Unlocked(BookId),
    /// The book is already owned.
    NotLocked,
    /// The book does not exist or is not for sale.
    UnknownBook,
    Unverified,
    Cancelled,
    Pending,
    /// The backend could not complete the request.
    Failed,
}

#[derive(Debug)]
struct StoreState {
    books: Vec<BookStatus>,
    products: Vec<Product>,
    purchased: BTreeSet<ProductId>,
}

/// Book availability plus the purchases that unlock it.
///
/// Cloning is cheap and every clone shares state, so the update listener and
/// the foreground see the same list. Mutations are serialised by an async
/// mutex and each one rewrites the persisted status list. Storage and backend
/// failures are logged and never surface to callers.
#[derive(Clone)]
pub struct EntitlementStore {
    state: Arc<Mutex<StoreState>>,
    catalog: Arc<BookCatalog>,
    repo: Arc<dyn BookStatusRepository>,
    backend: Arc<dyn PurchaseBackend>,
}

impl EntitlementStore {
    /// Load saved statuses, falling back to the catalogue defaults on first
    /// run, on read failure, or when the saved list has the wrong length.
    pub async fn load(
        catalog: BookCatalog,
        repo: Arc<dyn BookStatusRepository>,
        backend: Arc<dyn PurchaseBackend>,
    ) -> Self {
        let books = match repo.load_statuses().await {
            Ok(Some(saved)) if saved.len() == catalog.book_count() => saved,
            Ok(Some(saved)) => {
                tracing::warn!(
                    saved = saved.len(),
                    expected = catalog.book_count(),
                    "saved book list has wrong length, using defaults"
                );
                catalog.default_statuses()
            }
            Ok(None) => catalog.default_statuses(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to load book statuses, using defaults");
                catalog.default_statuses()
            }
        };

        Self {
            state: Arc::new(Mutex::new(StoreState {
                books,
                products: Vec::new(),
                purchased: BTreeSet::new(),
            })),
            catalog: Arc::new(catalog),
            repo,
            backend,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &BookCatalog {
        &self.catalog
    }

    pub async fn statuses(&self) -> Vec<BookStatus> {
        self.state.lock().await.books.clone()
    }

    pub async fn status(&self, book: BookId) -> Option<BookStatus> {
        let index = book.index()?;
        self.state.lock().await.books.get(index).copied()
    }

    /// Books currently included in play, in order.
    pub async fn enabled_books(&self) -> Vec<BookId> {
        self.state
            .lock()
            .await
            .books
            .iter()
            .enumerate()
            .filter(|(_, status)| status.is_enabled())
            .map(|(i, _)| BookId::from_index(i))
            .collect()
    }

    /// Whether at least one book is enabled, i.e. a game can start.
    pub async fn questions_available(&self) -> bool {
        self.state
            .lock()
            .await
            .books
            .iter()
            .any(|status| status.is_enabled())
    }

    pub async fn purchased_ids(&self) -> BTreeSet<ProductId> {
        self.state.lock().await.purchased.clone()
    }

    pub async fn products(&self) -> Vec<Product> {
        self.state.lock().await.products.clone()
    }

    /// Catalogue entry for a book, once products have been loaded.
    pub async fn product_for_book(&self, book: BookId) -> Option<Product> {
        let id = self.catalog.product_id(book)?;
        self.state
            .lock()
            .await
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    /// Fetch display details for every purchasable book.
    pub async fn load_products(&self) {
        match self.backend.products(&self.catalog.product_ids()).await {
            Ok(products) => {
                tracing::debug!(count = products.len(), "loaded products");
                self.state.lock().await.products = products;
            }
            Err(err) => tracing::warn!(error = %err, "failed to fetch products"),
        }
    }

    /// Flip a book between enabled and disabled.
    ///
    /// Locked or unknown books are left alone. Returns the resulting status.
    pub async fn toggle(&self, book: BookId) -> Option<BookStatus> {
        let index = book.index()?;
        let mut state = self.state.lock().await;
        let current = *state.books.get(index)?;
        if current.is_locked() {
            return Some(current);
        }
        let next = current.toggled();
        state.books[index] = next;
        self.persist(&state.books).await;
        Some(next)
    }

    /// Buy the product that unlocks `book`.
    pub async fn purchase(&self, book: BookId) -> PurchaseResult {
        match self.status(book).await {
            None => return PurchaseResult::UnknownBook,
            Some(status) if !status.is_locked() => return PurchaseResult::NotLocked,
            Some(_) => {}
        }
        let Some(product) = self.catalog.product_id(book) else {
            return PurchaseResult::UnknownBook;
        };

        let outcome = match self.backend.purchase(&product).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(%product, error = %err, "purchase failed");
                return PurchaseResult::Failed;
            }
        };

        match outcome {
            PurchaseOutcome::Success(Verification::Verified(transaction)) => {
                match self.unlock(&transaction.product_id).await {
                    Some(unlocked) => PurchaseResult::Unlocked(unlocked),
                    None => PurchaseResult::UnknownBook,
                }
            }
            PurchaseOutcome::Success(Verification::Unverified { reason, .. }) => {
                tracing::warn!(%product, %reason, "purchase could not be verified");
                PurchaseResult::Unverified
            }
            PurchaseOutcome::UserCancelled => PurchaseResult::Cancelled,
            PurchaseOutcome::Pending => {
                tracing::info!(%product, "purchase pending approval");
                PurchaseResult::Pending
            }
        }
    }

    /// Re-check every purchasable product against the backend.
    ///
    /// Verified live entitlements unlock their book; revoked ones lock it
    /// again. Products with no or unverified entitlement are left as they are.
    pub async fn restore_purchases(&self) {
        for product in self.catalog.product_ids() {
            match self.backend.current_entitlement(&product).await {
                Ok(Some(Verification::Verified(transaction))) => {
                    if transaction.is_revoked() {
                        self.lock(&transaction.product_id).await;
                    } else {
                        self.unlock(&transaction.product_id).await;
                    }
                }
                Ok(Some(Verification::Unverified { reason, .. })) => {
                    tracing::warn!(%product, %reason, "ignoring unverified entitlement");
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(%product, error = %err, "failed to query entitlement");
                }
            }
        }
    }

    /// Spawn the background task that reconciles after each pushed update.
    ///
    /// The task holds a store clone, which keeps the backend alive; callers
    /// own the handle and must abort it to stop listening.
    pub fn watch_for_updates(&self) -> JoinHandle<()> {
        let mut updates = self.backend.subscribe_updates();
        let store = self.clone();
        tokio::spawn(async move {
            loop {
                match updates.recv().await {
                    Ok(update) => {
                        tracing::debug!(product = %update.product_id, "transaction update");
                        store.restore_purchases().await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "missed transaction updates, reconciling");
                        store.restore_purchases().await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    async fn unlock(&self, product: &ProductId) -> Option<BookId> {
        let book = self.catalog.book_for_product(product)?;
        let index = book.index()?;
        let mut state = self.state.lock().await;
        state.purchased.insert(product.clone());
        if state.books.get(index).is_some_and(|s| s.is_locked()) {
            state.books[index] = BookStatus::Enabled;
            tracing::info!(%product, %book, "book unlocked");
            self.persist(&state.books).await;
        }
        Some(book)
    }

    async fn lock(&self, product: &ProductId) -> Option<BookId> {
        let book = self.catalog.book_for_product(product)?;
        let index = book.index()?;
        let mut state = self.state.lock().await;
        state.purchased.remove(product);
        if state.books.get(index).is_some_and(|s| !s.is_locked()) {
            state.books[index] = BookStatus::Locked;
            tracing::info!(%product, %book, "book locked after revocation");
            self.persist(&state.books).await;
        }
        Some(book)
    }

    async fn persist(&self, books: &[BookStatus]) {
        if let Err(err) = self.repo.save_statuses(books).await {
            tracing::warn!(error = %err, "failed to save book statuses");
        }
    }
}
