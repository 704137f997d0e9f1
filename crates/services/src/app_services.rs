use std::sync::Arc;

use tokio::task::JoinHandle;

use quiz_core::model::{BookCatalog, QuestionBank};
use storage::repository::Storage;

use crate::entitlements::EntitlementStore;
use crate::purchases::PurchaseBackend;
use crate::session::QuizSession;

/// Assembles the quiz session and the entitlement store over one storage backend.
///
/// Owns the purchase update listener; dropping the services stops it.
pub struct AppServices {
    session: QuizSession,
    store: EntitlementStore,
    updates: JoinHandle<()>,
}

impl AppServices {
    /// Load persisted state, start listening for purchase updates, and
    /// reconcile entitlements once.
    pub async fn new(
        storage: Storage,
        bank: Arc<QuestionBank>,
        catalog: BookCatalog,
        backend: Arc<dyn PurchaseBackend>,
    ) -> Self {
        let store = EntitlementStore::load(catalog, Arc::clone(&storage.books), backend).await;
        let updates = store.watch_for_updates();
        store.restore_purchases().await;
        store.load_products().await;

        let session = QuizSession::load(bank, Arc::clone(&storage.scores)).await;

        Self {
            session,
            store,
            updates,
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.session.reseed(seed);
        self
    }

    #[must_use]
    pub fn store(&self) -> &EntitlementStore {
        &self.store
    }

    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut QuizSession {
        &mut self.session
    }

    /// Point the session at the enabled books and start a game.
    ///
    /// Returns false when no book is enabled or the enabled books have no
    /// questions.
    pub async fn start_game(&mut self) -> bool {
        let books = self.store.enabled_books().await;
        if books.is_empty() {
            return false;
        }
        self.session.filter_to_books(&books);
        self.session.start_game().is_some()
    }

    /// Stop the update listener.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for AppServices {
    fn drop(&mut self) {
        self.updates.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use quiz_core::model::{BookId, BookStatus, ProductId};
    use storage::InMemoryRepository;
    use storage::repository::BookStatusRepository;

    use crate::purchases::LocalPurchaseBackend;

    const BANK: &str = r#"[
        {"id": 1, "book": 1, "question": "Owl?", "hint": "", "answers": {"Hedwig": true, "Errol": false}}
    ]"#;

    #[tokio::test]
    async fn dropping_services_stops_the_update_listener() {
        let catalog = BookCatalog::standard();
        let backend = LocalPurchaseBackend::for_catalog(&catalog);
        let repo = InMemoryRepository::new();
        let storage = Storage {
            books: Arc::new(repo.clone()),
            scores: Arc::new(repo.clone()),
        };
        let bank = Arc::new(QuestionBank::from_json(BANK).unwrap());
        let services = AppServices::new(storage, bank, catalog, Arc::new(backend.clone())).await;
        let store = services.store().clone();

        drop(services);
        backend.grant(&ProductId::new("hp4")).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.status(BookId::new(4)).await, Some(BookStatus::Locked));
        assert!(repo.load_statuses().await.unwrap().is_none());
    }
}
