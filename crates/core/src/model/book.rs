use serde::{Deserialize, Serialize};

use crate::model::ids::{BookId, ProductId};

/// Availability of a single book in the picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    /// Owned and included in play.
    Enabled,
    /// Owned but excluded from play.
    Disabled,
    /// Requires a purchase.
    Locked,
}

impl BookStatus {
    /// Flip between enabled and disabled; locked stays locked.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            BookStatus::Enabled => BookStatus::Disabled,
            BookStatus::Disabled => BookStatus::Enabled,
            BookStatus::Locked => BookStatus::Locked,
        }
    }

    #[must_use]
    pub fn is_enabled(self) -> bool {
        matches!(self, BookStatus::Enabled)
    }

    #[must_use]
    pub fn is_locked(self) -> bool {
        matches!(self, BookStatus::Locked)
    }
}

/// Static description of the books on offer and how they map to store products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookCatalog {
    default_statuses: Vec<BookStatus>,
    product_prefix: String,
}

impl BookCatalog {
    /// Catalogue with the given first-run statuses.
    ///
    /// Every book that starts out locked is purchasable as `{prefix}{book}`.
    #[must_use]
    pub fn new(default_statuses: Vec<BookStatus>, product_prefix: impl Into<String>) -> Self {
        Self {
            default_statuses,
            product_prefix: product_prefix.into(),
        }
    }

    /// Seven books: the first two enabled, the third disabled, the rest for sale.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(
            vec![
                BookStatus::Enabled,
                BookStatus::Enabled,
                BookStatus::Disabled,
                BookStatus::Locked,
                BookStatus::Locked,
                BookStatus::Locked,
                BookStatus::Locked,
            ],
            "hp",
        )
    }

    #[must_use]
    pub fn book_count(&self) -> usize {
        self.default_statuses.len()
    }

    #[must_use]
    pub fn default_statuses(&self) -> Vec<BookStatus> {
        self.default_statuses.clone()
    }

    /// Product ids for every purchasable book, in book order.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.purchasable_books()
            .map(|book| self.product_for_book(book))
            .collect()
    }

    /// Product id for a purchasable book.
    #[must_use]
    pub fn product_id(&self, book: BookId) -> Option<ProductId> {
        self.is_purchasable(book)
            .then(|| self.product_for_book(book))
    }

    /// Book unlocked by the given product id, if it belongs to this catalogue.
    #[must_use]
    pub fn book_for_product(&self, product: &ProductId) -> Option<BookId> {
        let number = product.as_str().strip_prefix(&self.product_prefix)?;
        let book: BookId = number.parse().ok()?;
        self.is_purchasable(book).then_some(book)
    }

    fn is_purchasable(&self, book: BookId) -> bool {
        book.index()
            .and_then(|i| self.default_statuses.get(i))
            .is_some_and(|status| status.is_locked())
    }

    fn purchasable_books(&self) -> impl Iterator<Item = BookId> + '_ {
        self.default_statuses
            .iter()
            .enumerate()
            .filter(|(_, status)| status.is_locked())
            .map(|(i, _)| BookId::from_index(i))
    }

    fn product_for_book(&self, book: BookId) -> ProductId {
        ProductId::new(format!("{}{}", self.product_prefix, book.value()))
    }
}

impl Default for BookCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
