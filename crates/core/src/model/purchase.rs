use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::ProductId;

/// A purchasable item as reported by the store backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub display_name: String,
    pub display_price: String,
}

/// A completed store transaction for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub product_id: ProductId,
    pub purchased_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Transaction {
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

/// Result of the backend's signature check on a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification<T> {
    Verified(T),
    Unverified { value: T, reason: String },
}

impl<T> Verification<T> {
    /// The payload, only if verification passed.
    #[must_use]
    pub fn verified(self) -> Option<T> {
        match self {
            Verification::Verified(value) => Some(value),
            Verification::Unverified { .. } => None,
        }
    }
}

/// What happened when the user tried to buy a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Success(Verification<Transaction>),
    UserCancelled,
    Pending,
}

/// Event pushed by the backend whenever a transaction changes outside a purchase call
/// (refunds, family sharing, purchases made on another device).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionUpdate {
    pub product_id: ProductId,
}
