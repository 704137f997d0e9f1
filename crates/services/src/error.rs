//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::ProductId;

/// Errors emitted by a `PurchaseBackend`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PurchaseError {
    #[error("unknown product {0}")]
    UnknownProduct(ProductId),
    #[error("purchase backend unavailable: {0}")]
    Unavailable(String),
}
