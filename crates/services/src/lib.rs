#![forbid(unsafe_code)]

pub mod app_services;
pub mod entitlements;
pub mod error;
pub mod purchases;
pub mod session;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use entitlements::{EntitlementStore, PurchaseResult};
pub use error::PurchaseError;
pub use purchases::{LocalPurchaseBackend, PurchaseBackend, ScriptedOutcome};
pub use session::{AnswerOutcome, QuizSession, STARTING_QUESTION_SCORE};
