mod bank;
mod book;
mod ids;
mod purchase;
mod question;
mod scores;

pub use ids::{BookId, ParseIdError, ProductId, QuestionId};

pub use bank::{QuestionBank, QuestionBankError};
pub use book::{BookCatalog, BookStatus};
pub use purchase::{Product, PurchaseOutcome, Transaction, TransactionUpdate, Verification};
pub use question::{Question, QuestionError};
pub use scores::{RECENT_SCORE_SLOTS, RecentScores};
