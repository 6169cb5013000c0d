pub mod account_repository;
pub mod journal_repository;
pub mod transfer_record_repository;

pub use account_repository::AccountRepository;
pub use journal_repository::JournalRepository;
pub use transfer_record_repository::TransferRecordRepository;

use sqlx::PgPool;

/// Database connection pool type alias.
pub type DbPool = PgPool;
