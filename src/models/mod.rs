pub mod account;
pub mod journal_entry;
pub mod transfer_record;

pub use account::Account;
pub use journal_entry::{EntryType, JournalEntry};
pub use transfer_record::{TransferRecord, TransferStatus};
