pub mod ledger_facade;
pub mod requests;
pub mod responses;
pub mod transfer_facade;

pub use ledger_facade::{create_router as create_ledger_router, LedgerAppState};
pub use transfer_facade::{create_router as create_transfer_router, TransferAppState};
