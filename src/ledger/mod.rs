pub mod engine;

pub use engine::{ApplyOutcome, LedgerEngine};
