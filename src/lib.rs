pub mod api;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod ledger;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod resilience;
pub mod schema;
