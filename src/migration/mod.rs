//! Migration module.
//!
//! This module contains everything needed to migrate account pairs:
//! the retry executor, the dedup store and the engine driving them.

mod context;
pub use context::LogContext;

pub mod retry;
pub use retry::{Classify, Failure, Retry};

pub mod store;
pub use store::{DedupStore, Purge};

pub mod engine;
pub use engine::{
    format_error_chain, migrate_all, Error, Migration, MigrationReport, Result, TransferError,
};
