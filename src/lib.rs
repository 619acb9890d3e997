//! Idempotent IMAP to IMAP mailbox migration.
//!
//! The crate copies every folder and message of a source account to a
//! destination account. Transferred messages are tracked in a SQLite
//! store so that repeated runs never deliver the same message twice.

pub mod account;
pub use account::*;

pub mod domain;
pub use domain::*;

pub mod logger;
pub use logger::AccountLogger;

pub mod session;
pub use session::{Connector, ImapConnector, ImapSession, Session};

pub mod migration;
pub use migration::{migrate_all, DedupStore, LogContext, Migration, MigrationReport, Retry};
