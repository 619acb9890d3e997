//! Session module.
//!
//! This module exposes the session trait, an authenticated connection
//! to one mail endpoint, and its IMAP implementation.

mod session;

pub mod imap;

pub use self::imap::{ImapConnector, ImapSession};
pub use self::session::{Connector, Error, Result, Session};
