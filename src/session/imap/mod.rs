//! IMAP session module.
//!
//! This module contains the IMAP implementation of the session, on
//! top of the blocking `imap` client secured with `native-tls`.

pub mod flags;
pub mod session;

pub use self::flags::{from_imap_flag, from_imap_flags, into_imap_flags};
pub use self::session::{ImapConnector, ImapSession, ImapSessionStream};
