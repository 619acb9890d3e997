//! Message module.
//!
//! This module contains the representation of a message fetched from
//! the source account.

use log::trace;
use mailparse::MailHeaderMap;

use crate::Flags;

/// Represents a raw message together with its durable identifier.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Message {
    /// Represents the identifier of the message, stable across
    /// sessions within its folder (the IMAP UID).
    pub id: String,
    /// Represents the flags of the message.
    pub flags: Flags,
    /// Represents the raw RFC822 content of the message.
    pub content: Vec<u8>,
}

impl Message {
    /// Extracts the decoded subject of the message, if any.
    pub fn subject(&self) -> Option<String> {
        match mailparse::parse_headers(&self.content) {
            Ok((headers, _)) => headers.get_first_value("Subject"),
            Err(err) => {
                trace!("cannot parse headers of message {}: {}", self.id, err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Message;

    #[test]
    fn subject() {
        let msg = Message {
            id: "1".into(),
            content: b"From: alice@localhost\r\nSubject: =?utf-8?q?Caf=C3=A9?=\r\n\r\nbody\r\n".to_vec(),
            ..Message::default()
        };
        assert_eq!(Some("Café".to_owned()), msg.subject());

        let msg = Message {
            id: "2".into(),
            content: b"From: alice@localhost\r\n\r\nbody\r\n".to_vec(),
            ..Message::default()
        };
        assert_eq!(None, msg.subject());
    }
}
