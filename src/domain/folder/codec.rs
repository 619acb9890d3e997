//! Folder name codec module.
//!
//! IMAP servers report non-ASCII folder names in a modified base64
//! form of their UTF-16 representation (`&BBIERQQ+BDQETwRJBDgENQ-`).
//! The decoder below turns such names back into readable text. It is
//! only meant for log output: protocol calls always use the raw name.

use base64::{engine::general_purpose::STANDARD, Engine};
use encoding_rs::UTF_16BE;
use std::borrow::Cow;

const MARKER: char = '&';

/// Decodes the given raw folder name into a display string.
///
/// Falls back to the raw name whenever any step of the decoding
/// fails.
pub fn decode_display_name(raw: &str) -> Cow<'_, str> {
    match try_decode(raw) {
        Some(name) => Cow::Owned(name),
        None => Cow::Borrowed(raw),
    }
}

fn try_decode(raw: &str) -> Option<String> {
    let encoded = raw.strip_prefix(MARKER).unwrap_or(raw);
    let encoded = encoded.replace(',', "/").replace('-', "=");

    // padding is normalized: the closing `-` already turned into one
    // `=`, which may or may not be needed
    let mut encoded = encoded.trim_end_matches('=').to_owned();
    let rem = encoded.len() % 4;
    if rem > 0 {
        encoded.extend(std::iter::repeat('=').take(4 - rem));
    }

    let bytes = STANDARD.decode(encoded).ok()?;
    let name = UTF_16BE.decode_without_bom_handling_and_without_replacement(&bytes)?;

    Some(name.into_owned())
}

#[cfg(test)]
mod tests {
    use super::decode_display_name;

    #[test]
    fn decode_cyrillic_inbox() {
        assert_eq!(
            "Входящие",
            decode_display_name("&BBIERQQ+BDQETwRJBDgENQ-")
        );
    }

    #[test]
    fn decode_name_with_comma() {
        assert_eq!(
            "Отправленные",
            decode_display_name("&BB4EQgQ,BEAEMAQyBDsENQQ9BD0ESwQ1-")
        );
    }

    #[test]
    fn decode_without_marker() {
        assert_eq!("É", decode_display_name("AMk-"));
    }

    #[test]
    fn keep_undecodable_names() {
        // 5 base64 chars cannot be decoded
        assert_eq!("INBOX", decode_display_name("INBOX"));
        // 3 bytes are not valid UTF-16
        assert_eq!("Sent", decode_display_name("Sent"));
        assert_eq!("&Jjo-!", decode_display_name("&Jjo-!"));
        assert_eq!("Archives/2021", decode_display_name("Archives/2021"));
    }
}
