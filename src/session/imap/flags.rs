use crate::{Flag, Flags};

pub fn from_imap_flag(imap_flag: &imap::types::Flag<'_>) -> Flag {
    match imap_flag {
        imap::types::Flag::Seen => Flag::Seen,
        imap::types::Flag::Answered => Flag::Answered,
        imap::types::Flag::Flagged => Flag::Flagged,
        imap::types::Flag::Deleted => Flag::Deleted,
        imap::types::Flag::Draft => Flag::Draft,
        imap::types::Flag::Recent => Flag::Recent,
        flag => Flag::Custom(flag.to_string()),
    }
}

pub fn from_imap_flags<'a, 'b: 'a, I>(imap_flags: I) -> Flags
where
    I: IntoIterator<Item = &'a imap::types::Flag<'b>>,
{
    imap_flags.into_iter().map(from_imap_flag).collect()
}

/// Converts the flags into IMAP flags, leaving out the ones a client
/// cannot set.
pub fn into_imap_flags(flags: &Flags) -> Vec<imap::types::Flag<'_>> {
    flags
        .iter()
        .filter(|flag| flag.is_settable())
        .map(|flag| match flag {
            Flag::Seen => imap::types::Flag::Seen,
            Flag::Answered => imap::types::Flag::Answered,
            Flag::Flagged => imap::types::Flag::Flagged,
            Flag::Deleted => imap::types::Flag::Deleted,
            Flag::Draft => imap::types::Flag::Draft,
            Flag::Recent => imap::types::Flag::Recent,
            Flag::Custom(flag) => imap::types::Flag::Custom(flag.into()),
        })
        .collect()
}
