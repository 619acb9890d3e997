use std::fmt;

/// Represents the flag variants.
#[derive(Debug, Clone, Eq, Hash, PartialEq)]
pub enum Flag {
    Seen,
    Answered,
    Flagged,
    Deleted,
    Draft,
    Recent,
    Custom(String),
}

impl Flag {
    pub fn custom<F: ToString>(flag: F) -> Self {
        Self::Custom(flag.to_string())
    }

    /// Returns `true` if the flag can be set by a client. `\Recent`
    /// is managed by the server only.
    pub fn is_settable(&self) -> bool {
        !matches!(self, Flag::Recent)
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Flag::Seen => write!(f, "seen"),
            Flag::Answered => write!(f, "answered"),
            Flag::Flagged => write!(f, "flagged"),
            Flag::Deleted => write!(f, "deleted"),
            Flag::Draft => write!(f, "draft"),
            Flag::Recent => write!(f, "recent"),
            Flag::Custom(flag) => write!(f, "{}", flag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Flag;

    #[test]
    fn recent_is_not_settable() {
        assert!(Flag::Seen.is_settable());
        assert!(Flag::custom("$Forwarded").is_settable());
        assert!(!Flag::Recent.is_settable());
    }

    #[test]
    fn display() {
        assert_eq!("seen", Flag::Seen.to_string());
        assert_eq!("$Forwarded", Flag::custom("$Forwarded").to_string());
    }
}
