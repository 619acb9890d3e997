use std::fmt;

/// Represents the logging context of one migration run.
///
/// Built once per account pair and handed to every component logging
/// on behalf of the run, which prefix their lines with it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LogContext {
    account: String,
}

impl LogContext {
    pub fn new<A: ToString>(account: A) -> Self {
        Self {
            account: account.to_string(),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.account)
    }
}
