use std::fmt;

/// Represents the credentials of one account, source or destination.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct AccountCredentials {
    /// Represents the IMAP server host.
    pub host: String,
    /// Represents the IMAP login, usually the email address.
    pub username: String,
    /// Represents the IMAP password.
    pub secret: String,
}

impl AccountCredentials {
    pub fn new<H, U, S>(host: H, username: U, secret: S) -> Self
    where
        H: ToString,
        U: ToString,
        S: ToString,
    {
        Self {
            host: host.to_string(),
            username: username.to_string(),
            secret: secret.to_string(),
        }
    }
}

impl fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountCredentials")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl fmt::Display for AccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.host)
    }
}

/// Represents a source account and the account its content is
/// migrated to.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AccountPair {
    pub source: AccountCredentials,
    pub destination: AccountCredentials,
}
