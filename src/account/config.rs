//! Account config module.
//!
//! This module contains the representation of the JSON configuration
//! file listing the account pairs to migrate:
//!
//! ```json
//! [
//!   {
//!     "source_host": "imap.old.example",
//!     "source_email": "alice@old.example",
//!     "source_password": "...",
//!     "dest_host": "imap.new.example",
//!     "dest_email": "alice@new.example",
//!     "dest_password": "..."
//!   }
//! ]
//! ```

use serde::Deserialize;
use std::{fs, io, path::PathBuf, result};
use thiserror::Error;

use crate::{AccountCredentials, AccountPair};

pub const DEFAULT_CONFIG_PATH: &str = "emails.json";

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read accounts config file {1}")]
    ReadConfigFileError(#[source] io::Error, PathBuf),
    #[error("cannot parse accounts config file {1}")]
    ParseConfigFileError(#[source] serde_json::Error, PathBuf),
}

pub type Result<T> = result::Result<T, Error>;

/// Represents one record of the accounts config file.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
pub struct AccountPairConfig {
    pub source_host: String,
    pub source_email: String,
    pub source_password: String,
    pub dest_host: String,
    pub dest_email: String,
    pub dest_password: String,
}

impl From<AccountPairConfig> for AccountPair {
    fn from(config: AccountPairConfig) -> Self {
        AccountPair {
            source: AccountCredentials {
                host: config.source_host,
                username: config.source_email,
                secret: config.source_password,
            },
            destination: AccountCredentials {
                host: config.dest_host,
                username: config.dest_email,
                secret: config.dest_password,
            },
        }
    }
}

/// Represents the ordered list of account pairs to migrate.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct AccountsConfig(pub Vec<AccountPairConfig>);

impl AccountsConfig {
    pub fn from_path<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let content =
            fs::read_to_string(&path).map_err(|err| Error::ReadConfigFileError(err, path.clone()))?;
        serde_json::from_str(&content).map_err(|err| Error::ParseConfigFileError(err, path))
    }

    /// Converts the config records into account pairs, keeping the
    /// order of the file.
    pub fn into_pairs(self) -> Vec<AccountPair> {
        self.0.into_iter().map(AccountPair::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, io::Write, path::PathBuf};

    use super::{AccountsConfig, Error};

    const CONFIG: &str = r#"[
        {
            "source_host": "imap.old.example",
            "source_email": "alice@old.example",
            "source_password": "alice-old",
            "dest_host": "imap.new.example",
            "dest_email": "alice@new.example",
            "dest_password": "alice-new"
        },
        {
            "source_host": "imap.old.example",
            "source_email": "bob@old.example",
            "source_password": "bob-old",
            "dest_host": "imap.new.example",
            "dest_email": "bob@new.example",
            "dest_password": "bob-new"
        }
    ]"#;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emails.json");
        fs::File::create(&path)
            .unwrap()
            .write_all(content.as_bytes())
            .unwrap();
        (dir, path)
    }

    #[test]
    fn parse_pairs_in_order() {
        let (_dir, path) = write_config(CONFIG);
        let pairs = AccountsConfig::from_path(&path).unwrap().into_pairs();

        assert_eq!(2, pairs.len());
        assert_eq!("alice@old.example", pairs[0].source.username);
        assert_eq!("alice-new", pairs[0].destination.secret);
        assert_eq!("imap.new.example", pairs[1].destination.host);
        assert_eq!("bob@new.example", pairs[1].destination.username);
    }

    #[test]
    fn reject_missing_fields() {
        let (_dir, path) = write_config(r#"[{"source_host": "imap.old.example"}]"#);
        let res = AccountsConfig::from_path(&path);
        assert!(matches!(res, Err(Error::ParseConfigFileError(_, _))));
    }

    #[test]
    fn reject_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let res = AccountsConfig::from_path(dir.path().join("missing.json"));
        assert!(matches!(res, Err(Error::ReadConfigFileError(_, _))));
    }
}
