//! Account module.
//!
//! This module contains the credentials of the accounts to migrate
//! and the loading of their configuration file.

pub mod config;
pub use config::{AccountPairConfig, AccountsConfig, DEFAULT_CONFIG_PATH};

pub mod credentials;
pub use credentials::*;
