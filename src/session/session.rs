//! Session module.
//!
//! This module contains the session and connector traits the
//! migration engine works with, and the errors they can produce.

use std::{io, net::TcpStream, result};
use thiserror::Error;

use crate::{
    migration::retry::{Classify, Failure},
    AccountCredentials, Flags, Message,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot create tls connector")]
    CreateTlsConnectorError(#[source] native_tls::Error),
    #[error("cannot resolve imap server {1}")]
    ResolveHostError(#[source] io::Error, String),
    #[error("cannot connect to imap server {1}")]
    ConnectImapServerError(#[source] imap::Error, String),
    #[error("cannot start tls with imap server {1}")]
    StartTlsError(#[source] imap::Error, String),
    #[error("cannot negotiate tls with imap server {1}")]
    TlsHandshakeError(#[source] native_tls::HandshakeError<TcpStream>, String),
    #[error("cannot login to imap server as {1}")]
    LoginImapServerError(#[source] imap::Error, String),
    #[error("cannot use session: session not connected")]
    NotConnectedError,

    #[error("cannot list folders")]
    ListFoldersError(#[source] imap::Error),
    #[error("cannot create folder {1}")]
    CreateFolderError(#[source] imap::Error, String),
    #[error("cannot select folder {1}")]
    SelectFolderError(#[source] imap::Error, String),
    #[error("cannot search messages")]
    SearchMsgsError(#[source] imap::Error),
    #[error("cannot fetch message {1}")]
    FetchMsgError(#[source] imap::Error, u32),
    #[error("cannot get uid of message {0}")]
    GetUidError(u32),
    #[error("cannot get body of message {0}")]
    GetBodyError(u32),
    #[error("cannot append message to folder {1}")]
    AppendMsgError(#[source] imap::Error, String),
    #[error("cannot logout from imap server")]
    LogoutError(#[source] imap::Error),
}

pub type Result<T> = result::Result<T, Error>;

impl Classify for Error {
    fn failure(&self) -> Failure {
        match self {
            Self::NotConnectedError
            | Self::ResolveHostError(..)
            | Self::TlsHandshakeError(..) => Failure::Transient,
            Self::CreateTlsConnectorError(_) | Self::LoginImapServerError(..) => Failure::Fatal,
            Self::GetUidError(_) | Self::GetBodyError(_) => Failure::Protocol,
            Self::ConnectImapServerError(err, _)
            | Self::StartTlsError(err, _)
            | Self::ListFoldersError(err)
            | Self::CreateFolderError(err, _)
            | Self::SelectFolderError(err, _)
            | Self::SearchMsgsError(err)
            | Self::FetchMsgError(err, _)
            | Self::AppendMsgError(err, _)
            | Self::LogoutError(err) => imap_failure(err),
        }
    }
}

/// Classifies errors of the `imap` crate. Errors of the underlying
/// stream (resets, timeouts, TLS errors, closed connections) are
/// worth a reconnection, rejected or unparsable responses only a
/// retry.
fn imap_failure(err: &imap::Error) -> Failure {
    match err {
        imap::Error::Io(_) | imap::Error::ConnectionLost | imap::Error::Bye(_) => {
            Failure::Transient
        }
        imap::Error::Validate(_) => Failure::Fatal,
        _ => Failure::Protocol,
    }
}

/// Represents one authenticated connection to one mail endpoint.
///
/// Folder names are always the raw names reported by the server.
pub trait Session {
    /// Lists the folders, in the order reported by the server.
    fn list_folders(&mut self) -> Result<Vec<String>>;
    /// Creates the given folder. Returns `false` if the folder
    /// already exists.
    fn create_folder(&mut self, folder: &str) -> Result<bool>;
    fn select_folder(&mut self, folder: &str) -> Result<()>;
    /// Searches all messages of the selected folder, returning their
    /// sequence numbers in ascending order.
    fn search_all(&mut self) -> Result<Vec<u32>>;
    /// Fetches the durable identifier of the message at the given
    /// sequence number.
    fn fetch_uid(&mut self, seq: u32) -> Result<String>;
    fn fetch_message(&mut self, seq: u32) -> Result<Message>;
    fn append_message(&mut self, folder: &str, flags: &Flags, content: &[u8]) -> Result<()>;
    /// Logs out. The session must not be used afterwards, whatever
    /// the result.
    fn terminate(&mut self) -> Result<()>;
}

/// Establishes sessions.
pub trait Connector {
    type Session: Session;

    fn connect(&self, credentials: &AccountCredentials) -> Result<Self::Session>;
}
