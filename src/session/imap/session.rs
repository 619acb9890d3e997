//! IMAP session module.
//!
//! This module contains the IMAP connector and the session it
//! establishes.

use log::{debug, log_enabled, trace, Level};
use native_tls::{TlsConnector, TlsStream};
use std::{
    io,
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use crate::{
    session::{Connector, Error, Result, Session},
    AccountCredentials, Flags, Message,
};

use super::{from_imap_flags, into_imap_flags};

pub const DEFAULT_PORT: u16 = 993;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub type ImapSessionStream = TlsStream<TcpStream>;

/// Establishes IMAP sessions secured with TLS, either directly or
/// using STARTTLS.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ImapConnector {
    port: u16,
    starttls: bool,
    insecure: bool,
    timeout: Duration,
}

impl Default for ImapConnector {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            starttls: false,
            insecure: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ImapConnector {
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn starttls(mut self, starttls: bool) -> Self {
        self.starttls = starttls;
        self
    }

    /// Trusts any certificate.
    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Sets the timeout of the TCP connection and of every blocking
    /// read and write on the socket, greeting and login included.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ImapConnector {
    /// Opens the TCP connection, bounded by the timeout, which then
    /// applies to every read and write, greeting and login included.
    fn connect_tcp(&self, host: &str) -> Result<TcpStream> {
        let addrs = (host, self.port)
            .to_socket_addrs()
            .map_err(|err| Error::ResolveHostError(err, host.to_owned()))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(tcp) => {
                    tcp.set_read_timeout(Some(self.timeout))
                        .and_then(|()| tcp.set_write_timeout(Some(self.timeout)))
                        .map_err(|err| {
                            Error::ConnectImapServerError(imap::Error::Io(err), host.to_owned())
                        })?;
                    return Ok(tcp);
                }
                Err(err) => {
                    debug!("cannot connect to {}: {}", addr, err);
                    last_err = Some(err);
                }
            }
        }

        let err = last_err
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no address found"));
        Err(Error::ConnectImapServerError(imap::Error::Io(err), host.to_owned()))
    }
}

impl Connector for ImapConnector {
    type Session = ImapSession;

    fn connect(&self, credentials: &AccountCredentials) -> Result<ImapSession> {
        let host = credentials.host.as_str();
        debug!("connecting to {}:{}", host, self.port);

        let tls = TlsConnector::builder()
            .danger_accept_invalid_certs(self.insecure)
            .danger_accept_invalid_hostnames(self.insecure)
            .build()
            .map_err(Error::CreateTlsConnectorError)?;

        let tcp = self.connect_tcp(host)?;

        let client = if self.starttls {
            // the plain client only lives until the upgrade, the
            // socket is shared with the tls stream
            let plain = tcp.try_clone().map_err(|err| {
                Error::ConnectImapServerError(imap::Error::Io(err), host.to_owned())
            })?;
            let mut client = imap::Client::new(plain);
            client
                .read_greeting()
                .map_err(|err| Error::ConnectImapServerError(err, host.to_owned()))?;
            client
                .run_command_and_check_ok("STARTTLS")
                .map_err(|err| Error::StartTlsError(err, host.to_owned()))?;
            drop(client);

            let stream = tls
                .connect(host, tcp)
                .map_err(|err| Error::TlsHandshakeError(err, host.to_owned()))?;
            imap::Client::new(stream)
        } else {
            let stream = tls
                .connect(host, tcp)
                .map_err(|err| Error::TlsHandshakeError(err, host.to_owned()))?;
            let mut client = imap::Client::new(stream);
            client
                .read_greeting()
                .map_err(|err| Error::ConnectImapServerError(err, host.to_owned()))?;
            client
        };

        let mut session = client
            .login(&credentials.username, &credentials.secret)
            .map_err(|res| Error::LoginImapServerError(res.0, credentials.username.clone()))?;
        session.debug = log_enabled!(Level::Trace);

        Ok(ImapSession { session })
    }
}

/// Represents an authenticated IMAP session.
pub struct ImapSession {
    session: imap::Session<ImapSessionStream>,
}

impl Session for ImapSession {
    fn list_folders(&mut self) -> Result<Vec<String>> {
        let names = self
            .session
            .list(Some(""), Some("*"))
            .map_err(Error::ListFoldersError)?;
        let folders: Vec<String> = names.iter().map(|name| name.name().to_owned()).collect();

        trace!("imap folders: {:?}", folders);
        Ok(folders)
    }

    fn create_folder(&mut self, folder: &str) -> Result<bool> {
        match self.session.create(folder) {
            Ok(()) => Ok(true),
            // servers answer NO to an existing mailbox
            Err(imap::Error::No(res)) => {
                debug!("cannot create folder {}: {:?}", folder, res);
                Ok(false)
            }
            Err(err) => Err(Error::CreateFolderError(err, folder.to_owned())),
        }
    }

    fn select_folder(&mut self, folder: &str) -> Result<()> {
        let mbox = self
            .session
            .select(folder)
            .map_err(|err| Error::SelectFolderError(err, folder.to_owned()))?;
        debug!("selected folder {} ({} messages)", folder, mbox.exists);
        Ok(())
    }

    fn search_all(&mut self) -> Result<Vec<u32>> {
        let mut seqs: Vec<u32> = self
            .session
            .search("ALL")
            .map_err(Error::SearchMsgsError)?
            .into_iter()
            .collect();
        seqs.sort_unstable();

        trace!("sequence numbers: {:?}", seqs);
        Ok(seqs)
    }

    fn fetch_uid(&mut self, seq: u32) -> Result<String> {
        let fetches = self
            .session
            .fetch(seq.to_string(), "UID")
            .map_err(|err| Error::FetchMsgError(err, seq))?;
        let uid = fetches
            .iter()
            .find(|fetch| fetch.message == seq)
            .and_then(|fetch| fetch.uid)
            .ok_or(Error::GetUidError(seq))?;

        Ok(uid.to_string())
    }

    fn fetch_message(&mut self, seq: u32) -> Result<Message> {
        // BODY.PEEK leaves the \Seen flag of the source untouched
        let fetches = self
            .session
            .fetch(seq.to_string(), "(UID FLAGS BODY.PEEK[])")
            .map_err(|err| Error::FetchMsgError(err, seq))?;
        let fetch = fetches
            .iter()
            .find(|fetch| fetch.message == seq)
            .ok_or(Error::GetBodyError(seq))?;

        let id = fetch.uid.ok_or(Error::GetUidError(seq))?.to_string();
        let content = fetch.body().ok_or(Error::GetBodyError(seq))?.to_vec();
        let flags = from_imap_flags(fetch.flags());

        Ok(Message { id, flags, content })
    }

    fn append_message(&mut self, folder: &str, flags: &Flags, content: &[u8]) -> Result<()> {
        debug!("appending message to folder {} with flags {}", folder, flags);

        self.session
            .append(folder, content)
            .flags(into_imap_flags(flags))
            .finish()
            .map_err(|err| Error::AppendMsgError(err, folder.to_owned()))?;

        Ok(())
    }

    fn terminate(&mut self) -> Result<()> {
        self.session.logout().map_err(Error::LogoutError)
    }
}
