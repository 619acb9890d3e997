//! Migration engine module.
//!
//! This module contains the engine migrating one account pair: it
//! mirrors the source folders on the destination, then transfers
//! every message not yet recorded in the dedup store.

use log::{debug, error, info, warn};
use std::{collections::HashSet, error, fmt, result, thread, time::Duration};
use thiserror::Error;

use crate::{decode_display_name, session, AccountPair, Connector, Message, Session};

use super::{
    retry::{self, Classify, Failure},
    store, DedupStore, LogContext, Retry,
};

pub const DEFAULT_RECONNECT_PAUSE: Duration = Duration::from_secs(1);

const NO_SUBJECT: &str = "(No Subject)";

/// Represents the errors of one operation of a run.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("message {0} has uid {2} instead of {1}")]
    UnexpectedUidError(u32, String, String),

    #[error(transparent)]
    SessionError(#[from] session::Error),
    #[error(transparent)]
    StoreError(#[from] store::Error),
}

impl Classify for TransferError {
    fn failure(&self) -> Failure {
        match self {
            Self::SessionError(err) => err.failure(),
            // the source changed under our feet, better not to guess
            Self::UnexpectedUidError(..) => Failure::Fatal,
            // carrying on without durable dedup risks duplicates
            Self::StoreError(_) => Failure::Fatal,
        }
    }
}

type TransferResult<T> = result::Result<T, TransferError>;

/// Represents the errors aborting a whole run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot connect to source account {1}")]
    ConnectSourceError(#[source] session::Error, String),
    #[error("cannot connect to destination account {1}")]
    ConnectDestinationError(#[source] session::Error, String),
    #[error("cannot list source folders")]
    ListFoldersError(#[source] retry::Error<TransferError>),
    #[error("cannot load migrated messages from dedup store")]
    LoadMigratedError(#[source] store::Error),
    #[error("cannot record migrated message, aborting")]
    RecordMigratedError(#[source] retry::Error<TransferError>),
}

pub type Result<T> = result::Result<T, Error>;

/// Represents the outcome of a run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MigrationReport {
    /// Number of source folders processed.
    pub folders: usize,
    /// Number of folders skipped because they could not be selected.
    pub failed_folders: usize,
    /// Number of messages appended to the destination.
    pub transferred: usize,
    /// Number of messages found in the dedup store.
    pub skipped: usize,
    /// Number of messages given up on.
    pub failed: usize,
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} folder(s) ({} failed), {} message(s) transferred, {} skipped, {} failed",
            self.folders, self.failed_folders, self.transferred, self.skipped, self.failed
        )
    }
}

/// Formats the error followed by its sources.
pub fn format_error_chain(err: &dyn error::Error) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(err) = source {
        chain.push_str(": ");
        chain.push_str(&err.to_string());
        source = err.source();
    }
    chain
}

/// Holds the source and destination sessions of a run.
///
/// A session is `None` after a failed reconnection; using it then
/// fails with a transient error so that the next operation tries to
/// reconnect again. Sessions are logged out when dropped.
struct Sessions<S: Session> {
    log: LogContext,
    source: Option<S>,
    destination: Option<S>,
    /// The folder selected on both sessions, restored after a
    /// reconnection.
    folder: Option<String>,
}

impl<S: Session> Sessions<S> {
    fn new(log: LogContext) -> Self {
        Self {
            log,
            source: None,
            destination: None,
            folder: None,
        }
    }

    fn source(&mut self) -> session::Result<&mut S> {
        self.source
            .as_mut()
            .ok_or(session::Error::NotConnectedError)
    }

    fn destination(&mut self) -> session::Result<&mut S> {
        self.destination
            .as_mut()
            .ok_or(session::Error::NotConnectedError)
    }

    /// Logs out both sessions, ignoring failures.
    fn terminate(&mut self) {
        let sessions = [
            ("source", self.source.take()),
            ("destination", self.destination.take()),
        ];

        for (kind, session) in sessions {
            if let Some(mut session) = session {
                match session.terminate() {
                    Ok(()) => debug!("{} logged out from {} account", self.log, kind),
                    Err(err) => debug!(
                        "{} cannot log out from {} account, ignoring it: {}",
                        self.log, kind, err
                    ),
                }
            }
        }
    }
}

impl<S: Session> Drop for Sessions<S> {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Represents the migration engine.
pub struct Migration<'a, C: Connector> {
    connector: &'a C,
    store: &'a DedupStore,
    max_attempts: usize,
    backoff_unit: Duration,
    reconnect_pause: Duration,
}

impl<'a, C: Connector> Migration<'a, C> {
    pub fn new(connector: &'a C, store: &'a DedupStore) -> Self {
        Self {
            connector,
            store,
            max_attempts: retry::DEFAULT_MAX_ATTEMPTS,
            backoff_unit: retry::DEFAULT_BACKOFF_UNIT,
            reconnect_pause: DEFAULT_RECONNECT_PAUSE,
        }
    }

    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Sets the pause between the logout and the login of a
    /// reconnection.
    pub fn reconnect_pause(mut self, pause: Duration) -> Self {
        self.reconnect_pause = pause;
        self
    }

    /// Migrates the source account of the pair to its destination
    /// account.
    pub fn run(&self, pair: &AccountPair) -> Result<MigrationReport> {
        let log = LogContext::new(&pair.source.username);
        info!(
            "{} starting migration {} -> {}",
            log, pair.source, pair.destination
        );

        let retry = Retry::new(log.clone())
            .max_attempts(self.max_attempts)
            .backoff_unit(self.backoff_unit);

        Run {
            connector: self.connector,
            store: self.store,
            reconnect_pause: self.reconnect_pause,
            pair,
            log,
            retry,
        }
        .run()
    }
}

/// Migrates the given account pairs one after the other, in order.
///
/// The failure of a pair is logged and does not prevent the next
/// pairs from running.
pub fn migrate_all<C: Connector>(
    migration: &Migration<C>,
    pairs: &[AccountPair],
) -> Vec<Result<MigrationReport>> {
    pairs
        .iter()
        .map(|pair| {
            let res = migration.run(pair);
            if let Err(ref err) = res {
                error!(
                    "{} migration to {} failed: {}",
                    LogContext::new(&pair.source.username),
                    pair.destination,
                    format_error_chain(err)
                );
            }
            res
        })
        .collect()
}

struct Run<'a, C: Connector> {
    connector: &'a C,
    store: &'a DedupStore,
    reconnect_pause: Duration,
    pair: &'a AccountPair,
    log: LogContext,
    retry: Retry<'a>,
}

impl<'a, C: Connector> Run<'a, C> {
    fn run(self) -> Result<MigrationReport> {
        let mut sessions = self.connect()?;
        let mut report = MigrationReport::default();

        let folders = self
            .retry
            .execute(
                &mut sessions,
                "list source folders",
                |sessions| -> TransferResult<Vec<String>> {
                    Ok(sessions.source()?.list_folders()?)
                },
                |sessions| self.reconnect(sessions),
            )
            .map_err(Error::ListFoldersError)?;
        info!("{} found {} folder(s)", self.log, folders.len());

        for folder in &folders {
            report.folders += 1;
            self.migrate_folder(&mut sessions, folder, &mut report)?;
        }

        sessions.terminate();
        info!("{} migration completed: {}", self.log, report);

        Ok(report)
    }

    fn connect(&self) -> Result<Sessions<C::Session>> {
        let mut sessions = Sessions::new(self.log.clone());

        let source = self
            .connector
            .connect(&self.pair.source)
            .map_err(|err| Error::ConnectSourceError(err, self.pair.source.to_string()))?;
        sessions.source = Some(source);
        info!("{} connected to source account", self.log);

        let destination = self
            .connector
            .connect(&self.pair.destination)
            .map_err(|err| {
                Error::ConnectDestinationError(err, self.pair.destination.to_string())
            })?;
        sessions.destination = Some(destination);
        info!("{} connected to destination account", self.log);

        Ok(sessions)
    }

    fn reconnect(&self, sessions: &mut Sessions<C::Session>) -> TransferResult<()> {
        sessions.terminate();
        thread::sleep(self.reconnect_pause);

        sessions.source = Some(self.connector.connect(&self.pair.source)?);
        sessions.destination = Some(self.connector.connect(&self.pair.destination)?);
        info!("{} reconnected to both accounts", self.log);

        if let Some(folder) = sessions.folder.clone() {
            sessions.source()?.select_folder(&folder)?;
            sessions.destination()?.select_folder(&folder)?;
            info!(
                "{} re-selected folder {}",
                self.log,
                decode_display_name(&folder)
            );
        }

        Ok(())
    }

    fn migrate_folder(
        &self,
        sessions: &mut Sessions<C::Session>,
        folder: &str,
        report: &mut MigrationReport,
    ) -> Result<()> {
        let name = decode_display_name(folder);
        sessions.folder = None;

        let created = self.retry.execute(
            sessions,
            &format!("create folder {}", name),
            |sessions| -> TransferResult<bool> {
                Ok(sessions.destination()?.create_folder(folder)?)
            },
            |sessions| self.reconnect(sessions),
        );
        match created {
            Ok(true) => info!("{} created folder {}", self.log, name),
            Ok(false) => info!("{} folder {} already exists", self.log, name),
            Err(err) => warn!(
                "{} {}, selecting it anyway",
                self.log,
                format_error_chain(&err)
            ),
        }

        let seqs = self.retry.execute(
            sessions,
            &format!("select folder {}", name),
            |sessions| -> TransferResult<Vec<u32>> {
                sessions.source()?.select_folder(folder)?;
                sessions.destination()?.select_folder(folder)?;
                Ok(sessions.source()?.search_all()?)
            },
            |sessions| self.reconnect(sessions),
        );
        let seqs = match seqs {
            Ok(seqs) => seqs,
            Err(err) => {
                error!(
                    "{} skipping folder {}: {}",
                    self.log,
                    name,
                    format_error_chain(&err)
                );
                report.failed_folders += 1;
                return Ok(());
            }
        };
        sessions.folder = Some(folder.to_owned());

        let mut migrated = self
            .store
            .load_migrated(folder, &self.pair.destination.username)
            .map_err(Error::LoadMigratedError)?;

        info!(
            "{} migrating folder {}, total messages: {}",
            self.log,
            name,
            seqs.len()
        );

        for seq in seqs {
            self.migrate_message(sessions, folder, &name, seq, &mut migrated, report)?;
        }

        Ok(())
    }

    fn migrate_message(
        &self,
        sessions: &mut Sessions<C::Session>,
        folder: &str,
        name: &str,
        seq: u32,
        migrated: &mut HashSet<String>,
        report: &mut MigrationReport,
    ) -> Result<()> {
        let dest = self.pair.destination.username.as_str();

        let uid = self.retry.execute(
            sessions,
            &format!("fetch uid of message {} in folder {}", seq, name),
            |sessions| -> TransferResult<String> { Ok(sessions.source()?.fetch_uid(seq)?) },
            |sessions| self.reconnect(sessions),
        );
        let uid = match uid {
            Ok(uid) => uid,
            Err(err) => {
                error!("{} {}", self.log, format_error_chain(&err));
                report.failed += 1;
                return Ok(());
            }
        };

        if migrated.contains(&uid) {
            info!(
                "{} skipping already migrated message UID {} in folder {}",
                self.log, uid, name
            );
            report.skipped += 1;
            return Ok(());
        }

        let res = self.retry.execute(
            sessions,
            &format!("migrate message UID {} in folder {}", uid, name),
            |sessions| -> TransferResult<Message> {
                let msg = sessions.source()?.fetch_message(seq)?;
                if msg.id != uid {
                    return Err(TransferError::UnexpectedUidError(
                        seq,
                        uid.clone(),
                        msg.id,
                    ));
                }
                sessions
                    .destination()?
                    .append_message(folder, &msg.flags, &msg.content)?;
                self.store.record_migrated(folder, &uid, dest)?;
                Ok(msg)
            },
            |sessions| self.reconnect(sessions),
        );

        match res {
            Ok(msg) => {
                let subject = msg.subject().unwrap_or_else(|| NO_SUBJECT.to_owned());
                info!(
                    "{} successfully migrated message UID {} ({}) in folder {}",
                    self.log, uid, subject, name
                );
                migrated.insert(uid);
                report.transferred += 1;
                Ok(())
            }
            Err(err) if matches!(err.inner(), TransferError::StoreError(_)) => {
                error!("{} {}", self.log, format_error_chain(&err));
                Err(Error::RecordMigratedError(err))
            }
            Err(err) => {
                error!(
                    "{} failed to migrate message UID {} in folder {} after {} attempt(s): {}",
                    self.log,
                    uid,
                    name,
                    err.attempts(),
                    format_error_chain(&err)
                );
                report.failed += 1;
                Ok(())
            }
        }
    }
}
