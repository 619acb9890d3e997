//! Dedup store module.
//!
//! This module contains the SQLite store recording which messages
//! have already been migrated to which destination account. A record
//! is only written once the message has been appended to the
//! destination, so its presence is the proof of delivery.

use log::{debug, info};
use rusqlite::Connection;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    result,
    time::Duration,
};
use thiserror::Error;

pub const DEFAULT_STORE_PATH: &str = "migrated_uids.db";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_MIGRATED_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS migrated_messages (
        folder     TEXT,
        uid        TEXT,
        dest_email TEXT,
        PRIMARY KEY (folder, uid, dest_email)
    )
";

const INSERT_MIGRATED: &str = "
    INSERT OR IGNORE INTO migrated_messages (folder, uid, dest_email)
    VALUES (?, ?, ?)
";

const SELECT_MIGRATED_UIDS: &str = "
    SELECT uid
    FROM migrated_messages
    WHERE folder = ?
    AND dest_email = ?
";

const COUNT_BY_DESTINATION: &str = "
    SELECT COUNT(*)
    FROM migrated_messages
    WHERE dest_email = ?
";

const DELETE_BY_DESTINATION: &str = "
    DELETE FROM migrated_messages
    WHERE dest_email = ?
";

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot open dedup store {1}")]
    OpenStoreError(#[source] rusqlite::Error, PathBuf),
    #[error("cannot create dedup store schema")]
    CreateSchemaError(#[source] rusqlite::Error),
    #[error("cannot load migrated messages of folder {1} for {2}")]
    LoadMigratedError(#[source] rusqlite::Error, String, String),
    #[error("cannot record migrated message {2} of folder {1} for {3}")]
    RecordMigratedError(#[source] rusqlite::Error, String, String, String),
    #[error("cannot count migrated messages for {1}")]
    CountMigratedError(#[source] rusqlite::Error, String),
    #[error("cannot purge migrated messages for {1}")]
    PurgeMigratedError(#[source] rusqlite::Error, String),
}

pub type Result<T> = result::Result<T, Error>;

/// Represents the outcome of a purge.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Purge {
    /// Number of records matching before the deletion.
    pub before: usize,
    /// Number of records matching after the deletion.
    pub after: usize,
}

/// Represents the dedup store.
///
/// Every operation opens its own short-lived connection, so nothing
/// is held while the network is in use.
#[derive(Clone, Debug)]
pub struct DedupStore {
    db_path: PathBuf,
}

impl DedupStore {
    /// Opens the store at the given path, creating the schema if
    /// needed.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let store = Self {
            db_path: path.as_ref().to_owned(),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn db(&self) -> Result<Connection> {
        let db = Connection::open(&self.db_path)
            .map_err(|err| Error::OpenStoreError(err, self.db_path.clone()))?;
        db.busy_timeout(BUSY_TIMEOUT)
            .map_err(|err| Error::OpenStoreError(err, self.db_path.clone()))?;
        Ok(db)
    }

    pub fn ensure_schema(&self) -> Result<()> {
        self.db()?
            .execute(CREATE_MIGRATED_TABLE, [])
            .map_err(Error::CreateSchemaError)?;
        Ok(())
    }

    /// Loads the ids of the messages of the given folder already
    /// migrated to the given destination account.
    pub fn load_migrated(&self, folder: &str, dest: &str) -> Result<HashSet<String>> {
        let map_err = |err| Error::LoadMigratedError(err, folder.to_owned(), dest.to_owned());

        let db = self.db()?;
        let mut stmt = db.prepare(SELECT_MIGRATED_UIDS).map_err(map_err)?;
        let uids = stmt
            .query_map([folder, dest], |row| row.get::<usize, String>(0))
            .map_err(map_err)?
            .collect::<rusqlite::Result<HashSet<_>>>()
            .map_err(map_err)?;

        debug!("{} message(s) of {} already migrated to {}", uids.len(), folder, dest);
        Ok(uids)
    }

    /// Records a migrated message. Recording it again is a no-op.
    pub fn record_migrated(&self, folder: &str, uid: &str, dest: &str) -> Result<()> {
        self.db()?
            .execute(INSERT_MIGRATED, [folder, uid, dest])
            .map_err(|err| {
                Error::RecordMigratedError(err, folder.to_owned(), uid.to_owned(), dest.to_owned())
            })?;
        Ok(())
    }

    pub fn count_by_destination(&self, dest: &str) -> Result<usize> {
        count_by_destination(&self.db()?, dest)
            .map_err(|err| Error::CountMigratedError(err, dest.to_owned()))
    }

    /// Deletes every record of the given destination account.
    pub fn purge_by_destination(&self, dest: &str) -> Result<Purge> {
        let map_err = |err| Error::PurgeMigratedError(err, dest.to_owned());

        let mut db = self.db()?;
        let tx = db.transaction().map_err(map_err)?;

        let before = count_by_destination(&tx, dest).map_err(map_err)?;
        info!("records of {} before deletion: {}", dest, before);

        if before == 0 {
            info!("no records of {} to delete", dest);
            return Ok(Purge::default());
        }

        tx.execute(DELETE_BY_DESTINATION, [dest]).map_err(map_err)?;
        let after = count_by_destination(&tx, dest).map_err(map_err)?;
        tx.commit().map_err(map_err)?;

        info!("records of {} after deletion: {}", dest, after);
        Ok(Purge { before, after })
    }
}

fn count_by_destination(db: &Connection, dest: &str) -> rusqlite::Result<usize> {
    let count: i64 = db.query_row(COUNT_BY_DESTINATION, [dest], |row| row.get(0))?;
    Ok(count as usize)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{DedupStore, Purge};

    fn store() -> (tempfile::TempDir, DedupStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DedupStore::new(dir.path().join("migrated_uids.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn ensure_schema_twice() {
        let (_dir, store) = store();
        store.ensure_schema().unwrap();
        assert!(DedupStore::new(store.path()).is_ok());
    }

    #[test]
    fn record_is_unique() {
        let (_dir, store) = store();

        store.record_migrated("INBOX", "1", "d@x").unwrap();
        store.record_migrated("INBOX", "1", "d@x").unwrap();

        assert_eq!(
            HashSet::from_iter(["1".to_owned()]),
            store.load_migrated("INBOX", "d@x").unwrap()
        );
        assert_eq!(1, store.count_by_destination("d@x").unwrap());
    }

    #[test]
    fn records_are_partitioned() {
        let (_dir, store) = store();

        store.record_migrated("INBOX", "1", "d@x").unwrap();
        store.record_migrated("INBOX", "2", "d@x").unwrap();
        store.record_migrated("Sent", "1", "d@x").unwrap();
        store.record_migrated("INBOX", "3", "e@x").unwrap();

        assert_eq!(
            HashSet::from_iter(["1".to_owned(), "2".to_owned()]),
            store.load_migrated("INBOX", "d@x").unwrap()
        );
        assert_eq!(
            HashSet::from_iter(["1".to_owned()]),
            store.load_migrated("Sent", "d@x").unwrap()
        );
        assert!(store.load_migrated("Trash", "d@x").unwrap().is_empty());
    }

    #[test]
    fn purge_one_destination() {
        let (_dir, store) = store();

        store.record_migrated("INBOX", "1", "a@x").unwrap();
        store.record_migrated("Sent", "2", "a@x").unwrap();
        store.record_migrated("INBOX", "1", "b@y").unwrap();
        store.record_migrated("INBOX", "2", "b@y").unwrap();
        store.record_migrated("Sent", "3", "b@y").unwrap();

        assert_eq!(
            Purge {
                before: 2,
                after: 0
            },
            store.purge_by_destination("a@x").unwrap()
        );
        assert_eq!(0, store.count_by_destination("a@x").unwrap());
        assert_eq!(3, store.count_by_destination("b@y").unwrap());
    }

    #[test]
    fn purge_unknown_destination() {
        let (_dir, store) = store();
        store.record_migrated("INBOX", "1", "b@y").unwrap();

        assert_eq!(Purge::default(), store.purge_by_destination("a@x").unwrap());
        assert_eq!(1, store.count_by_destination("b@y").unwrap());
    }
}
