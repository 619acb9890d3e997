//! Logger module.
//!
//! This module contains a logger writing through `env_logger` and,
//! optionally, into one log file per source account.

use chrono::Local;
use log::{Log, Metadata, Record, SetLoggerError};
use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::PathBuf,
    sync::{Mutex, MutexGuard, PoisonError},
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Represents a logger duplicating records into the log file of the
/// account being migrated, if a log directory is set.
///
/// Account pairs are migrated one after the other, so only one file is
/// open at a time.
pub struct AccountLogger {
    inner: env_logger::Logger,
    dir: Option<PathBuf>,
    file: Mutex<Option<File>>,
}

impl AccountLogger {
    pub fn new(inner: env_logger::Logger, dir: Option<PathBuf>) -> Self {
        Self {
            inner,
            dir,
            file: Mutex::new(None),
        }
    }

    /// Installs the logger globally and returns a handle to it.
    pub fn init(self) -> Result<&'static Self, SetLoggerError> {
        let logger: &'static Self = Box::leak(Box::new(self));
        log::set_logger(logger)?;
        log::set_max_level(logger.inner.filter());
        Ok(logger)
    }

    /// Directs the next records to `<dir>/<account>.log`, appending to
    /// it. Does nothing without log directory.
    pub fn switch_account(&self, account: &str) -> io::Result<()> {
        if let Some(dir) = &self.dir {
            fs::create_dir_all(dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(format!("{}.log", account)))?;
            *self.file() = Some(file);
        }
        Ok(())
    }

    /// Stops writing into the current account log file.
    pub fn close_account(&self) {
        if let Some(mut file) = self.file().take() {
            let _ = file.flush();
        }
    }

    fn file(&self) -> MutexGuard<'_, Option<File>> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Log for AccountLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.inner.matches(record) {
            return;
        }

        self.inner.log(record);

        if let Some(file) = self.file().as_mut() {
            // write failures are ignored
            let _ = writeln!(
                file,
                "{} - {} - {}",
                Local::now().format(TIMESTAMP_FORMAT),
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        self.inner.flush();
        if let Some(file) = self.file().as_mut() {
            let _ = file.flush();
        }
    }
}
