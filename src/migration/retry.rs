//! Retry module.
//!
//! This module contains the executor running fallible operations with
//! a bounded number of attempts, an exponential backoff between them
//! and a reconnection hook on transient network failures.

use log::{error, warn};
use std::{error, fmt, thread, time::Duration};
use thiserror::Error;

use super::LogContext;

pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Represents the failure categories of an operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Failure {
    /// The connection is likely broken: reconnect, then retry.
    Transient,
    /// The server rejected or garbled the exchange: retry.
    Protocol,
    /// Retrying cannot help.
    Fatal,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Protocol => write!(f, "protocol"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}

/// Classifies an error into a failure category.
pub trait Classify {
    fn failure(&self) -> Failure;
}

#[derive(Debug, Error)]
pub enum Error<E>
where
    E: error::Error + 'static,
{
    #[error("cannot {what}: aborted at attempt {attempt}")]
    AbortedError {
        what: String,
        attempt: usize,
        #[source]
        source: E,
    },
    #[error("cannot {what}: giving up after {attempts} attempts")]
    ExhaustedError {
        what: String,
        attempts: usize,
        #[source]
        source: E,
    },
    #[error("cannot {what}: reconnection failed at attempt {attempt}")]
    ReconnectError {
        what: String,
        attempt: usize,
        #[source]
        source: E,
    },
}

impl<E> Error<E>
where
    E: error::Error + 'static,
{
    /// Returns the error of the last attempt, or of the reconnection.
    pub fn inner(&self) -> &E {
        match self {
            Self::AbortedError { source, .. }
            | Self::ExhaustedError { source, .. }
            | Self::ReconnectError { source, .. } => source,
        }
    }

    /// Returns the number of attempts made.
    pub fn attempts(&self) -> usize {
        match self {
            Self::AbortedError { attempt, .. } | Self::ReconnectError { attempt, .. } => *attempt,
            Self::ExhaustedError { attempts, .. } => *attempts,
        }
    }
}

pub type Result<T, E> = std::result::Result<T, Error<E>>;

/// Represents the retry executor.
pub struct Retry<'a> {
    log: LogContext,
    max_attempts: usize,
    backoff_unit: Duration,
    on_sleep: Box<dyn Fn(Duration) + 'a>,
}

impl<'a> Retry<'a> {
    pub fn new(log: LogContext) -> Self {
        Self {
            log,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
            on_sleep: Box::new(thread::sleep),
        }
    }

    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Replaces the function used to wait between two attempts.
    pub fn on_sleep<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + 'a,
    {
        self.on_sleep = Box::new(f);
        self
    }

    /// Computes the delay following the attempt of the given index,
    /// starting at 0: `unit * 2^index`.
    pub fn backoff(&self, index: usize) -> Duration {
        let factor = 1u32 << index.min(31);
        self.backoff_unit.saturating_mul(factor)
    }

    /// Executes the operation until it succeeds, fails fatally or
    /// runs out of attempts.
    ///
    /// Both the operation and the transient failure hook receive the
    /// given context, so that the hook can replace what the operation
    /// works on (typically the sessions). A failing hook ends the
    /// execution. The hook also runs after the last failed attempt so
    /// that the next operation starts from fresh sessions.
    pub fn execute<C, T, E, O, H>(
        &self,
        ctx: &mut C,
        what: &str,
        mut op: O,
        mut on_transient: H,
    ) -> Result<T, E>
    where
        E: Classify + error::Error + 'static,
        O: FnMut(&mut C) -> std::result::Result<T, E>,
        H: FnMut(&mut C) -> std::result::Result<(), E>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let err = match op(ctx) {
                Ok(res) => return Ok(res),
                Err(err) => err,
            };

            let failure = err.failure();
            warn!(
                "{} attempt {}/{} to {} failed ({}): {}",
                self.log, attempt, self.max_attempts, what, failure, err
            );

            if failure == Failure::Fatal {
                return Err(Error::AbortedError {
                    what: what.to_owned(),
                    attempt,
                    source: err,
                });
            }

            if failure == Failure::Transient {
                warn!("{} reconnecting", self.log);
                if let Err(reconnect_err) = on_transient(ctx) {
                    error!(
                        "{} cannot reconnect at attempt {}/{}: {}",
                        self.log, attempt, self.max_attempts, reconnect_err
                    );
                    return Err(Error::ReconnectError {
                        what: what.to_owned(),
                        attempt,
                        source: reconnect_err,
                    });
                }
            }

            if attempt >= self.max_attempts {
                return Err(Error::ExhaustedError {
                    what: what.to_owned(),
                    attempts: attempt,
                    source: err,
                });
            }

            (self.on_sleep)(self.backoff(attempt - 1));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, time::Duration};

    use crate::migration::LogContext;

    use super::{Classify, Error, Failure, Retry};

    #[derive(Debug, thiserror::Error)]
    #[error("{0} test error")]
    struct TestError(Failure);

    impl Classify for TestError {
        fn failure(&self) -> Failure {
            self.0
        }
    }

    #[derive(Default)]
    struct Counters {
        attempts: usize,
        reconnects: usize,
    }

    /// Fails with the given failures, in order, then succeeds.
    fn run(
        failures: &[Failure],
        reconnect_ok: bool,
        sleeps: &RefCell<Vec<Duration>>,
    ) -> (Result<usize, Error<TestError>>, Counters) {
        let retry = Retry::new(LogContext::new("test"))
            .max_attempts(3)
            .backoff_unit(Duration::from_millis(10))
            .on_sleep(|d| sleeps.borrow_mut().push(d));

        let mut counters = Counters::default();
        let res = retry.execute(
            &mut counters,
            "run test operation",
            |counters| {
                counters.attempts += 1;
                match failures.get(counters.attempts - 1) {
                    Some(failure) => Err(TestError(*failure)),
                    None => Ok(counters.attempts),
                }
            },
            |counters| {
                counters.reconnects += 1;
                if reconnect_ok {
                    Ok(())
                } else {
                    Err(TestError(Failure::Transient))
                }
            },
        );

        (res, counters)
    }

    #[test]
    fn succeed_at_first_attempt() {
        let sleeps = RefCell::new(vec![]);
        let (res, counters) = run(&[], true, &sleeps);

        assert_eq!(1, res.unwrap());
        assert_eq!(0, counters.reconnects);
        assert!(sleeps.borrow().is_empty());
    }

    #[test]
    fn succeed_after_transient_failures() {
        let sleeps = RefCell::new(vec![]);
        let (res, counters) = run(&[Failure::Transient, Failure::Transient], true, &sleeps);

        assert_eq!(3, res.unwrap());
        assert_eq!(2, counters.reconnects);
        assert_eq!(
            vec![Duration::from_millis(10), Duration::from_millis(20)],
            *sleeps.borrow()
        );
    }

    #[test]
    fn retry_protocol_failures_without_reconnecting() {
        let sleeps = RefCell::new(vec![]);
        let (res, counters) = run(&[Failure::Protocol], true, &sleeps);

        assert_eq!(2, res.unwrap());
        assert_eq!(0, counters.reconnects);
        assert_eq!(vec![Duration::from_millis(10)], *sleeps.borrow());
    }

    #[test]
    fn give_up_after_max_attempts() {
        let sleeps = RefCell::new(vec![]);
        let failures = [Failure::Transient; 3];
        let (res, counters) = run(&failures, true, &sleeps);

        let err = res.unwrap_err();
        assert!(matches!(err, Error::ExhaustedError { attempts: 3, .. }));
        assert_eq!(3, err.attempts());
        assert_eq!(3, counters.attempts);
        // sessions are renewed even after the last attempt
        assert_eq!(3, counters.reconnects);
        // but there is no point waiting
        assert_eq!(2, sleeps.borrow().len());
    }

    #[test]
    fn abort_on_fatal_failure() {
        let sleeps = RefCell::new(vec![]);
        let (res, counters) = run(&[Failure::Fatal], true, &sleeps);

        let err = res.unwrap_err();
        assert!(matches!(err, Error::AbortedError { attempt: 1, .. }));
        assert_eq!(Failure::Fatal, err.inner().failure());
        assert_eq!(1, counters.attempts);
        assert_eq!(0, counters.reconnects);
        assert!(sleeps.borrow().is_empty());
    }

    #[test]
    fn stop_when_reconnection_fails() {
        let sleeps = RefCell::new(vec![]);
        let (res, counters) = run(&[Failure::Transient], false, &sleeps);

        assert!(matches!(
            res,
            Err(Error::ReconnectError { attempt: 1, .. })
        ));
        assert_eq!(1, counters.attempts);
        assert_eq!(1, counters.reconnects);
        assert!(sleeps.borrow().is_empty());
    }

    #[test]
    fn backoff_grows_exponentially() {
        let retry = Retry::new(LogContext::new("test")).backoff_unit(Duration::from_secs(1));

        assert_eq!(Duration::from_secs(1), retry.backoff(0));
        assert_eq!(Duration::from_secs(2), retry.backoff(1));
        assert_eq!(Duration::from_secs(4), retry.backoff(2));
    }
}
