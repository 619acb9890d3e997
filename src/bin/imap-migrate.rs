//! Migrates every account pair of the config file, one after the
//! other.

use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use std::{path::PathBuf, process, slice, time::Duration};

use imap_migrate::{
    account::DEFAULT_CONFIG_PATH,
    migration::{format_error_chain, retry::DEFAULT_MAX_ATTEMPTS, store::DEFAULT_STORE_PATH},
    session::imap::session::{DEFAULT_PORT, DEFAULT_TIMEOUT},
    migrate_all, AccountLogger, AccountsConfig, DedupStore, ImapConnector, Migration,
};

#[derive(Debug, Parser)]
#[command(version, about = "Idempotent IMAP to IMAP mailbox migration")]
struct Args {
    /// Path of the JSON file listing the account pairs.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Path of the SQLite dedup store.
    #[arg(long, default_value = DEFAULT_STORE_PATH)]
    database: PathBuf,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Upgrade a plain connection with STARTTLS instead of using
    /// implicit TLS.
    #[arg(long)]
    starttls: bool,

    /// Accept invalid certificates and host names.
    #[arg(long)]
    insecure: bool,

    /// Maximum number of attempts of every operation.
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: usize,

    /// Connect and I/O timeout, in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,

    /// Directory receiving one log file per source account.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    let inner = env_logger::Builder::from_env(Env::default().default_filter_or("info")).build();
    let logger = match AccountLogger::new(inner, args.log_dir.clone()).init() {
        Ok(logger) => logger,
        Err(err) => {
            eprintln!("cannot init logger: {}", err);
            process::exit(1);
        }
    };

    if let Err(err) = run(args, logger) {
        error!("{}", err);
        process::exit(1);
    }
}

fn run(args: Args, logger: &AccountLogger) -> Result<(), String> {
    let pairs = AccountsConfig::from_path(&args.config)
        .map_err(|err| format_error_chain(&err))?
        .into_pairs();
    let store = DedupStore::new(&args.database).map_err(|err| format_error_chain(&err))?;
    let connector = ImapConnector::default()
        .port(args.port)
        .starttls(args.starttls)
        .insecure(args.insecure)
        .timeout(Duration::from_secs(args.timeout));
    let migration = Migration::new(&connector, &store).max_attempts(args.max_attempts);

    info!("migrating {} account pair(s)", pairs.len());
    let mut failed = 0;
    for pair in &pairs {
        if let Err(err) = logger.switch_account(&pair.source.username) {
            warn!("cannot open log file of {}: {}", pair.source.username, err);
        }
        failed += migrate_all(&migration, slice::from_ref(pair))
            .iter()
            .filter(|res| res.is_err())
            .count();
        logger.close_account();
    }

    if failed > 0 {
        return Err(format!("{}/{} account pair(s) failed", failed, pairs.len()));
    }

    info!("all account pairs migrated");
    Ok(())
}
