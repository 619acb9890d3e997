//! Forgets every message migrated to the given destination account,
//! so that the next migration transfers them again.

use clap::Parser;
use env_logger::Env;
use log::{error, info};
use std::{path::PathBuf, process};

use imap_migrate::{
    migration::{format_error_chain, store::DEFAULT_STORE_PATH},
    DedupStore,
};

#[derive(Debug, Parser)]
#[command(version, about = "Purge the dedup records of a destination account")]
struct Args {
    /// Email of the destination account.
    dest_email: String,

    /// Path of the SQLite dedup store.
    #[arg(long, default_value = DEFAULT_STORE_PATH)]
    database: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let purge = DedupStore::new(&args.database)
        .and_then(|store| store.purge_by_destination(&args.dest_email));

    match purge {
        Ok(purge) => info!(
            "deleted {} record(s) of {}",
            purge.before - purge.after,
            args.dest_email
        ),
        Err(err) => {
            error!("{}", format_error_chain(&err));
            process::exit(1);
        }
    }
}
