//! linekv CLI
//!
//! Command-line interface for a linekv store in the working directory.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use linekv::{Config, DuplicateKeys, Store, StoreError};
use tracing_subscriber::{fmt, EnvFilter};

/// linekv CLI
#[derive(Parser, Debug)]
#[command(name = "linekv")]
#[command(about = "Crash-safe single-file key-value store")]
#[command(version)]
struct Args {
    /// Store file (staging and lock files are created next to it)
    #[arg(short, long, default_value = "database")]
    store: String,

    /// Keep earlier records for a key instead of replacing them
    #[arg(long)]
    append_duplicates: bool,

    /// Give up waiting for the writer lock after this many milliseconds
    #[arg(long)]
    lock_timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        #[arg(allow_hyphen_values = true)]
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        #[arg(allow_hyphen_values = true)]
        key: String,

        /// The value to set
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
}

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries values only
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut builder = Config::builder().store_path(&args.store);
    if args.append_duplicates {
        builder = builder.duplicate_keys(DuplicateKeys::Append);
    }
    if let Some(ms) = args.lock_timeout_ms {
        builder = builder.lock_timeout(Duration::from_millis(ms));
    }
    let store = Store::new(builder.build());

    match run(&store, args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, store = %store.path().display(), "operation failed");
            if e.is_committed() {
                eprintln!("Record was written, but: {}", e);
            } else {
                eprintln!("Error: {}", e);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(store: &Store, command: Commands) -> Result<(), StoreError> {
    match command {
        Commands::Get { key } => match store.get(&key)? {
            Some(value) => println!("{}", value),
            None => println!("Key is not found in the database"),
        },
        Commands::Set { key, value } => {
            store.set(&key, &value)?;
            println!("New record has been inserted in the database.");
        }
    }
    Ok(())
}
