//! StrongMap CLI
//!
//! Command-line interface for inspecting and editing a dictionary.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;
use strongmap::{Config, StrongMap};
use tracing_subscriber::{fmt, EnvFilter};

/// StrongMap CLI
#[derive(Parser, Debug)]
#[command(name = "strongmap")]
#[command(about = "Persistent file-backed dictionary")]
#[command(version)]
struct Args {
    /// Root directory
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Dictionary name
    #[arg(short, long, default_value = "default")]
    name: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Set a key-value pair (JSON text; bare words are strings)
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Check whether a key is present
    Has {
        /// The key to check
        key: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Print the live record count
    Size,

    /// Print every key and value
    Entries,

    /// Run the smoke test against the `happy-test` dictionary
    Smoke,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,strongmap=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> strongmap::Result<()> {
    let name = match args.command {
        Commands::Smoke => "happy-test".to_string(),
        _ => args.name,
    };
    let config = Config::builder().root(&args.root).name(name).build();
    let mut map: StrongMap<Value, Value> = StrongMap::open(config)?;

    tracing::debug!("dictionary directory: {}", map.dictionary_dir().display());

    match args.command {
        Commands::Set { key, value } => {
            map.set(&parse_arg(&key), &parse_arg(&value))?;
        }
        Commands::Get { key } => match map.get(&parse_arg(&key))? {
            Some(value) => println!("{}", value),
            None => println!("(not found)"),
        },
        Commands::Has { key } => println!("{}", map.has(&parse_arg(&key))?),
        Commands::Del { key } => println!("{}", map.delete(&parse_arg(&key))?),
        Commands::Size => println!("{}", map.size()?),
        Commands::Entries => {
            for entry in map.entries()? {
                let (key, value) = entry?;
                println!("{}\t{}", key, value);
            }
        }
        Commands::Smoke => {
            let (one, two) = (Value::from(1), Value::from(2));
            map.set(&one, &two)?;
            println!("has: {}", map.has(&one)?);
            println!("get: {:?}", map.get(&one)?);
            println!("size: {}", map.size()?);
        }
    }
    Ok(())
}

/// JSON if it parses, otherwise the raw text as a string
fn parse_arg(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
