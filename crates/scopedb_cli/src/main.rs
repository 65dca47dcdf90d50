//! Command-line entry point.
//!
//! # Responsibility
//! - Parse store/logging options and dispatch one command.
//! - Host the illustrative walkthrough so the library stays free of sample
//!   transactions.

mod demo;

use clap::{Parser, Subcommand};
use scopedb_core::{
    default_log_level, init_logging_with, BlogService, Engine, LoggingConfig, StoreConfig,
    MEMORY_LOCATION,
};
use std::error::Error;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "scopedb", version, about = "Transactional scopes over a sample blog store")]
struct Cli {
    /// Store location: `:memory:`, `sqlite:///<path>` or a file path.
    #[arg(long, default_value = MEMORY_LOCATION)]
    db: String,

    /// Log every SQL statement at debug level.
    #[arg(long)]
    echo: bool,

    /// Absolute directory for rolling log files. Logging is off when unset.
    #[arg(long)]
    log_dir: Option<String>,

    /// trace|debug|info|warn|error
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the sample session walkthrough.
    Demo,
    /// Print every user with its addresses.
    Users,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        let mut logging = LoggingConfig::new(level, log_dir);
        logging.mirror_to_stderr = true;
        init_logging_with(&logging)?;
    }

    let config = StoreConfig::parse(&cli.db)?.echo(cli.echo);
    let engine = Engine::with_config(config)?;
    log::info!(
        "event=cli_start module=cli status=ok command={:?} version={}",
        cli.command,
        scopedb_core::core_version()
    );

    match cli.command {
        Command::Demo => demo::run(&engine)?,
        Command::Users => print_directory(&BlogService::new(&engine))?,
    }
    Ok(())
}

fn print_directory(service: &BlogService<'_>) -> Result<(), Box<dyn Error>> {
    for entry in service.directory()? {
        println!("{}", entry.user);
        for address in &entry.addresses {
            println!("  {address}");
        }
    }
    Ok(())
}
