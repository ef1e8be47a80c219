//! `teicorpus` command-line entry point.
//!
//! # Responsibility
//! - Parse arguments and bootstrap logging.
//! - Call the core batch drivers and print their summaries.
//!
//! Usage:
//!   teicorpus assign-ids tei-xml tei-xml-ids
//!   teicorpus build tei-xml-ids --db tei_database.db --batch-size 10
//!   teicorpus stats --db tei_database.db --json

use clap::{Parser, Subcommand};
use log::error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use teicorpus_core::db::open_db;
use teicorpus_core::{
    assign_ids_in_folder, default_log_level, ingest_folder, init_logging, CorpusRepository,
    CorpusStats, IngestOptions, LogTarget, SqliteCorpusRepository, DEFAULT_BATCH_SIZE,
    DEFAULT_WINDOW,
};

const DEFAULT_DB_PATH: &str = "tei_database.db";

/// Convert TEI corpora into a relational SQLite store
#[derive(Parser, Debug)]
#[command(name = "teicorpus", version)]
struct Cli {
    /// Log level (trace|debug|info|warn|error); defaults by build mode
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Directory for rolling log files; logs go to stderr when omitted
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stamp missing xml:id values on <w> tokens of every *.xml / *.tei file
    AssignIds {
        input_dir: PathBuf,
        output_dir: PathBuf,
    },
    /// Ingest every *.tei.xml file of a folder into the database
    Build {
        input_dir: PathBuf,

        #[arg(long, default_value = DEFAULT_DB_PATH)]
        db: PathBuf,

        /// Documents committed per transaction
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Context words kept on each side of an occurrence
        #[arg(long, default_value_t = DEFAULT_WINDOW)]
        window: usize,

        /// Skip WAL/ANALYZE maintenance after ingest
        #[arg(long)]
        no_optimize: bool,

        /// Print the full summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print row counts of an existing database
    Stats {
        #[arg(long, default_value = DEFAULT_DB_PATH)]
        db: PathBuf,

        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = setup_logging(cli.log_level.as_deref(), cli.log_dir.as_deref()) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(level: Option<&str>, log_dir: Option<&Path>) -> Result<(), String> {
    let target = match log_dir {
        Some(dir) => LogTarget::Directory(
            absolute(dir).map_err(|err| format!("cannot resolve log directory: {err}"))?,
        ),
        None => LogTarget::Stderr,
    };
    init_logging(level.unwrap_or_else(|| default_log_level()), target)
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::AssignIds {
            input_dir,
            output_dir,
        } => {
            let summary = assign_ids_in_folder(&input_dir, &output_dir)?;
            println!(
                "Processed {} file(s): {} token(s), {} new xml:id value(s), {} failure(s)",
                summary.files,
                summary.tokens,
                summary.assigned,
                summary.failed.len()
            );
            for failure in &summary.failed {
                println!("  failed: {} ({})", failure.name, failure.error);
            }
            println!("Output saved to: {}", output_dir.display());
        }
        Command::Build {
            input_dir,
            db,
            batch_size,
            window,
            no_optimize,
            json,
        } => {
            let options = IngestOptions {
                batch_size,
                window,
                optimize: !no_optimize,
            };
            let mut conn = open_db(&db)?;
            let summary = ingest_folder(&mut conn, &input_dir, &options)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }
            println!(
                "Ingested {}/{} document(s) in {} batch(es), {} diagnostic(s)",
                summary.ingested.len(),
                summary.documents,
                summary.batches,
                summary.diagnostics()
            );
            for failure in &summary.failed {
                println!("  failed: {} ({})", failure.name, failure.error);
            }
            println!("Database created: {}", db.display());
            print_stats(&summary.stats);
        }
        Command::Stats { db, json } => {
            let conn = open_db(&db)?;
            let stats = SqliteCorpusRepository::try_new(&conn)?.corpus_stats()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&stats);
            }
        }
    }
    Ok(())
}

fn print_stats(stats: &CorpusStats) {
    println!("Database statistics:");
    println!("  Texts: {}", stats.texts);
    println!("  Words: {}", stats.words);
    println!("  Concepts: {}", stats.concepts);
    println!("  Phrasemes: {}", stats.phrasemes);
    println!("  Phraseme links: {}", stats.phraseme_words);
}
