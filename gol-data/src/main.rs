//! gol-data - Move, check and repair Golazo data
//!
//! Exports the whole database as one JSON snapshot, imports snapshots from
//! other devices, and checks the storage for damage.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use libgolazo::logging::{LogFormat, LoggingConfig};
use libgolazo::service::diagnostics::DiagnosticReport;
use libgolazo::service::snapshot::Snapshot;
use libgolazo::{GolazoError, GolazoService};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gol-data")]
#[command(version)]
#[command(about = "Move, check and repair Golazo data")]
#[command(long_about = "\
gol-data - Move, check and repair Golazo data

DESCRIPTION:
    gol-data writes every club, field, team, tournament, match, friendly
    and user to a single JSON snapshot, and loads such snapshots back.
    Import runs in one transaction: it either loads everything or nothing.
    Records that already exist are skipped unless --replace is given,
    which overwrites them in place and keeps local records pointing at them.

    doctor checks the database file, foreign keys, stored JSON values and
    tournament entries of deleted teams. With --fix it resets unreadable
    values to their defaults and drops the dangling entries.

COMMANDS:
    export   Write a snapshot of the database
    import   Load a snapshot
    doctor   Check the database for problems
    stats    Count the rows of each table

USAGE EXAMPLES:
    # Back up
    gol-data export --output golazo-backup.json

    # Move to another machine
    gol-data export | ssh other gol-data import -

    # Check and repair
    gol-data doctor --fix

CONFIGURATION:
    Configuration file: ~/.config/golazo/config.toml
    Database location: ~/.local/share/golazo/golazo.db

    Override with environment variables:
        GOLAZO_CONFIG    - Path to config file
        GOLAZO_DB_PATH   - Path to database file

EXIT CODES:
    0 - Success (doctor: no problems left)
    1 - Operation failed, or doctor found problems
    2 - Configuration error
    3 - Invalid input (e.g. unreadable snapshot)
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format: text, json or pretty
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a snapshot of the database
    Export {
        /// File to write; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// Load a snapshot
    Import {
        /// Snapshot file, or - for stdin
        file: String,

        /// Overwrite records that already exist
        #[arg(long)]
        replace: bool,
    },

    /// Check the database for problems
    Doctor {
        /// Repair what can be repaired
        #[arg(long)]
        fix: bool,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Count the rows of each table
    Stats {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::for_cli(cli.log_format, cli.verbose).init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<GolazoError>()
            .map(GolazoError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    tracing::debug!(command = ?cli.command, "gol-data");
    let service = GolazoService::new().await?;

    match cli.command {
        Commands::Export { output, compact } => {
            let snapshot = service.data().export().await?;
            let json = if compact {
                serde_json::to_string(&snapshot)?
            } else {
                serde_json::to_string_pretty(&snapshot)?
            };
            match output {
                Some(path) => {
                    std::fs::write(&path, json + "\n")
                        .with_context(|| format!("cannot write {}", path.display()))?;
                    eprintln!(
                        "Exported {} team(s), {} tournament(s), {} friendly(ies) to {}",
                        snapshot.equipos.len(),
                        snapshot.torneos.len(),
                        snapshot.amistosos.len(),
                        path.display()
                    );
                }
                None => println!("{}", json),
            }
        }
        Commands::Import { file, replace } => {
            let raw = read_input(&file)?;
            let snapshot: Snapshot = serde_json::from_str(&raw).map_err(|e| {
                GolazoError::InvalidInput(format!("{} is not a Golazo snapshot: {}", file, e))
            })?;
            let summary = service.data().import(&snapshot, replace).await?;
            println!(
                "Imported {}, replaced {}, skipped {}",
                summary.imported, summary.replaced, summary.skipped
            );
        }
        Commands::Doctor { fix, format } => {
            check_format(&format)?;
            let diagnostics = service.diagnostics();
            let report = diagnostics.check().await?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            if report.is_healthy() {
                return Ok(());
            }

            if !fix {
                bail!(
                    "{} problem(s) found (run with --fix to repair)",
                    report.problem_count()
                );
            }
            let repaired = diagnostics.repair(&report).await?;
            eprintln!(
                "Reset {} unreadable value(s), removed {} dangling tournament entr(ies)",
                repaired.json_reset, repaired.dangling_removed
            );

            let after = diagnostics.check().await?;
            if !after.is_healthy() {
                bail!(
                    "{} problem(s) remain that cannot be repaired automatically",
                    after.problem_count()
                );
            }
        }
        Commands::Stats { format } => {
            check_format(&format)?;
            let counts = service.data().counts().await?;
            if format == "json" {
                let map: serde_json::Map<String, serde_json::Value> = counts
                    .into_iter()
                    .map(|(table, n)| (table.to_string(), n.into()))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else {
                for (table, n) in counts {
                    println!("{:<12} {}", table, n);
                }
            }
        }
    }

    Ok(())
}

fn read_input(file: &str) -> Result<String> {
    if file == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("cannot read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(file).with_context(|| format!("cannot read {}", file))
}

fn check_format(format: &str) -> Result<()> {
    if format != "text" && format != "json" {
        return Err(GolazoError::InvalidInput(format!(
            "Invalid format '{}'. Must be 'text' or 'json'",
            format
        ))
        .into());
    }
    Ok(())
}

fn print_report(report: &DiagnosticReport) {
    if report.is_healthy() {
        println!("No problems found");
        return;
    }
    for line in &report.integrity {
        println!("integrity: {}", line);
    }
    for line in &report.foreign_keys {
        println!("foreign key: {}", line);
    }
    for issue in &report.corrupt_json {
        println!(
            "unreadable {}.{} in row {}: {}",
            issue.table, issue.column, issue.id, issue.error
        );
    }
    for d in &report.dangling_teams {
        println!(
            "tournament {} lists deleted team {}",
            d.tournament_id, d.team_id
        );
    }
}
