//! gol-friendly - Arrange friendly matches between teams

use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use libgolazo::logging::{LogFormat, LoggingConfig};
use libgolazo::service::friendlies::FriendlyDetails;
use libgolazo::{Friendly, FriendlyStatus, GolazoError, GolazoService, Result};
use std::collections::BTreeMap;

#[derive(Parser, Debug)]
#[command(name = "gol-friendly")]
#[command(version)]
#[command(about = "Arrange friendly matches between teams")]
#[command(long_about = "\
gol-friendly - Arrange friendly matches between teams

DESCRIPTION:
    gol-friendly publishes open slots a team is available to play, lets
    other teams request them, and sends direct proposals. The invited team
    accepts or rejects; either team can cancel until the match is played.

    Rejecting a request against a published slot opens the slot again.
    Rejecting a direct proposal cancels it.

COMMANDS:
    available  Publish an open slot for a team
    propose    Propose a friendly to another team
    request    Ask to play a published slot
    accept     Accept a proposal addressed to your team
    reject     Reject a proposal addressed to your team
    cancel     Call off a friendly
    result     Record the score of a confirmed friendly
    list       List friendlies
    show       Show one friendly

USAGE EXAMPLES:
    # Halcones can play Saturday afternoon
    gol-friendly available <TEAM_ID> --location \"Parque Norte\" --date 2025-05-10 --time 16:00

    # Cóndores ask for that slot, Halcones accept
    gol-friendly request <FRIENDLY_ID> --team <CONDORES_ID>
    gol-friendly accept <FRIENDLY_ID> --team <HALCONES_ID>

    # Open slots as JSON
    gol-friendly list --status available --format json

CONFIGURATION:
    Configuration file: ~/.config/golazo/config.toml
    Database location: ~/.local/share/golazo/golazo.db

    Override with environment variables:
        GOLAZO_CONFIG    - Path to config file
        GOLAZO_DB_PATH   - Path to database file

EXIT CODES:
    0 - Success
    1 - Operation not allowed in the friendly's current state
    2 - Configuration or permission error
    3 - Invalid input or not found
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

/// Where and when
#[derive(Args, Debug)]
struct Details {
    /// Address or name of the place; defaults to the field's name
    #[arg(long)]
    location: Option<String>,

    /// Registered field id
    #[arg(long)]
    field: Option<String>,

    /// Match day, YYYY-MM-DD
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Kickoff, HH:MM
    #[arg(long, value_parser = parse_time)]
    time: Option<NaiveTime>,

    #[arg(long)]
    notes: Option<String>,
}

impl From<Details> for FriendlyDetails {
    fn from(d: Details) -> Self {
        FriendlyDetails {
            location: d.location.unwrap_or_default(),
            field_id: d.field,
            date: d.date,
            time: d.time,
            notes: d.notes,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Publish an open slot for a team
    Available {
        team_id: String,

        #[command(flatten)]
        details: Details,
    },

    /// Propose a friendly to another team
    Propose {
        /// Proposing team, plays at home
        from_team_id: String,

        /// Invited team
        to_team_id: String,

        #[command(flatten)]
        details: Details,
    },

    /// Ask to play a published slot
    Request {
        friendly_id: String,

        /// Team asking to play
        #[arg(long)]
        team: String,
    },

    /// Accept a proposal addressed to your team
    Accept {
        friendly_id: String,

        #[arg(long)]
        team: String,
    },

    /// Reject a proposal addressed to your team
    Reject {
        friendly_id: String,

        #[arg(long)]
        team: String,
    },

    /// Call off a friendly
    Cancel {
        friendly_id: String,

        #[arg(long)]
        team: String,
    },

    /// Record the score of a confirmed friendly, as HOME-AWAY
    Result {
        friendly_id: String,

        #[arg(value_parser = parse_score)]
        score: (u32, u32),
    },

    /// List friendlies
    List {
        /// available, proposed, confirmed, finished or cancelled
        #[arg(long)]
        status: Option<FriendlyStatus>,

        /// Only friendlies involving this team
        #[arg(long)]
        team: Option<String>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show one friendly
    Show {
        friendly_id: String,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn parse_score(s: &str) -> std::result::Result<(u32, u32), String> {
    let (home, away) = s
        .split_once('-')
        .ok_or_else(|| format!("'{}' is not a score, expected HOME-AWAY", s))?;
    let goals = |g: &str| {
        g.trim()
            .parse::<u32>()
            .map_err(|_| format!("'{}' is not a number of goals", g))
    };
    Ok((goals(home)?, goals(away)?))
}

fn parse_time(s: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| format!("'{}' is not a time, expected HH:MM", s))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::for_cli(cli.log_format, cli.verbose).init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    tracing::debug!(command = ?cli.command, "gol-friendly");
    let service = GolazoService::new().await?;
    let friendlies = service.friendlies();

    let changed = match cli.command {
        Commands::Available { team_id, details } => {
            let friendly = friendlies
                .publish_availability(&team_id, details.into())
                .await?;
            println!("{}", friendly.id);
            return Ok(());
        }
        Commands::Propose {
            from_team_id,
            to_team_id,
            details,
        } => {
            let friendly = friendlies
                .propose(&from_team_id, &to_team_id, details.into())
                .await?;
            println!("{}", friendly.id);
            return Ok(());
        }
        Commands::Request { friendly_id, team } => friendlies.request(&friendly_id, &team).await?,
        Commands::Accept { friendly_id, team } => friendlies.accept(&friendly_id, &team).await?,
        Commands::Reject { friendly_id, team } => friendlies.reject(&friendly_id, &team).await?,
        Commands::Cancel { friendly_id, team } => friendlies.cancel(&friendly_id, &team).await?,
        Commands::Result { friendly_id, score } => {
            friendlies
                .record_result(&friendly_id, score.0, score.1)
                .await?
        }
        Commands::List {
            status,
            team,
            format,
        } => {
            check_format(&format)?;
            let list = friendlies.list(status, team.as_deref()).await?;
            if format == "json" {
                print_json(&list)?;
            } else {
                let names = names_for(&service, &list).await?;
                for f in &list {
                    print_friendly(f, &names);
                }
            }
            return Ok(());
        }
        Commands::Show {
            friendly_id,
            format,
        } => {
            check_format(&format)?;
            let friendly = friendlies.get(&friendly_id).await?;
            if format == "json" {
                return print_json(&friendly);
            }
            friendly
        }
    };

    let names = names_for(&service, std::slice::from_ref(&changed)).await?;
    print_friendly(&changed, &names);
    if let Some(notes) = &changed.notes {
        println!("  notes: {}", notes);
    }
    Ok(())
}

fn check_format(format: &str) -> Result<()> {
    if format != "text" && format != "json" {
        return Err(GolazoError::InvalidInput(format!(
            "Invalid format '{}'. Must be 'text' or 'json'",
            format
        )));
    }
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| GolazoError::InvalidInput(format!("cannot encode output: {}", e)))?;
    println!("{}", json);
    Ok(())
}

async fn names_for(service: &GolazoService, list: &[Friendly]) -> Result<BTreeMap<String, String>> {
    let ids: Vec<String> = list
        .iter()
        .flat_map(|f| std::iter::once(f.home_team_id.clone()).chain(f.away_team_id.clone()))
        .collect();
    service.database().team_names(&ids).await
}

fn print_friendly(f: &Friendly, names: &BTreeMap<String, String>) {
    let name = |id: &str| names.get(id).cloned().unwrap_or_else(|| id.to_string());
    let away = f.away_team_id.as_deref().map(name).unwrap_or_else(|| "?".to_string());
    let when = match (f.date, f.time) {
        (Some(d), Some(t)) => format!("{} {}", d, t.format("%H:%M")),
        (Some(d), None) => d.to_string(),
        _ => "date to be agreed".to_string(),
    };
    let score = match (f.home_goals, f.away_goals) {
        (Some(h), Some(a)) => format!("{}-{}", h, a),
        _ => f.status.to_string(),
    };
    println!(
        "{} | {} vs {} | {} | {} | {}",
        f.id,
        name(&f.home_team_id),
        away,
        score,
        f.location,
        when
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("3-1"), Ok((3, 1)));
        assert_eq!(parse_score(" 0 - 0 "), Ok((0, 0)));
        assert!(parse_score("3").is_err());
        assert!(parse_score("tres-uno").is_err());
    }

    #[test]
    fn test_details_into_request() {
        let details = Details {
            location: None,
            field: Some("f1".to_string()),
            date: NaiveDate::from_ymd_opt(2025, 5, 10),
            time: parse_time("16:00").ok(),
            notes: Some("bring bibs".to_string()),
        };
        let request: FriendlyDetails = details.into();
        assert_eq!(request.location, "");
        assert_eq!(request.field_id.as_deref(), Some("f1"));
        assert_eq!(request.time, NaiveTime::from_hms_opt(16, 0, 0));
    }
}
