//! gol-tournament - Run tournaments: draw, results, standings and knockouts
//!
//! Unix-style front end to the tournament service. Listing commands print
//! one record per line, or JSON with `--format json`.

use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use libgolazo::logging::{LogFormat, LoggingConfig};
use libgolazo::service::tournaments::{Advance, GroupTable, MatchResult, NewTournament, Reschedule};
use libgolazo::{
    FootballType, GolazoError, GolazoService, Match, Phase, Result, Tournament, TournamentFilter,
    TournamentFormat, TournamentSettings, TournamentStatus,
};
use std::collections::BTreeMap;

#[derive(Parser, Debug)]
#[command(name = "gol-tournament")]
#[command(version)]
#[command(about = "Run tournaments: draw, results, standings and knockouts")]
#[command(long_about = "\
gol-tournament - Run tournaments: draw, results, standings and knockouts

DESCRIPTION:
    gol-tournament draws tournaments among registered teams, records match
    results, prints standings and moves tournaments from the group stage
    through the knockout rounds to a champion.

    Three modes are supported:
        groups           round robin in groups; the best group leader wins
        knockout         single elimination from the first round
        groups-knockout  group stage, then a knockout among the classified

    A round is closed with `advance` once all its matches are played.
    Results of the open round can be corrected until then.

COMMANDS:
    create      Draw a new tournament
    list        List tournaments
    show        Show a tournament
    start       Start a planned tournament
    matches     List the matches of a tournament
    result      Record the result of a match
    reschedule  Change the date, time or field of a match
    standings   Show the group tables
    advance     Close the current round and draw the next one
    delete      Delete a tournament
    follow      Follow a tournament
    unfollow    Stop following a tournament
    following   List followed tournaments

USAGE EXAMPLES:
    # Draw a groups-knockout tournament with a reproducible seed
    gol-tournament create \"Copa de Barrio\" --mode groups-knockout \\
        --team <ID1> --team <ID2> --team <ID3> --team <ID4> --seed 2024

    # Record a result, with penalties for a level knockout match
    gol-tournament result <MATCH_ID> 2-1
    gol-tournament result <MATCH_ID> 1-1 --penalties 4-3

    # Standings as JSON
    gol-tournament standings <TOURNAMENT_ID> --format json

    # Close the group stage and draw the knockout
    gol-tournament advance <TOURNAMENT_ID>

CONFIGURATION:
    Configuration file: ~/.config/golazo/config.toml
    Database location: ~/.local/share/golazo/golazo.db

    New tournaments take their rules from the [tournament] section.

    Override with environment variables:
        GOLAZO_CONFIG    - Path to config file
        GOLAZO_DB_PATH   - Path to database file

EXIT CODES:
    0 - Success
    1 - Operation failed (round incomplete, tournament finished, ...)
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

#[derive(Subcommand, Debug)]
enum Commands {
    /// Draw a new tournament
    Create {
        name: String,

        /// groups, knockout or groups-knockout
        #[arg(short, long)]
        mode: TournamentFormat,

        /// Team id, repeatable
        #[arg(long = "team", required = true)]
        teams: Vec<String>,

        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// Football type: f5, f7, f8 or f11
        #[arg(long = "type")]
        football_type: Option<FootballType>,

        /// Seed for a reproducible draw
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        rules: Rules,
    },

    /// List tournaments
    List {
        /// planned, in-progress or finished
        #[arg(long)]
        status: Option<TournamentStatus>,

        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show a tournament
    Show {
        tournament_id: String,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Start a planned tournament
    Start { tournament_id: String },

    /// List the matches of a tournament
    Matches {
        tournament_id: String,

        /// Only this round
        #[arg(long)]
        round: Option<u32>,

        /// Only matches still to be played
        #[arg(long)]
        pending: bool,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Record the result of a match
    Result {
        match_id: String,

        /// Score as HOME-AWAY, e.g. 2-1
        #[arg(value_parser = parse_score)]
        score: (u32, u32),

        /// Penalty shoot-out as HOME-AWAY, for a level knockout match
        #[arg(long, value_parser = parse_score)]
        penalties: Option<(u32, u32)>,
    },

    /// Change the date, time or field of a match
    Reschedule {
        match_id: String,

        /// Date as YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Kickoff as HH:MM
        #[arg(long, value_parser = parse_time)]
        time: Option<NaiveTime>,

        #[arg(long)]
        field: Option<String>,
    },

    /// Show the group tables
    Standings {
        tournament_id: String,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Close the current round and draw the next one
    Advance { tournament_id: String },

    /// Delete a tournament
    Delete { tournament_id: String },

    /// Follow a tournament
    Follow { tournament_id: String },

    /// Stop following a tournament
    Unfollow { tournament_id: String },

    /// List followed tournaments
    Following {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

/// Overrides of the configured tournament rules
#[derive(Args, Debug)]
struct Rules {
    #[arg(long)]
    points_win: Option<u8>,

    #[arg(long)]
    points_draw: Option<u8>,

    #[arg(long)]
    points_loss: Option<u8>,

    /// Match length in minutes
    #[arg(long)]
    match_minutes: Option<u16>,

    #[arg(long)]
    teams_per_group: Option<usize>,

    /// Teams per group going through to the knockout
    #[arg(long)]
    classified: Option<usize>,

    #[arg(long)]
    days_between_rounds: Option<u32>,

    /// First match day as YYYY-MM-DD; today when not set
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Kickoff as HH:MM
    #[arg(long, value_parser = parse_time)]
    kickoff: Option<NaiveTime>,
}

impl Rules {
    fn apply(self, mut settings: TournamentSettings) -> TournamentSettings {
        if let Some(v) = self.points_win {
            settings.points_win = v;
        }
        if let Some(v) = self.points_draw {
            settings.points_draw = v;
        }
        if let Some(v) = self.points_loss {
            settings.points_loss = v;
        }
        if let Some(v) = self.match_minutes {
            settings.match_minutes = v;
        }
        if let Some(v) = self.teams_per_group {
            settings.teams_per_group = v;
        }
        if let Some(v) = self.classified {
            settings.classified_per_group = v;
        }
        if let Some(v) = self.days_between_rounds {
            settings.days_between_rounds = v;
        }
        if self.start.is_some() {
            settings.start_date = self.start;
        }
        if let Some(v) = self.kickoff {
            settings.kickoff = v;
        }
        settings
    }
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
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| format!("'{}' is not a time, expected HH:MM", s))
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
    tracing::debug!(command = ?cli.command, "gol-tournament");
    let service = GolazoService::new().await?;
    let tournaments = service.tournaments();

    match cli.command {
        Commands::Create {
            name,
            mode,
            teams,
            city,
            category,
            football_type,
            seed,
            rules,
        } => {
            let config = service.config();
            let tournament = tournaments
                .create(NewTournament {
                    name,
                    city: required(city, config.defaults.city.as_ref(), "city")?,
                    category: required(category, config.defaults.category.as_ref(), "category")?,
                    football_type: football_type.unwrap_or(config.defaults.football_type),
                    format: mode,
                    team_ids: teams,
                    settings: Some(rules.apply(config.tournament.clone())),
                    seed,
                })
                .await?;
            println!("{}", tournament.id);
        }
        Commands::List {
            status,
            city,
            category,
            format,
        } => {
            check_format(&format)?;
            let list = tournaments
                .list(&TournamentFilter {
                    status,
                    city,
                    category,
                })
                .await?;
            print_tournaments(&format, &list)?;
        }
        Commands::Show {
            tournament_id,
            format,
        } => {
            check_format(&format)?;
            let tournament = tournaments.get(&tournament_id).await?;
            if format == "json" {
                print_json(&tournament)?;
            } else {
                let names = service.database().team_names(&tournament.team_ids).await?;
                print_tournament(&tournament, &names);
            }
        }
        Commands::Start { tournament_id } => {
            let tournament = tournaments.start(&tournament_id).await?;
            println!("Started {}", tournament.name);
        }
        Commands::Matches {
            tournament_id,
            round,
            pending,
            format,
        } => {
            check_format(&format)?;
            let mut matches = tournaments.matches(&tournament_id).await?;
            matches.retain(|m| round.map_or(true, |r| m.round == r));
            if pending {
                matches.retain(|m| m.score().is_none());
            }
            if format == "json" {
                print_json(&matches)?;
            } else {
                let names = names_for(&service, &matches).await?;
                for m in &matches {
                    print_match(m, &names);
                }
            }
        }
        Commands::Result {
            match_id,
            score,
            penalties,
        } => {
            let m = tournaments
                .record_result(
                    &match_id,
                    MatchResult {
                        home_goals: score.0,
                        away_goals: score.1,
                        penalties,
                    },
                )
                .await?;
            let names = names_for(&service, std::slice::from_ref(&m)).await?;
            print_match(&m, &names);
        }
        Commands::Reschedule {
            match_id,
            date,
            time,
            field,
        } => {
            if date.is_none() && time.is_none() && field.is_none() {
                return Err(GolazoError::InvalidInput(
                    "nothing to change: give --date, --time or --field".to_string(),
                ));
            }
            let m = tournaments
                .reschedule(
                    &match_id,
                    Reschedule {
                        date,
                        time,
                        field_id: field,
                    },
                )
                .await?;
            let names = names_for(&service, std::slice::from_ref(&m)).await?;
            print_match(&m, &names);
        }
        Commands::Standings {
            tournament_id,
            format,
        } => {
            check_format(&format)?;
            let tables = tournaments.standings(&tournament_id).await?;
            if format == "json" {
                print_json(&tables)?;
            } else {
                print_tables(&tables);
            }
        }
        Commands::Advance { tournament_id } => match tournaments.advance(&tournament_id).await? {
            Advance::NextRound {
                round,
                stage,
                matches,
            } => {
                println!("Round {} ({}) drawn:", round, stage);
                let names = names_for(&service, &matches).await?;
                for m in &matches {
                    print_match(m, &names);
                }
            }
            Advance::Finished { champion_id } => match champion_id {
                Some(id) => {
                    let team = service.teams().get(&id).await?;
                    println!("Champion: {} ({})", team.name, team.id);
                }
                None => println!("Tournament finished without a champion"),
            },
        },
        Commands::Delete { tournament_id } => {
            tournaments.delete(&tournament_id).await?;
            println!("Deleted tournament {}", tournament_id);
        }
        Commands::Follow { tournament_id } => {
            tournaments.follow(&tournament_id).await?;
            println!("Following {}", tournament_id);
        }
        Commands::Unfollow { tournament_id } => {
            if tournaments.unfollow(&tournament_id).await? {
                println!("Unfollowed {}", tournament_id);
            } else {
                println!("Not following {}", tournament_id);
            }
        }
        Commands::Following { format } => {
            check_format(&format)?;
            let list = tournaments.followed().await?;
            print_tournaments(&format, &list)?;
        }
    }

    Ok(())
}

fn required(value: Option<String>, default: Option<&String>, name: &str) -> Result<String> {
    value.or_else(|| default.cloned()).ok_or_else(|| {
        GolazoError::InvalidInput(format!("--{} is required (or set defaults.{})", name, name))
    })
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

/// Team names of everyone playing in `matches`
async fn names_for(service: &GolazoService, matches: &[Match]) -> Result<BTreeMap<String, String>> {
    let ids: Vec<String> = matches
        .iter()
        .flat_map(|m| [m.home_team_id.clone(), m.away_team_id.clone()])
        .collect();
    service.database().team_names(&ids).await
}

fn name<'a>(names: &'a BTreeMap<String, String>, id: &'a str) -> &'a str {
    names.get(id).map(String::as_str).unwrap_or(id)
}

fn print_tournaments(format: &str, list: &[Tournament]) -> Result<()> {
    if format == "json" {
        return print_json(list);
    }
    for t in list {
        println!(
            "{} | {} | {} | {} | {} | {} teams",
            t.id,
            t.name,
            t.format,
            t.status.as_str(),
            t.city,
            t.team_ids.len()
        );
    }
    Ok(())
}

fn print_tournament(t: &Tournament, names: &BTreeMap<String, String>) {
    println!("{} ({})", t.name, t.id);
    println!(
        "  {} | {} | {} | {} | {}",
        t.format,
        t.city,
        t.category,
        t.football_type,
        t.status.as_str()
    );
    if t.status == TournamentStatus::InProgress {
        println!("  phase: {}", t.phase.as_str());
    }
    if let Some(champion) = &t.champion_id {
        println!("  champion: {}", name(names, champion));
    }
    let s = &t.settings;
    println!(
        "  points {}/{}/{}, {} min, {} per group, {} classified, every {} days from {}",
        s.points_win,
        s.points_draw,
        s.points_loss,
        s.match_minutes,
        s.teams_per_group,
        s.classified_per_group,
        s.days_between_rounds,
        s.start_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    for id in &t.team_ids {
        println!("  - {}", name(names, id));
    }
}

fn print_match(m: &Match, names: &BTreeMap<String, String>) {
    let label = match (m.phase, &m.group, &m.stage) {
        (Phase::Groups, Some(group), _) => format!("R{} group {}", m.round, group),
        (_, _, Some(stage)) => format!("R{} {}", m.round, stage),
        _ => format!("R{}", m.round),
    };
    let score = match (m.score(), m.home_penalties, m.away_penalties) {
        (Some((h, a)), Some(ph), Some(pa)) => format!("{}-{} ({}-{} pen)", h, a, ph, pa),
        (Some((h, a)), _, _) => format!("{}-{}", h, a),
        (None, _, _) => m.status.as_str().to_string(),
    };
    let when = match (m.date, m.time) {
        (Some(d), Some(t)) => format!("{} {}", d, t.format("%H:%M")),
        (Some(d), None) => d.to_string(),
        _ => "-".to_string(),
    };
    println!(
        "{} | {} | {} vs {} | {} | {}",
        m.id,
        label,
        name(names, &m.home_team_id),
        name(names, &m.away_team_id),
        score,
        when
    );
}

fn print_tables(tables: &[GroupTable]) {
    for table in tables {
        if let Some(group) = &table.group {
            println!("Group {}", group);
        }
        println!(
            "{:>2}  {:<24} {:>2} {:>2} {:>2} {:>2} {:>3} {:>3} {:>4} {:>3}",
            "#", "Team", "P", "W", "D", "L", "GF", "GA", "GD", "Pts"
        );
        for (i, row) in table.rows.iter().enumerate() {
            println!(
                "{:>2}  {:<24} {:>2} {:>2} {:>2} {:>2} {:>3} {:>3} {:>+4} {:>3}",
                i + 1,
                row.team_name,
                row.played,
                row.won,
                row.drawn,
                row.lost,
                row.goals_for,
                row.goals_against,
                row.goal_difference(),
                row.points
            );
        }
    }
}
