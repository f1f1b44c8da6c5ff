//! gol-team - Manage teams and their squads

use clap::{Parser, Subcommand};
use libgolazo::logging::{LogFormat, LoggingConfig};
use libgolazo::service::teams::{NewPlayer, NewTeam, TeamUpdate};
use libgolazo::types::Colors;
use libgolazo::{FootballType, GolazoError, GolazoService, Position, Result, Team, TeamFilter};

#[derive(Parser, Debug)]
#[command(name = "gol-team")]
#[command(version)]
#[command(about = "Manage teams and their squads")]
#[command(long_about = "\
gol-team - Manage teams and their squads

DESCRIPTION:
    gol-team creates teams, keeps their squads and lists them by city,
    category, club or coach. Teams created with a coach profile are coached
    by that user.

COMMANDS:
    create         Create a team
    list           List teams
    show           Show a team and its squad
    update         Change a team's details
    delete         Delete a team
    add-player     Add a player to a squad
    remove-player  Remove a player from a squad

USAGE EXAMPLES:
    # Create a 7-a-side team with two players
    gol-team create \"Los Pumas\" --city Rosario --category senior --type f7 \\
        --colors blue,white --player \"Juan Díaz:1:gk\" --player \"Leo Sosa:10:fw\"

    # Teams of a club as JSON
    gol-team list --club <CLUB_ID> --format json

    # Add a player
    gol-team add-player <TEAM_ID> \"Tomás Ruiz\" --number 5 --position defender

CONFIGURATION:
    Configuration file: ~/.config/golazo/config.toml
    Database location: ~/.local/share/golazo/golazo.db

    City, category and football type default to the [defaults] section.

    Override with environment variables:
        GOLAZO_CONFIG    - Path to config file
        GOLAZO_DB_PATH   - Path to database file

EXIT CODES:
    0 - Success
    1 - Operation failed (e.g. team still plays in a tournament)
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
    /// Create a team
    Create {
        name: String,

        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// Football type: f5, f7, f8 or f11
        #[arg(long = "type")]
        football_type: Option<FootballType>,

        /// Kit colors as PRIMARY[,SECONDARY]
        #[arg(long, value_parser = parse_colors)]
        colors: Option<Colors>,

        /// Club the team belongs to
        #[arg(long)]
        club: Option<String>,

        /// Path or URL of the crest image
        #[arg(long)]
        crest: Option<String>,

        /// Player as NAME:NUMBER[:POSITION], repeatable
        #[arg(long = "player", value_parser = parse_player)]
        players: Vec<NewPlayer>,
    },

    /// List teams
    List {
        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        club: Option<String>,

        /// Coach user id
        #[arg(long)]
        coach: Option<String>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show a team and its squad
    Show {
        team_id: String,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Change a team's details
    Update {
        team_id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long = "type")]
        football_type: Option<FootballType>,

        #[arg(long, value_parser = parse_colors)]
        colors: Option<Colors>,

        #[arg(long, conflicts_with = "no_club")]
        club: Option<String>,

        /// Detach the team from its club
        #[arg(long)]
        no_club: bool,

        #[arg(long, conflicts_with = "no_crest")]
        crest: Option<String>,

        /// Remove the crest
        #[arg(long)]
        no_crest: bool,
    },

    /// Delete a team
    Delete { team_id: String },

    /// Add a player to a squad
    AddPlayer {
        team_id: String,

        name: String,

        /// Jersey number, 1-99
        #[arg(short, long)]
        number: u8,

        /// goalkeeper, defender, midfielder or forward
        #[arg(short, long, default_value = "midfielder")]
        position: Position,
    },

    /// Remove a player from a squad
    RemovePlayer { team_id: String, player_id: String },
}

fn parse_colors(s: &str) -> std::result::Result<Colors, String> {
    let mut parts = s.splitn(2, ',').map(str::trim);
    let primary = parts.next().unwrap_or_default();
    if primary.is_empty() {
        return Err("expected PRIMARY[,SECONDARY]".to_string());
    }
    let secondary = parts
        .next()
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Colors::default().secondary);
    Ok(Colors {
        primary: primary.to_string(),
        secondary,
    })
}

fn parse_player(s: &str) -> std::result::Result<NewPlayer, String> {
    let parts: Vec<&str> = s.split(':').map(str::trim).collect();
    let (name, number, position) = match parts.as_slice() {
        [name, number] => (*name, *number, None),
        [name, number, position] => (*name, *number, Some(*position)),
        _ => return Err("expected NAME:NUMBER[:POSITION]".to_string()),
    };
    let number = number
        .parse::<u8>()
        .map_err(|_| format!("'{}' is not a jersey number", number))?;
    let position = match position {
        Some(p) => p.parse::<Position>().map_err(|e| e.to_string())?,
        None => Position::Midfielder,
    };
    Ok(NewPlayer {
        name: name.to_string(),
        number,
        position,
    })
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
    tracing::debug!(command = ?cli.command, "gol-team");
    let service = GolazoService::new().await?;
    let teams = service.teams();

    match cli.command {
        Commands::Create {
            name,
            city,
            category,
            football_type,
            colors,
            club,
            crest,
            players,
        } => {
            let defaults = &service.config().defaults;
            let team = teams
                .create(NewTeam {
                    name,
                    city: required(city, defaults.city.as_ref(), "city")?,
                    category: required(category, defaults.category.as_ref(), "category")?,
                    football_type: football_type.unwrap_or(defaults.football_type),
                    colors: colors.unwrap_or_default(),
                    club_id: club,
                    crest,
                    players,
                })
                .await?;
            println!("{}", team.id);
        }
        Commands::List {
            city,
            category,
            club,
            coach,
            format,
        } => {
            check_format(&format)?;
            let filter = TeamFilter {
                city,
                category,
                club_id: club,
                coach_id: coach,
            };
            let list = teams.list(&filter).await?;
            if format == "json" {
                print_json(&list)?;
            } else {
                for team in &list {
                    println!(
                        "{} | {} | {} | {} | {}",
                        team.id, team.name, team.city, team.category, team.football_type
                    );
                }
            }
        }
        Commands::Show { team_id, format } => {
            check_format(&format)?;
            let team = teams.get(&team_id).await?;
            if format == "json" {
                print_json(&team)?;
            } else {
                print_team(&team);
            }
        }
        Commands::Update {
            team_id,
            name,
            city,
            category,
            football_type,
            colors,
            club,
            no_club,
            crest,
            no_crest,
        } => {
            let update = TeamUpdate {
                name,
                city,
                category,
                football_type,
                colors,
                club_id: if no_club { Some(None) } else { club.map(Some) },
                crest: if no_crest { Some(None) } else { crest.map(Some) },
            };
            let team = teams.update(&team_id, update).await?;
            print_team(&team);
        }
        Commands::Delete { team_id } => {
            teams.delete(&team_id).await?;
            println!("Deleted team {}", team_id);
        }
        Commands::AddPlayer {
            team_id,
            name,
            number,
            position,
        } => {
            let player = teams
                .add_player(
                    &team_id,
                    NewPlayer {
                        name,
                        number,
                        position,
                    },
                )
                .await?;
            println!("{}", player.id);
        }
        Commands::RemovePlayer { team_id, player_id } => {
            teams.remove_player(&team_id, &player_id).await?;
            println!("Removed player {}", player_id);
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

fn print_team(team: &Team) {
    println!("{} ({})", team.name, team.id);
    println!(
        "  {} | {} | {} | {}/{}",
        team.city, team.category, team.football_type, team.colors.primary, team.colors.secondary
    );
    if let Some(club_id) = &team.club_id {
        println!("  club: {}", club_id);
    }
    if let Some(crest) = &team.crest {
        println!("  crest: {}", crest);
    }
    let mut squad: Vec<_> = team.players.iter().collect();
    squad.sort_by_key(|p| p.number);
    for p in squad {
        println!("  {:>2} {} ({}) {}", p.number, p.name, p.position.as_str(), p.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_player() {
        let p = parse_player("Juan Díaz:1:gk").unwrap();
        assert_eq!(p.name, "Juan Díaz");
        assert_eq!(p.number, 1);
        assert_eq!(p.position, Position::Goalkeeper);

        let p = parse_player("Leo:10").unwrap();
        assert_eq!(p.position, Position::Midfielder);

        assert!(parse_player("Leo").is_err());
        assert!(parse_player("Leo:diez").is_err());
        assert!(parse_player("Leo:10:striker").is_err());
    }

    #[test]
    fn test_parse_colors() {
        let c = parse_colors("blue, white").unwrap();
        assert_eq!(c.primary, "blue");
        assert_eq!(c.secondary, "white");

        let c = parse_colors("red").unwrap();
        assert_eq!(c.secondary, Colors::default().secondary);

        assert!(parse_colors("").is_err());
    }
}
