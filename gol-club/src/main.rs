//! gol-club - Manage clubs and football fields

use clap::{Parser, Subcommand};
use libgolazo::logging::{LogFormat, LoggingConfig};
use libgolazo::service::clubs::{ClubUpdate, NewClub, NewField};
use libgolazo::types::{Coordinates, Surface};
use libgolazo::{Club, Config, Field, FootballType, GolazoError, GolazoService, Result};

#[derive(Parser, Debug)]
#[command(name = "gol-club")]
#[command(version)]
#[command(about = "Manage clubs and football fields")]
#[command(long_about = "\
gol-club - Manage clubs and football fields

DESCRIPTION:
    gol-club registers clubs and the fields (campos) matches are played on.
    A club's categories are the categories of the teams that belong to it.

COMMANDS:
    create        Register a club
    list          List clubs
    show          Show a club and its teams by category
    update        Change a club's details
    delete        Delete a club (its teams are kept)
    add-field     Register a football field
    fields        List football fields
    delete-field  Delete a football field

USAGE EXAMPLES:
    # Register a club
    gol-club create \"Club Atlético Pocitos\" --address \"Av. Brasil 2500\" --city Montevideo

    # List clubs of a city as JSON
    gol-club list --city Montevideo --format json

    # Register a 5-a-side artificial pitch with its location
    gol-club add-field \"Cancha 1\" --address \"Av. Brasil 2500\" --type f5 \\
        --surface artificial --lat -34.91 --lng -56.15

CONFIGURATION:
    Configuration file: ~/.config/golazo/config.toml
    Database location: ~/.local/share/golazo/golazo.db

    Override with environment variables:
        GOLAZO_CONFIG    - Path to config file
        GOLAZO_DB_PATH   - Path to database file

EXIT CODES:
    0 - Success
    1 - Operation failed
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
    /// Register a club
    Create {
        name: String,

        #[arg(long)]
        address: String,

        /// City; defaults to the configured city
        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        email: Option<String>,
    },

    /// List clubs
    List {
        #[arg(long)]
        city: Option<String>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show a club
    Show {
        club_id: String,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Change a club's details
    Update {
        club_id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        city: Option<String>,

        /// New phone; an empty value removes it
        #[arg(long)]
        phone: Option<String>,

        /// New email; an empty value removes it
        #[arg(long)]
        email: Option<String>,
    },

    /// Delete a club
    Delete { club_id: String },

    /// Register a football field
    AddField {
        name: String,

        #[arg(long)]
        address: String,

        /// City; defaults to the configured city
        #[arg(long)]
        city: Option<String>,

        /// Football type: f5, f7, f8 or f11
        #[arg(long = "type")]
        football_type: Option<FootballType>,

        /// natural, artificial, hybrid or indoor
        #[arg(long, default_value = "natural")]
        surface: Surface,

        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,
    },

    /// List football fields
    Fields {
        #[arg(long)]
        city: Option<String>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Delete a football field
    DeleteField { field_id: String },
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
    tracing::debug!(command = ?cli.command, "gol-club");
    let service = GolazoService::new().await?;
    let clubs = service.clubs();

    match cli.command {
        Commands::Create {
            name,
            address,
            city,
            phone,
            email,
        } => {
            let city = city_or_default(city, service.config())?;
            let club = clubs
                .create(NewClub {
                    name,
                    address,
                    city,
                    phone,
                    email,
                })
                .await?;
            println!("{}", club.id);
        }
        Commands::List { city, format } => {
            check_format(&format)?;
            let list = clubs.list(city.as_deref()).await?;
            if format == "json" {
                print_json(&list)?;
            } else {
                for club in &list {
                    println!(
                        "{} | {} | {} | {} team(s)",
                        club.id,
                        club.name,
                        club.location.city,
                        club.categories.values().map(Vec::len).sum::<usize>()
                    );
                }
            }
        }
        Commands::Show { club_id, format } => {
            check_format(&format)?;
            let club = clubs.get(&club_id).await?;
            if format == "json" {
                print_json(&club)?;
            } else {
                print_club(&club);
            }
        }
        Commands::Update {
            club_id,
            name,
            address,
            city,
            phone,
            email,
        } => {
            let club = clubs
                .update(
                    &club_id,
                    ClubUpdate {
                        name,
                        address,
                        city,
                        phone,
                        email,
                    },
                )
                .await?;
            print_club(&club);
        }
        Commands::Delete { club_id } => {
            clubs.delete(&club_id).await?;
            println!("Deleted club {}", club_id);
        }
        Commands::AddField {
            name,
            address,
            city,
            football_type,
            surface,
            lat,
            lng,
        } => {
            let city = city_or_default(city, service.config())?;
            let coordinates = match (lat, lng) {
                (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
                _ => None,
            };
            let field = clubs
                .add_field(NewField {
                    name,
                    address,
                    city,
                    football_type: football_type
                        .unwrap_or(service.config().defaults.football_type),
                    surface,
                    coordinates,
                })
                .await?;
            println!("{}", field.id);
        }
        Commands::Fields { city, format } => {
            check_format(&format)?;
            let fields = clubs.list_fields(city.as_deref()).await?;
            if format == "json" {
                print_json(&fields)?;
            } else {
                for field in &fields {
                    print_field(field);
                }
            }
        }
        Commands::DeleteField { field_id } => {
            clubs.delete_field(&field_id).await?;
            println!("Deleted field {}", field_id);
        }
    }

    Ok(())
}

fn city_or_default(city: Option<String>, config: &Config) -> Result<String> {
    city.or_else(|| config.defaults.city.clone()).ok_or_else(|| {
        GolazoError::InvalidInput("--city is required (or set defaults.city)".to_string())
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

fn print_club(club: &Club) {
    println!("{} ({})", club.name, club.id);
    println!("  {}, {}", club.location.address, club.location.city);
    if let Some(phone) = &club.phone {
        println!("  phone: {}", phone);
    }
    if let Some(email) = &club.email {
        println!("  email: {}", email);
    }
    for (category, teams) in &club.categories {
        println!("  {}: {} team(s)", category, teams.len());
    }
}

fn print_field(field: &Field) {
    let location = field
        .coordinates
        .map(|c| format!(" @ {:.5},{:.5}", c.lat, c.lng))
        .unwrap_or_default();
    println!(
        "{} | {} | {} | {} {}{}",
        field.id,
        field.name,
        field.city,
        field.football_type,
        field.surface.as_str(),
        location
    );
}
