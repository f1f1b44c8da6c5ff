//! gol-setup - Create the Golazo configuration and local profile
//!
//! Writes the configuration file the other `gol-*` tools read, and manages
//! the local user they act as.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use libgolazo::config::{resolve_config_path, resolve_db_path, DatabaseConfig, ProfileConfig};
use libgolazo::logging::{LogFormat, LoggingConfig};
use libgolazo::service::users::PreferencesUpdate;
use libgolazo::{Config, FootballType, GolazoError, GolazoService, Role, User};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "gol-setup")]
#[command(version)]
#[command(about = "Create the Golazo configuration and local profile")]
#[command(long_about = "\
gol-setup - Create the Golazo configuration and local profile

DESCRIPTION:
    gol-setup writes the configuration file shared by every gol-* tool and
    creates the local user profile they act as. With a coach profile only
    coaches can change data; without a profile every change is allowed.

COMMANDS:
    init         Write a new configuration file
    show         Show the configuration and active profile
    profile      Create a profile or switch to an existing user
    preferences  Change the active user's preferences

USAGE EXAMPLES:
    # Configure with a coach profile
    gol-setup init --name \"Ana Pérez\" --role coach --city Rosario

    # Keep the database somewhere else
    gol-setup init --db ~/futbol/golazo.db

    # Switch to another local user
    gol-setup profile --user <USER_ID>

    # Turn notifications off
    gol-setup preferences --notifications off

CONFIGURATION:
    Configuration file: ~/.config/golazo/config.toml
    Database location: ~/.local/share/golazo/golazo.db

    Override with environment variables:
        GOLAZO_CONFIG    - Path to config file
        GOLAZO_DB_PATH   - Path to database file

EXIT CODES:
    0 - Success
    1 - Operation failed
    2 - Configuration error
    3 - Invalid input
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
    /// Write a new configuration file
    Init {
        /// Database file path
        #[arg(long)]
        db: Option<String>,

        /// Default city for new teams and tournaments
        #[arg(long)]
        city: Option<String>,

        /// Default category, e.g. "senior" or "sub-15"
        #[arg(long)]
        category: Option<String>,

        /// Default football type: f5, f7, f8 or f11
        #[arg(long)]
        football_type: Option<FootballType>,

        /// Create a local user with this name and make it the profile
        #[arg(long)]
        name: Option<String>,

        /// Role of the new user: coach or spectator
        #[arg(long, default_value = "coach")]
        role: Role,

        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the configuration and active profile
    Show {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Create a profile or switch to an existing user
    Profile {
        /// Name of a new user to create
        #[arg(long, conflicts_with = "user")]
        name: Option<String>,

        /// Role of the new user: coach or spectator
        #[arg(long, default_value = "coach")]
        role: Role,

        /// Id of an existing user to act as
        #[arg(long)]
        user: Option<String>,

        /// Remove the profile so the tools act without a user
        #[arg(long, conflicts_with_all = ["name", "user"])]
        clear: bool,
    },

    /// Change the active user's preferences
    Preferences {
        /// Receive notifications: on or off
        #[arg(long)]
        notifications: Option<Switch>,

        /// Dark mode: on or off
        #[arg(long)]
        dark_mode: Option<Switch>,

        /// Two-letter language code
        #[arg(long)]
        language: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Switch {
    On,
    Off,
}

impl From<Switch> for bool {
    fn from(s: Switch) -> bool {
        matches!(s, Switch::On)
    }
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
    let config_path = resolve_config_path()?;

    match cli.command {
        Commands::Init {
            db,
            city,
            category,
            football_type,
            name,
            role,
            force,
        } => {
            if config_path.exists() && !force {
                bail!(GolazoError::Conflict(format!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                )));
            }

            let mut config = Config::default_config();
            if let Some(db) = db {
                config.database = DatabaseConfig { path: db };
            }
            config.defaults.city = city;
            config.defaults.category = category;
            if let Some(football_type) = football_type {
                config.defaults.football_type = football_type;
            }

            if let Some(name) = name {
                let user = create_user(&config, &name, role).await?;
                config.profile = Some(ProfileConfig { user_id: user.id });
            }

            save(&config, &config_path)?;
            println!("Configuration written to {}", config_path.display());
            println!("Database: {}", database_path(&config)?.display());
            if let Some(user_id) = config.active_user_id() {
                println!("Profile: {} ({})", user_id, role.as_str());
            }
        }
        Commands::Show { format } => {
            check_format(&format)?;
            let config = Config::load()?;
            let service = GolazoService::from_config(config).await?;
            let profile = service.users().active().await?;
            show(&format, &config_path, service.config(), profile.as_ref())?;
        }
        Commands::Profile {
            name,
            role,
            user,
            clear,
        } => {
            let mut config = Config::load()?;
            if clear {
                config.profile = None;
                save(&config, &config_path)?;
                println!("Profile cleared");
                return Ok(());
            }

            let user = match (name, user) {
                (Some(name), _) => create_user(&config, &name, role).await?,
                (None, Some(user_id)) => {
                    let service = GolazoService::from_config(config.clone()).await?;
                    service.users().get(&user_id).await?
                }
                (None, None) => {
                    bail!(GolazoError::InvalidInput(
                        "give --name to create a user or --user to switch".to_string()
                    ))
                }
            };

            config.profile = Some(ProfileConfig {
                user_id: user.id.clone(),
            });
            save(&config, &config_path)?;
            println!("Acting as {} ({}, {})", user.name, user.role.as_str(), user.id);
        }
        Commands::Preferences {
            notifications,
            dark_mode,
            language,
        } => {
            let service = GolazoService::new().await?;
            let user = service
                .users()
                .active()
                .await?
                .ok_or_else(|| GolazoError::InvalidInput("no profile configured".to_string()))?;

            let update = PreferencesUpdate {
                notifications: notifications.map(bool::from),
                dark_mode: dark_mode.map(bool::from),
                language,
            };
            let user = service.users().update_preferences(&user.id, update).await?;
            println!(
                "notifications: {}, dark mode: {}, language: {}",
                on_off(user.preferences.notifications),
                on_off(user.preferences.dark_mode),
                user.preferences.language
            );
        }
    }

    Ok(())
}

async fn create_user(config: &Config, name: &str, role: Role) -> Result<User> {
    let service = GolazoService::from_config(config.clone()).await?;
    let user = service.users().create(name, role).await?;
    tracing::debug!(user = %user.id, "profile user created");
    Ok(user)
}

fn save(config: &Config, path: &Path) -> Result<()> {
    config
        .save_to_path(path)
        .with_context(|| format!("could not save {}", path.display()))
}

fn database_path(config: &Config) -> Result<PathBuf> {
    Ok(resolve_db_path(Some(&config.database.path))?)
}

fn check_format(format: &str) -> Result<()> {
    if format != "text" && format != "json" {
        bail!(GolazoError::InvalidInput(format!(
            "Invalid format '{}'. Must be 'text' or 'json'",
            format
        )));
    }
    Ok(())
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn show(format: &str, config_path: &Path, config: &Config, profile: Option<&User>) -> Result<()> {
    if format == "json" {
        let json = serde_json::json!({
            "config_path": config_path,
            "database": database_path(config)?,
            "defaults": config.defaults,
            "tournament": config.tournament,
            "profile": profile,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    println!("Config:   {}", config_path.display());
    println!("Database: {}", database_path(config)?.display());
    println!(
        "Defaults: city={} category={} type={}",
        config.defaults.city.as_deref().unwrap_or("-"),
        config.defaults.category.as_deref().unwrap_or("-"),
        config.defaults.football_type
    );
    let t = &config.tournament;
    println!(
        "Tournaments: {}/{}/{} points, {} min, {} per group, {} classified",
        t.points_win,
        t.points_draw,
        t.points_loss,
        t.match_minutes,
        t.teams_per_group,
        t.classified_per_group
    );
    match profile {
        Some(user) => println!("Profile:  {} ({}, {})", user.name, user.role.as_str(), user.id),
        None => println!("Profile:  none"),
    }
    Ok(())
}
