//! Golazo - organize amateur football
//!
//! Clubs, teams, tournaments with group stages and knockouts, and friendly
//! matches, kept in a local SQLite database and shared by the `gol-*`
//! command-line tools.

pub mod competition;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use db::{Database, TeamFilter, TournamentEntry, TournamentFilter};
pub use error::{CompetitionError, GolazoError, Result};
pub use service::GolazoService;
pub use types::{
    Club, Field, FootballType, Friendly, FriendlyStatus, Match, MatchStatus, Phase, Player,
    Position, Role, Team, Tournament, TournamentFormat, TournamentSettings, TournamentStatus, User,
};
