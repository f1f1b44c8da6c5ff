//! Error types for Golazo

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GolazoError>;

#[derive(Error, Debug)]
pub enum GolazoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Competition error: {0}")]
    Competition(#[from] CompetitionError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

impl GolazoError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            GolazoError::InvalidInput(_) => 3,
            GolazoError::Validation(_) => 3,
            GolazoError::NotFound { .. } => 3,
            GolazoError::Config(_) => 2,
            GolazoError::PermissionDenied(_) => 2,
            GolazoError::Conflict(_) => 1,
            GolazoError::Competition(_) => 1,
            GolazoError::Database(_) => 1,
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: &str) -> Self {
        GolazoError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to write config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Corrupt {column} value in {table} row {id}: {source}")]
    CorruptJson {
        table: &'static str,
        column: &'static str,
        id: String,
        source: serde_json::Error,
    },

    #[error("Invalid {kind} value '{value}'")]
    InvalidValue { kind: &'static str, value: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompetitionError {
    #[error("A {format} tournament needs at least {required} teams, got {actual}")]
    NotEnoughTeams {
        format: String,
        required: usize,
        actual: usize,
    },

    #[error("A tournament accepts at most {max} teams, got {actual}")]
    TooManyTeams { max: usize, actual: usize },

    #[error("Team {0} appears more than once")]
    DuplicateTeam(String),

    #[error("Match {0} ended level and has no penalty shoot-out result")]
    UndecidedTie(String),

    #[error("Round is not complete: {pending} match(es) still pending")]
    RoundIncomplete { pending: usize },

    #[error("Tournament is already finished")]
    AlreadyFinished,

    #[error("Tournament has not started")]
    NotStarted,
}
