//! Database operations for Golazo

use chrono::{NaiveDate, NaiveTime};
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use std::collections::BTreeMap;
use std::path::Path;

use crate::competition::Fixture;
use crate::error::{DbError, GolazoError, Result};
use crate::types::{
    Club, Colors, Coordinates, Field, Friendly, FriendlyStatus, Location, Match, Player, Preferences,
    Team, Tournament, TournamentSettings, TournamentStatus, User,
};

/// A team's entry in a tournament
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TournamentEntry {
    pub team_id: String,
    pub group: Option<String>,
    pub position: usize,
    pub eliminated: bool,
}

/// Filters for listing teams
#[derive(Debug, Clone, Default)]
pub struct TeamFilter {
    pub city: Option<String>,
    pub category: Option<String>,
    pub club_id: Option<String>,
    pub coach_id: Option<String>,
}

/// Filters for listing tournaments
#[derive(Debug, Clone, Default)]
pub struct TournamentFilter {
    pub status: Option<TournamentStatus>,
    pub city: Option<String>,
    pub category: Option<String>,
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

fn sqlx_err(e: sqlx::Error) -> DbError {
    DbError::SqlxError(e)
}

fn parse_json<T: DeserializeOwned>(
    raw: &str,
    table: &'static str,
    column: &'static str,
    id: &str,
) -> std::result::Result<T, DbError> {
    serde_json::from_str(raw).map_err(|source| DbError::CorruptJson {
        table,
        column,
        id: id.to_string(),
        source,
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    // Plain structs of strings and numbers always serialize
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

fn parse_date(raw: Option<String>) -> std::result::Result<Option<NaiveDate>, DbError> {
    raw.map(|s| {
        s.parse::<NaiveDate>()
            .map_err(|_| DbError::InvalidValue { kind: "date", value: s })
    })
    .transpose()
}

fn parse_time(raw: Option<String>) -> std::result::Result<Option<NaiveTime>, DbError> {
    raw.map(|s| {
        s.parse::<NaiveTime>()
            .map_err(|_| DbError::InvalidValue { kind: "time", value: s })
    })
    .transpose()
}

fn opt_u32(row: &SqliteRow, column: &str) -> Option<u32> {
    row.get::<Option<i64>, _>(column).map(|v| v.max(0) as u32)
}

fn user_from_row(r: &SqliteRow) -> Result<User> {
    let id: String = r.get("id");
    let preferences: Preferences = parse_json(r.get("preferences"), "users", "preferences", &id)?;
    Ok(User {
        name: r.get("name"),
        role: r.get::<String, _>("role").parse()?,
        preferences,
        followed_tournaments: Vec::new(),
        created_at: r.get("created_at"),
        id,
    })
}

fn club_from_row(r: &SqliteRow) -> Club {
    Club {
        id: r.get("id"),
        name: r.get("name"),
        location: Location {
            address: r.get("address"),
            city: r.get("city"),
        },
        categories: BTreeMap::new(),
        coach_id: r.get("coach_id"),
        phone: r.get("phone"),
        email: r.get("email"),
        created_at: r.get("created_at"),
    }
}

fn field_from_row(r: &SqliteRow) -> Result<Field> {
    let lat: Option<f64> = r.get("lat");
    let lng: Option<f64> = r.get("lng");
    Ok(Field {
        id: r.get("id"),
        name: r.get("name"),
        address: r.get("address"),
        city: r.get("city"),
        football_type: r.get::<String, _>("football_type").parse()?,
        surface: r.get::<String, _>("surface").parse()?,
        coordinates: lat.zip(lng).map(|(lat, lng)| Coordinates { lat, lng }),
    })
}

fn team_from_row(r: &SqliteRow) -> Result<Team> {
    let id: String = r.get("id");
    let colors: Colors = parse_json(r.get("colors"), "teams", "colors", &id)?;
    Ok(Team {
        name: r.get("name"),
        city: r.get("city"),
        category: r.get("category"),
        football_type: r.get::<String, _>("football_type").parse()?,
        colors,
        coach_id: r.get("coach_id"),
        club_id: r.get("club_id"),
        crest: r.get("crest"),
        players: Vec::new(),
        created_at: r.get("created_at"),
        id,
    })
}

fn player_from_row(r: &SqliteRow) -> Result<Player> {
    Ok(Player {
        id: r.get("id"),
        team_id: r.get("team_id"),
        name: r.get("name"),
        number: r.get::<i64, _>("number").clamp(0, 255) as u8,
        position: r.get::<String, _>("position").parse()?,
    })
}

fn tournament_from_row(r: &SqliteRow) -> Result<Tournament> {
    let id: String = r.get("id");
    let settings: TournamentSettings = parse_json(r.get("settings"), "tournaments", "settings", &id)?;
    Ok(Tournament {
        name: r.get("name"),
        city: r.get("city"),
        category: r.get("category"),
        football_type: r.get::<String, _>("football_type").parse()?,
        format: r.get::<String, _>("format").parse()?,
        team_ids: Vec::new(),
        status: r.get::<String, _>("status").parse()?,
        settings,
        creator_id: r.get("creator_id"),
        phase: r.get::<String, _>("phase").parse()?,
        champion_id: r.get("champion_id"),
        created_at: r.get("created_at"),
        id,
    })
}

fn match_from_row(r: &SqliteRow) -> Result<Match> {
    Ok(Match {
        id: r.get("id"),
        tournament_id: r.get("tournament_id"),
        home_team_id: r.get("home_team_id"),
        away_team_id: r.get("away_team_id"),
        date: parse_date(r.get("match_date"))?,
        time: parse_time(r.get("match_time"))?,
        status: r.get::<String, _>("status").parse()?,
        round: r.get::<i64, _>("round").max(0) as u32,
        phase: r.get::<String, _>("phase").parse()?,
        group: r.get("group_label"),
        stage: r.get("stage"),
        home_goals: opt_u32(r, "home_goals"),
        away_goals: opt_u32(r, "away_goals"),
        home_penalties: opt_u32(r, "home_penalties"),
        away_penalties: opt_u32(r, "away_penalties"),
        field_id: r.get("field_id"),
    })
}

fn friendly_from_row(r: &SqliteRow) -> Result<Friendly> {
    Ok(Friendly {
        id: r.get("id"),
        home_team_id: r.get("home_team_id"),
        away_team_id: r.get("away_team_id"),
        status: r.get::<String, _>("status").parse()?,
        is_availability: r.get::<i64, _>("is_availability") != 0,
        location: r.get("location"),
        field_id: r.get("field_id"),
        date: parse_date(r.get("match_date"))?,
        time: parse_time(r.get("match_time"))?,
        proposed_by: r.get("proposed_by"),
        proposed_to: r.get("proposed_to"),
        home_goals: opt_u32(r, "home_goals"),
        away_goals: opt_u32(r, "away_goals"),
        notes: r.get("notes"),
        created_at: r.get("created_at"),
    })
}

// Statement helpers shared by the public methods and snapshot import. They
// take a connection so callers can run several inside one transaction.

/// What an insert does when a row with the same id is already stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OnConflict {
    /// Fail with a constraint error
    Fail,
    /// Overwrite the stored row in place. The row is never deleted, so no
    /// `ON DELETE` rule of the tables referencing it fires.
    Update,
}

fn insert_sql(table: &str, columns: &[&str], on_conflict: OnConflict) -> String {
    let placeholders = vec!["?"; columns.len()].join(", ");
    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders
    );
    if on_conflict == OnConflict::Update {
        let updates: Vec<String> = columns
            .iter()
            .filter(|c| **c != "id")
            .map(|c| format!("{0} = excluded.{0}", c))
            .collect();
        sql.push_str(" ON CONFLICT(id) DO UPDATE SET ");
        sql.push_str(&updates.join(", "));
    }
    sql
}

const USER_COLUMNS: &[&str] = &["id", "name", "role", "preferences", "created_at"];
const CLUB_COLUMNS: &[&str] = &[
    "id", "name", "address", "city", "coach_id", "phone", "email", "created_at",
];
const FIELD_COLUMNS: &[&str] = &[
    "id", "name", "address", "city", "football_type", "surface", "lat", "lng",
];
const PLAYER_COLUMNS: &[&str] = &["id", "team_id", "name", "number", "position"];
const TEAM_COLUMNS: &[&str] = &[
    "id", "name", "city", "category", "football_type", "colors", "coach_id", "club_id", "crest",
    "created_at",
];
const TOURNAMENT_COLUMNS: &[&str] = &[
    "id", "name", "city", "category", "football_type", "format", "status", "settings",
    "creator_id", "phase", "champion_id", "created_at",
];
const MATCH_COLUMNS: &[&str] = &[
    "id", "tournament_id", "home_team_id", "away_team_id", "match_date", "match_time", "status",
    "round", "phase", "group_label", "stage", "home_goals", "away_goals", "home_penalties",
    "away_penalties", "field_id",
];
const FRIENDLY_COLUMNS: &[&str] = &[
    "id", "home_team_id", "away_team_id", "status", "is_availability", "location", "field_id",
    "match_date", "match_time", "proposed_by", "proposed_to", "home_goals", "away_goals", "notes",
    "created_at",
];

/// Store a user and add its follows. Follows already stored are kept.
pub(crate) async fn insert_user(
    conn: &mut SqliteConnection,
    user: &User,
    on_conflict: OnConflict,
) -> Result<()> {
    let sql = insert_sql("users", USER_COLUMNS, on_conflict);
    sqlx::query(&sql)
        .bind(&user.id)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(to_json(&user.preferences))
        .bind(user.created_at)
        .execute(&mut *conn)
        .await
        .map_err(sqlx_err)?;

    for tournament_id in &user.followed_tournaments {
        sqlx::query(
            "INSERT OR IGNORE INTO user_follows (user_id, tournament_id, followed_at) VALUES (?, ?, ?)",
        )
        .bind(&user.id)
        .bind(tournament_id)
        .bind(user.created_at)
        .execute(&mut *conn)
        .await
        .map_err(sqlx_err)?;
    }

    Ok(())
}

pub(crate) async fn insert_club(
    conn: &mut SqliteConnection,
    club: &Club,
    on_conflict: OnConflict,
) -> Result<()> {
    let sql = insert_sql("clubs", CLUB_COLUMNS, on_conflict);
    sqlx::query(&sql)
        .bind(&club.id)
        .bind(&club.name)
        .bind(&club.location.address)
        .bind(&club.location.city)
        .bind(&club.coach_id)
        .bind(&club.phone)
        .bind(&club.email)
        .bind(club.created_at)
        .execute(&mut *conn)
        .await
        .map_err(sqlx_err)?;

    Ok(())
}

pub(crate) async fn insert_field(
    conn: &mut SqliteConnection,
    field: &Field,
    on_conflict: OnConflict,
) -> Result<()> {
    let sql = insert_sql("fields", FIELD_COLUMNS, on_conflict);
    sqlx::query(&sql)
        .bind(&field.id)
        .bind(&field.name)
        .bind(&field.address)
        .bind(&field.city)
        .bind(field.football_type.as_str())
        .bind(field.surface.as_str())
        .bind(field.coordinates.map(|c| c.lat))
        .bind(field.coordinates.map(|c| c.lng))
        .execute(&mut *conn)
        .await
        .map_err(sqlx_err)?;

    Ok(())
}

pub(crate) async fn insert_player(
    conn: &mut SqliteConnection,
    player: &Player,
    on_conflict: OnConflict,
) -> Result<()> {
    let sql = insert_sql("players", PLAYER_COLUMNS, on_conflict);
    sqlx::query(&sql)
        .bind(&player.id)
        .bind(&player.team_id)
        .bind(&player.name)
        .bind(i64::from(player.number))
        .bind(player.position.as_str())
        .execute(&mut *conn)
        .await
        .map_err(sqlx_err)?;

    Ok(())
}

/// Store a team with its squad. On overwrite the stored squad is replaced
/// by the team's.
pub(crate) async fn insert_team(
    conn: &mut SqliteConnection,
    team: &Team,
    on_conflict: OnConflict,
) -> Result<()> {
    let sql = insert_sql("teams", TEAM_COLUMNS, on_conflict);
    sqlx::query(&sql)
        .bind(&team.id)
        .bind(&team.name)
        .bind(&team.city)
        .bind(&team.category)
        .bind(team.football_type.as_str())
        .bind(to_json(&team.colors))
        .bind(&team.coach_id)
        .bind(&team.club_id)
        .bind(&team.crest)
        .bind(team.created_at)
        .execute(&mut *conn)
        .await
        .map_err(sqlx_err)?;

    if on_conflict == OnConflict::Update {
        sqlx::query("DELETE FROM players WHERE team_id = ?")
            .bind(&team.id)
            .execute(&mut *conn)
            .await
            .map_err(sqlx_err)?;
    }
    for player in &team.players {
        insert_player(conn, player, on_conflict).await?;
    }

    Ok(())
}

pub(crate) async fn insert_tournament(
    conn: &mut SqliteConnection,
    tournament: &Tournament,
    on_conflict: OnConflict,
) -> Result<()> {
    let sql = insert_sql("tournaments", TOURNAMENT_COLUMNS, on_conflict);
    sqlx::query(&sql)
        .bind(&tournament.id)
        .bind(&tournament.name)
        .bind(&tournament.city)
        .bind(&tournament.category)
        .bind(tournament.football_type.as_str())
        .bind(tournament.format.as_str())
        .bind(tournament.status.as_str())
        .bind(to_json(&tournament.settings))
        .bind(&tournament.creator_id)
        .bind(tournament.phase.as_str())
        .bind(&tournament.champion_id)
        .bind(tournament.created_at)
        .execute(&mut *conn)
        .await
        .map_err(sqlx_err)?;

    Ok(())
}

pub(crate) async fn insert_entry(
    conn: &mut SqliteConnection,
    tournament_id: &str,
    entry: &TournamentEntry,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO tournament_teams (tournament_id, team_id, group_label, position, eliminated)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(tournament_id)
    .bind(&entry.team_id)
    .bind(&entry.group)
    .bind(entry.position as i64)
    .bind(entry.eliminated as i64)
    .execute(&mut *conn)
    .await
    .map_err(sqlx_err)?;

    Ok(())
}

/// Drop the draw of a tournament before writing a new one
pub(crate) async fn clear_entries(conn: &mut SqliteConnection, tournament_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM tournament_teams WHERE tournament_id = ?")
        .bind(tournament_id)
        .execute(&mut *conn)
        .await
        .map_err(sqlx_err)?;

    Ok(())
}

pub(crate) async fn insert_match(
    conn: &mut SqliteConnection,
    m: &Match,
    on_conflict: OnConflict,
) -> Result<()> {
    let sql = insert_sql("matches", MATCH_COLUMNS, on_conflict);
    sqlx::query(&sql)
        .bind(&m.id)
        .bind(&m.tournament_id)
        .bind(&m.home_team_id)
        .bind(&m.away_team_id)
        .bind(m.date.map(|d| d.to_string()))
        .bind(m.time.map(|t| t.to_string()))
        .bind(m.status.as_str())
        .bind(i64::from(m.round))
        .bind(m.phase.as_str())
        .bind(&m.group)
        .bind(&m.stage)
        .bind(m.home_goals.map(i64::from))
        .bind(m.away_goals.map(i64::from))
        .bind(m.home_penalties.map(i64::from))
        .bind(m.away_penalties.map(i64::from))
        .bind(&m.field_id)
        .execute(&mut *conn)
        .await
        .map_err(sqlx_err)?;

    Ok(())
}

pub(crate) async fn insert_friendly(
    conn: &mut SqliteConnection,
    f: &Friendly,
    on_conflict: OnConflict,
) -> Result<()> {
    let sql = insert_sql("friendlies", FRIENDLY_COLUMNS, on_conflict);
    sqlx::query(&sql)
        .bind(&f.id)
        .bind(&f.home_team_id)
        .bind(&f.away_team_id)
        .bind(f.status.as_str())
        .bind(f.is_availability as i64)
        .bind(&f.location)
        .bind(&f.field_id)
        .bind(f.date.map(|d| d.to_string()))
        .bind(f.time.map(|t| t.to_string()))
        .bind(&f.proposed_by)
        .bind(&f.proposed_to)
        .bind(f.home_goals.map(i64::from))
        .bind(f.away_goals.map(i64::from))
        .bind(&f.notes)
        .bind(f.created_at)
        .execute(&mut *conn)
        .await
        .map_err(sqlx_err)?;

    Ok(())
}

impl Database {
    /// Create a new database connection
    pub async fn new(db_path: &str) -> Result<Self> {
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(DbError::IoError)?;
        }

        // Forward slashes work on both Windows and Unix; mode=rwc creates the file
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url).await.map_err(sqlx_err)?;
        Self::migrate(pool).await
    }

    /// Private in-memory database, used by tests
    pub async fn in_memory() -> Result<Self> {
        // Every connection to :memory: is a separate database, so keep one
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(sqlx_err)?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(DbError::MigrationError)?;

        tracing::debug!("database ready");
        Ok(Self { pool })
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub(crate) async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await.map_err(sqlx_err)?)
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub async fn create_user(&self, user: &User) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(sqlx_err)?;
        insert_user(&mut conn, user, OnConflict::Fail).await
    }

    /// Get a user with the tournaments they follow
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, name, role, preferences, created_at FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_err)?;

        match row {
            Some(r) => {
                let mut user = user_from_row(&r)?;
                user.followed_tournaments = self.followed_tournaments(user_id).await?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT id, name, role, preferences, created_at FROM users ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_err)?;

        let mut users = Vec::with_capacity(rows.len());
        for r in &rows {
            let mut user = user_from_row(r)?;
            user.followed_tournaments = self.followed_tournaments(&user.id).await?;
            users.push(user);
        }
        Ok(users)
    }

    pub async fn update_user(&self, user: &User) -> Result<()> {
        sqlx::query("UPDATE users SET name = ?, role = ?, preferences = ? WHERE id = ?")
            .bind(&user.name)
            .bind(user.role.as_str())
            .bind(to_json(&user.preferences))
            .bind(&user.id)
            .execute(&self.pool)
            .await
            .map_err(sqlx_err)?;

        Ok(())
    }

    /// Follow a tournament; following twice is a no-op
    pub async fn follow(&self, user_id: &str, tournament_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO user_follows (user_id, tournament_id, followed_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(tournament_id)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(sqlx_err)?;

        Ok(())
    }

    /// Returns whether the user was following the tournament
    pub async fn unfollow(&self, user_id: &str, tournament_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_follows WHERE user_id = ? AND tournament_id = ?")
            .bind(user_id)
            .bind(tournament_id)
            .execute(&self.pool)
            .await
            .map_err(sqlx_err)?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn followed_tournaments(&self, user_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT tournament_id FROM user_follows WHERE user_id = ? ORDER BY followed_at, tournament_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err)?;

        Ok(rows.iter().map(|r| r.get("tournament_id")).collect())
    }

    /// Users following a tournament
    pub async fn followers(&self, tournament_id: &str) -> Result<Vec<User>> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.name, u.role, u.preferences, u.created_at
            FROM users u
            INNER JOIN user_follows f ON f.user_id = u.id
            WHERE f.tournament_id = ?
            ORDER BY u.name
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err)?;

        rows.iter().map(user_from_row).collect()
    }

    // ------------------------------------------------------------------
    // Clubs and fields
    // ------------------------------------------------------------------

    pub async fn create_club(&self, club: &Club) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(sqlx_err)?;
        insert_club(&mut conn, club, OnConflict::Fail).await
    }

    /// Get a club with its categories filled from its teams
    pub async fn get_club(&self, club_id: &str) -> Result<Option<Club>> {
        let row = sqlx::query(
            "SELECT id, name, address, city, coach_id, phone, email, created_at FROM clubs WHERE id = ?",
        )
        .bind(club_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlx_err)?;

        match row {
            Some(r) => {
                let mut club = club_from_row(&r);
                club.categories = self.club_categories(club_id).await?;
                Ok(Some(club))
            }
            None => Ok(None),
        }
    }

    async fn club_categories(&self, club_id: &str) -> Result<BTreeMap<String, Vec<String>>> {
        let rows = sqlx::query("SELECT id, category FROM teams WHERE club_id = ? ORDER BY category, name")
            .bind(club_id)
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_err)?;

        let mut categories: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for r in rows {
            categories
                .entry(r.get("category"))
                .or_default()
                .push(r.get("id"));
        }
        Ok(categories)
    }

    pub async fn list_clubs(&self, city: Option<&str>) -> Result<Vec<Club>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, address, city, coach_id, phone, email, created_at
            FROM clubs
            WHERE (? IS NULL OR city = ? COLLATE NOCASE)
            ORDER BY name
            "#,
        )
        .bind(city)
        .bind(city)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err)?;

        let mut clubs = Vec::with_capacity(rows.len());
        for r in &rows {
            let mut club = club_from_row(r);
            club.categories = self.club_categories(&club.id).await?;
            clubs.push(club);
        }
        Ok(clubs)
    }

    pub async fn update_club(&self, club: &Club) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE clubs SET name = ?, address = ?, city = ?, phone = ?, email = ?
            WHERE id = ?
            "#,
        )
        .bind(&club.name)
        .bind(&club.location.address)
        .bind(&club.location.city)
        .bind(&club.phone)
        .bind(&club.email)
        .bind(&club.id)
        .execute(&self.pool)
        .await
        .map_err(sqlx_err)?;

        Ok(())
    }

    /// Delete a club; its teams stay, detached from it
    pub async fn delete_club(&self, club_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM clubs WHERE id = ?")
            .bind(club_id)
            .execute(&self.pool)
            .await
            .map_err(sqlx_err)?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn create_field(&self, field: &Field) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(sqlx_err)?;
        insert_field(&mut conn, field, OnConflict::Fail).await
    }

    pub async fn get_field(&self, field_id: &str) -> Result<Option<Field>> {
        let row = sqlx::query(
            "SELECT id, name, address, city, football_type, surface, lat, lng FROM fields WHERE id = ?",
        )
        .bind(field_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlx_err)?;

        row.as_ref().map(field_from_row).transpose()
    }

    pub async fn list_fields(&self, city: Option<&str>) -> Result<Vec<Field>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, address, city, football_type, surface, lat, lng
            FROM fields
            WHERE (? IS NULL OR city = ? COLLATE NOCASE)
            ORDER BY name
            "#,
        )
        .bind(city)
        .bind(city)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err)?;

        rows.iter().map(field_from_row).collect()
    }

    pub async fn delete_field(&self, field_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM fields WHERE id = ?")
            .bind(field_id)
            .execute(&self.pool)
            .await
            .map_err(sqlx_err)?;

        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------
    // Teams and players
    // ------------------------------------------------------------------

    /// Create a team together with its initial squad
    pub async fn create_team(&self, team: &Team) -> Result<()> {
        let mut tx = self.begin().await?;
        insert_team(&mut tx, team, OnConflict::Fail).await?;
        tx.commit().await.map_err(sqlx_err)?;
        Ok(())
    }

    /// Get a team with its squad
    pub async fn get_team(&self, team_id: &str) -> Result<Option<Team>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, city, category, football_type, colors, coach_id, club_id, crest, created_at
            FROM teams WHERE id = ?
            "#,
        )
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlx_err)?;

        match row {
            Some(r) => {
                let mut team = team_from_row(&r)?;
                team.players = self.get_players(team_id).await?;
                Ok(Some(team))
            }
            None => Ok(None),
        }
    }

    pub async fn list_teams(&self, filter: &TeamFilter) -> Result<Vec<Team>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, city, category, football_type, colors, coach_id, club_id, crest, created_at
            FROM teams
            WHERE (? IS NULL OR city = ? COLLATE NOCASE)
              AND (? IS NULL OR category = ? COLLATE NOCASE)
              AND (? IS NULL OR club_id = ?)
              AND (? IS NULL OR coach_id = ?)
            ORDER BY name
            "#,
        )
        .bind(&filter.city)
        .bind(&filter.city)
        .bind(&filter.category)
        .bind(&filter.category)
        .bind(&filter.club_id)
        .bind(&filter.club_id)
        .bind(&filter.coach_id)
        .bind(&filter.coach_id)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err)?;

        let mut teams = Vec::with_capacity(rows.len());
        for r in &rows {
            let mut team = team_from_row(r)?;
            team.players = self.get_players(&team.id).await?;
            teams.push(team);
        }
        Ok(teams)
    }

    /// Id to name for the given teams; unknown ids are left out
    pub async fn team_names(&self, team_ids: &[String]) -> Result<BTreeMap<String, String>> {
        let mut names = BTreeMap::new();
        for id in team_ids {
            let row = sqlx::query("SELECT name FROM teams WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(sqlx_err)?;
            if let Some(r) = row {
                names.insert(id.clone(), r.get("name"));
            }
        }
        Ok(names)
    }

    pub async fn update_team(&self, team: &Team) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE teams
            SET name = ?, city = ?, category = ?, football_type = ?, colors = ?, club_id = ?, crest = ?
            WHERE id = ?
            "#,
        )
        .bind(&team.name)
        .bind(&team.city)
        .bind(&team.category)
        .bind(team.football_type.as_str())
        .bind(to_json(&team.colors))
        .bind(&team.club_id)
        .bind(&team.crest)
        .bind(&team.id)
        .execute(&self.pool)
        .await
        .map_err(sqlx_err)?;

        Ok(())
    }

    pub async fn delete_team(&self, team_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM teams WHERE id = ?")
            .bind(team_id)
            .execute(&self.pool)
            .await
            .map_err(sqlx_err)?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_players(&self, team_id: &str) -> Result<Vec<Player>> {
        let rows = sqlx::query(
            "SELECT id, team_id, name, number, position FROM players WHERE team_id = ? ORDER BY number",
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err)?;

        rows.iter().map(player_from_row).collect()
    }

    pub async fn add_player(&self, player: &Player) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(sqlx_err)?;
        insert_player(&mut conn, player, OnConflict::Fail).await
    }

    pub async fn remove_player(&self, team_id: &str, player_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM players WHERE id = ? AND team_id = ?")
            .bind(player_id)
            .bind(team_id)
            .execute(&self.pool)
            .await
            .map_err(sqlx_err)?;

        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------
    // Tournaments and matches
    // ------------------------------------------------------------------

    /// Store a tournament, its draw and its opening matches atomically
    pub async fn create_tournament(&self, tournament: &Tournament, fixture: &Fixture) -> Result<()> {
        let mut tx = self.begin().await?;

        insert_tournament(&mut tx, tournament, OnConflict::Fail).await?;
        for seed in &fixture.seeds {
            let entry = TournamentEntry {
                team_id: seed.team_id.clone(),
                group: seed.group.clone(),
                position: seed.position,
                eliminated: false,
            };
            insert_entry(&mut tx, &tournament.id, &entry).await?;
        }
        for m in &fixture.matches {
            insert_match(&mut tx, m, OnConflict::Fail).await?;
        }

        tx.commit().await.map_err(sqlx_err)?;
        Ok(())
    }

    /// Get a tournament with its team ids in draw order
    pub async fn get_tournament(&self, tournament_id: &str) -> Result<Option<Tournament>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, city, category, football_type, format, status, settings,
                   creator_id, phase, champion_id, created_at
            FROM tournaments WHERE id = ?
            "#,
        )
        .bind(tournament_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlx_err)?;

        match row {
            Some(r) => {
                let mut tournament = tournament_from_row(&r)?;
                tournament.team_ids = self
                    .tournament_entries(tournament_id)
                    .await?
                    .into_iter()
                    .map(|e| e.team_id)
                    .collect();
                Ok(Some(tournament))
            }
            None => Ok(None),
        }
    }

    pub async fn list_tournaments(&self, filter: &TournamentFilter) -> Result<Vec<Tournament>> {
        let status = filter.status.map(|s| s.as_str());
        let rows = sqlx::query(
            r#"
            SELECT id, name, city, category, football_type, format, status, settings,
                   creator_id, phase, champion_id, created_at
            FROM tournaments
            WHERE (? IS NULL OR status = ?)
              AND (? IS NULL OR city = ? COLLATE NOCASE)
              AND (? IS NULL OR category = ? COLLATE NOCASE)
            ORDER BY created_at DESC, name
            "#,
        )
        .bind(status)
        .bind(status)
        .bind(&filter.city)
        .bind(&filter.city)
        .bind(&filter.category)
        .bind(&filter.category)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err)?;

        let mut tournaments = Vec::with_capacity(rows.len());
        for r in &rows {
            let mut tournament = tournament_from_row(r)?;
            tournament.team_ids = self
                .tournament_entries(&tournament.id)
                .await?
                .into_iter()
                .map(|e| e.team_id)
                .collect();
            tournaments.push(tournament);
        }
        Ok(tournaments)
    }

    pub async fn tournament_entries(&self, tournament_id: &str) -> Result<Vec<TournamentEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT team_id, group_label, position, eliminated
            FROM tournament_teams
            WHERE tournament_id = ?
            ORDER BY position
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err)?;

        Ok(rows
            .iter()
            .map(|r| TournamentEntry {
                team_id: r.get("team_id"),
                group: r.get("group_label"),
                position: r.get::<i64, _>("position").max(0) as usize,
                eliminated: r.get::<i64, _>("eliminated") != 0,
            })
            .collect())
    }

    /// Write status, phase and champion; other columns are immutable
    pub async fn update_tournament_state(&self, tournament: &Tournament) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(sqlx_err)?;
        write_tournament_state(&mut conn, tournament).await
    }

    /// Record the end of a stage: eliminate teams, add the next matches and
    /// store the tournament's new state, all or nothing.
    ///
    /// `from_round` is the latest round the caller saw. If the stored
    /// tournament is no longer in progress at that round, someone else
    /// closed it first and nothing is written.
    pub async fn advance_tournament(
        &self,
        tournament: &Tournament,
        from_round: u32,
        eliminated: &[String],
        next_matches: &[Match],
    ) -> Result<()> {
        let mut tx = self.begin().await?;

        // A write first, so the check runs under the write lock
        let claimed = sqlx::query(
            r#"
            UPDATE tournaments SET status = status
            WHERE id = ? AND status = ?
              AND (SELECT COALESCE(MAX(round), 0) FROM matches WHERE tournament_id = ?) = ?
            "#,
        )
        .bind(&tournament.id)
        .bind(TournamentStatus::InProgress.as_str())
        .bind(&tournament.id)
        .bind(i64::from(from_round))
        .execute(&mut *tx)
        .await
        .map_err(sqlx_err)?;
        if claimed.rows_affected() == 0 {
            return Err(GolazoError::Conflict(format!(
                "tournament {} moved on while round {} was being closed",
                tournament.id, from_round
            )));
        }

        for team_id in eliminated {
            sqlx::query("UPDATE tournament_teams SET eliminated = 1 WHERE tournament_id = ? AND team_id = ?")
                .bind(&tournament.id)
                .bind(team_id)
                .execute(&mut *tx)
                .await
                .map_err(sqlx_err)?;
        }
        for m in next_matches {
            insert_match(&mut tx, m, OnConflict::Fail).await?;
        }
        write_tournament_state(&mut tx, tournament).await?;

        tx.commit().await.map_err(sqlx_err)?;
        Ok(())
    }

    pub async fn delete_tournament(&self, tournament_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tournaments WHERE id = ?")
            .bind(tournament_id)
            .execute(&self.pool)
            .await
            .map_err(sqlx_err)?;

        Ok(result.rows_affected() > 0)
    }

    /// Ids of unfinished tournaments a team is entered in
    pub async fn active_tournaments_for_team(&self, team_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id
            FROM tournaments t
            INNER JOIN tournament_teams tt ON tt.tournament_id = t.id
            WHERE tt.team_id = ? AND t.status != 'finished'
            ORDER BY t.created_at
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err)?;

        Ok(rows.iter().map(|r| r.get("id")).collect())
    }

    /// All matches of a tournament ordered by round
    pub async fn get_matches(&self, tournament_id: &str) -> Result<Vec<Match>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tournament_id, home_team_id, away_team_id, match_date, match_time, status,
                   round, phase, group_label, stage, home_goals, away_goals, home_penalties,
                   away_penalties, field_id
            FROM matches
            WHERE tournament_id = ?
            ORDER BY round, group_label, rowid
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err)?;

        rows.iter().map(match_from_row).collect()
    }

    pub async fn get_match(&self, match_id: &str) -> Result<Option<Match>> {
        let row = sqlx::query(
            r#"
            SELECT id, tournament_id, home_team_id, away_team_id, match_date, match_time, status,
                   round, phase, group_label, stage, home_goals, away_goals, home_penalties,
                   away_penalties, field_id
            FROM matches WHERE id = ?
            "#,
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlx_err)?;

        row.as_ref().map(match_from_row).transpose()
    }

    /// Write the mutable parts of a match: schedule, status, score, field
    pub async fn update_match(&self, m: &Match) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE matches
            SET match_date = ?, match_time = ?, status = ?, home_goals = ?, away_goals = ?,
                home_penalties = ?, away_penalties = ?, field_id = ?
            WHERE id = ?
            "#,
        )
        .bind(m.date.map(|d| d.to_string()))
        .bind(m.time.map(|t| t.to_string()))
        .bind(m.status.as_str())
        .bind(m.home_goals.map(i64::from))
        .bind(m.away_goals.map(i64::from))
        .bind(m.home_penalties.map(i64::from))
        .bind(m.away_penalties.map(i64::from))
        .bind(&m.field_id)
        .bind(&m.id)
        .execute(&self.pool)
        .await
        .map_err(sqlx_err)?;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Friendlies
    // ------------------------------------------------------------------

    pub async fn create_friendly(&self, friendly: &Friendly) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(sqlx_err)?;
        insert_friendly(&mut conn, friendly, OnConflict::Fail).await
    }

    pub async fn get_friendly(&self, friendly_id: &str) -> Result<Option<Friendly>> {
        let row = sqlx::query(
            r#"
            SELECT id, home_team_id, away_team_id, status, is_availability, location, field_id,
                   match_date, match_time, proposed_by, proposed_to, home_goals, away_goals,
                   notes, created_at
            FROM friendlies WHERE id = ?
            "#,
        )
        .bind(friendly_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlx_err)?;

        row.as_ref().map(friendly_from_row).transpose()
    }

    /// List friendlies, optionally by status and by a team on either side
    pub async fn list_friendlies(
        &self,
        status: Option<FriendlyStatus>,
        team_id: Option<&str>,
    ) -> Result<Vec<Friendly>> {
        let status = status.map(|s| s.as_str());
        let rows = sqlx::query(
            r#"
            SELECT id, home_team_id, away_team_id, status, is_availability, location, field_id,
                   match_date, match_time, proposed_by, proposed_to, home_goals, away_goals,
                   notes, created_at
            FROM friendlies
            WHERE (? IS NULL OR status = ?)
              AND (? IS NULL OR home_team_id = ? OR away_team_id = ?)
            ORDER BY match_date IS NULL, match_date, created_at
            "#,
        )
        .bind(status)
        .bind(status)
        .bind(team_id)
        .bind(team_id)
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err)?;

        rows.iter().map(friendly_from_row).collect()
    }

    pub async fn update_friendly(&self, f: &Friendly) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE friendlies
            SET away_team_id = ?, status = ?, location = ?, field_id = ?, match_date = ?,
                match_time = ?, proposed_by = ?, proposed_to = ?, home_goals = ?, away_goals = ?,
                notes = ?
            WHERE id = ?
            "#,
        )
        .bind(&f.away_team_id)
        .bind(f.status.as_str())
        .bind(&f.location)
        .bind(&f.field_id)
        .bind(f.date.map(|d| d.to_string()))
        .bind(f.time.map(|t| t.to_string()))
        .bind(&f.proposed_by)
        .bind(&f.proposed_to)
        .bind(f.home_goals.map(i64::from))
        .bind(f.away_goals.map(i64::from))
        .bind(&f.notes)
        .bind(&f.id)
        .execute(&self.pool)
        .await
        .map_err(sqlx_err)?;

        Ok(())
    }
}

async fn write_tournament_state(conn: &mut SqliteConnection, tournament: &Tournament) -> Result<()> {
    sqlx::query("UPDATE tournaments SET status = ?, phase = ?, champion_id = ? WHERE id = ?")
        .bind(tournament.status.as_str())
        .bind(tournament.phase.as_str())
        .bind(&tournament.champion_id)
        .bind(&tournament.id)
        .execute(&mut *conn)
        .await
        .map_err(sqlx_err)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::competition::generate_fixture;
    use crate::types::{FootballType, MatchStatus, Phase, Position, Role, Surface, TournamentFormat};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn team(name: &str) -> Team {
        Team::new(
            name.to_string(),
            "Rosario".to_string(),
            "senior".to_string(),
            FootballType::Seven,
        )
    }

    async fn seeded_tournament(db: &Database, n: usize, format: TournamentFormat) -> Tournament {
        let mut ids = Vec::new();
        for i in 0..n {
            let t = team(&format!("Team {}", i));
            db.create_team(&t).await.unwrap();
            ids.push(t.id);
        }
        let t = Tournament::new(
            "Liga".to_string(),
            "Rosario".to_string(),
            "senior".to_string(),
            FootballType::Seven,
            format,
            ids,
            TournamentSettings::default(),
        );
        let fixture = generate_fixture(&t, &mut StdRng::seed_from_u64(9)).unwrap();
        db.create_tournament(&t, &fixture).await.unwrap();
        t
    }

    #[tokio::test]
    async fn test_team_round_trip_with_players() {
        let db = Database::in_memory().await.unwrap();

        let mut t = team("Central");
        t.colors = Colors {
            primary: "blue".to_string(),
            secondary: "yellow".to_string(),
        };
        t.players.push(Player::new(&t.id, "Ana".to_string(), 10, Position::Forward));
        t.players.push(Player::new(&t.id, "Bea".to_string(), 1, Position::Goalkeeper));
        db.create_team(&t).await.unwrap();

        let loaded = db.get_team(&t.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Central");
        assert_eq!(loaded.colors.primary, "blue");
        assert_eq!(loaded.football_type, FootballType::Seven);
        // Ordered by number
        assert_eq!(loaded.players[0].number, 1);
        assert_eq!(loaded.players[1].name, "Ana");

        assert!(db.get_team("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_jersey_number_rejected_by_schema() {
        let db = Database::in_memory().await.unwrap();
        let t = team("Norte");
        db.create_team(&t).await.unwrap();

        db.add_player(&Player::new(&t.id, "Uno".to_string(), 9, Position::Forward))
            .await
            .unwrap();
        let result = db
            .add_player(&Player::new(&t.id, "Dos".to_string(), 9, Position::Defender))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_list_teams_filters() {
        let db = Database::in_memory().await.unwrap();
        let a = team("Alfa");
        let mut b = team("Beta");
        b.city = "Córdoba".to_string();
        b.category = "juvenil".to_string();
        db.create_team(&a).await.unwrap();
        db.create_team(&b).await.unwrap();

        let all = db.list_teams(&TeamFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let filter = TeamFilter {
            category: Some("JUVENIL".to_string()),
            ..Default::default()
        };
        let juveniles = db.list_teams(&filter).await.unwrap();
        assert_eq!(juveniles.len(), 1);
        assert_eq!(juveniles[0].id, b.id);
    }

    #[tokio::test]
    async fn test_club_categories_and_delete_detaches() {
        let db = Database::in_memory().await.unwrap();
        let club = Club::new(
            "Club Atlético".to_string(),
            Location {
                address: "Calle 1".to_string(),
                city: "Rosario".to_string(),
            },
        );
        db.create_club(&club).await.unwrap();

        let mut first = team("Atlético A");
        first.club_id = Some(club.id.clone());
        let mut second = team("Atlético Sub-15");
        second.club_id = Some(club.id.clone());
        second.category = "sub-15".to_string();
        db.create_team(&first).await.unwrap();
        db.create_team(&second).await.unwrap();

        let loaded = db.get_club(&club.id).await.unwrap().unwrap();
        assert_eq!(loaded.categories.len(), 2);
        assert_eq!(loaded.categories["senior"], vec![first.id.clone()]);

        assert!(db.delete_club(&club.id).await.unwrap());
        let orphan = db.get_team(&first.id).await.unwrap().unwrap();
        assert!(orphan.club_id.is_none());
    }

    #[tokio::test]
    async fn test_field_coordinates() {
        let db = Database::in_memory().await.unwrap();
        let mut field = Field::new(
            "Cancha 3".to_string(),
            "Av. Siempre Viva".to_string(),
            "Rosario".to_string(),
            FootballType::Five,
            Surface::Artificial,
        );
        field.coordinates = Some(Coordinates { lat: -32.95, lng: -60.65 });
        db.create_field(&field).await.unwrap();

        let loaded = db.get_field(&field.id).await.unwrap().unwrap();
        assert_eq!(loaded.coordinates, field.coordinates);
        assert_eq!(loaded.surface, Surface::Artificial);
        assert_eq!(db.list_fields(Some("rosario")).await.unwrap().len(), 1);
        assert!(db.list_fields(Some("Lima")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_tournament_stores_fixture() {
        let db = Database::in_memory().await.unwrap();
        let t = seeded_tournament(&db, 4, TournamentFormat::Groups).await;

        let loaded = db.get_tournament(&t.id).await.unwrap().unwrap();
        assert_eq!(loaded.team_ids.len(), 4);
        assert_eq!(loaded.settings, t.settings);
        assert_eq!(loaded.phase, Phase::Groups);

        let matches = db.get_matches(&t.id).await.unwrap();
        assert_eq!(matches.len(), 6);
        assert!(matches.windows(2).all(|w| w[0].round <= w[1].round));

        let entries = db.tournament_entries(&t.id).await.unwrap();
        assert!(entries.iter().all(|e| e.group.as_deref() == Some("A") && !e.eliminated));
    }

    #[tokio::test]
    async fn test_failed_fixture_leaves_nothing_behind() {
        let db = Database::in_memory().await.unwrap();
        let t = seeded_tournament(&db, 4, TournamentFormat::Groups).await;

        // Same tournament id again: the insert fails and must roll back
        let mut again = t.clone();
        again.name = "Copia".to_string();
        let fixture = generate_fixture(&again, &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(db.create_tournament(&again, &fixture).await.is_err());

        assert_eq!(db.get_matches(&t.id).await.unwrap().len(), 6);
        assert_eq!(db.get_tournament(&t.id).await.unwrap().unwrap().name, "Liga");
    }

    #[tokio::test]
    async fn test_update_match_result() {
        let db = Database::in_memory().await.unwrap();
        let t = seeded_tournament(&db, 2, TournamentFormat::Knockout).await;

        let mut m = db.get_matches(&t.id).await.unwrap().remove(0);
        m.status = MatchStatus::Finished;
        m.home_goals = Some(1);
        m.away_goals = Some(1);
        m.home_penalties = Some(4);
        m.away_penalties = Some(2);
        db.update_match(&m).await.unwrap();

        let loaded = db.get_match(&m.id).await.unwrap().unwrap();
        assert_eq!(loaded.winner(), Some(m.home_team_id.as_str()));
        assert_eq!(loaded.stage.as_deref(), Some("final"));
    }

    #[tokio::test]
    async fn test_active_tournaments_for_team() {
        let db = Database::in_memory().await.unwrap();
        let mut t = seeded_tournament(&db, 3, TournamentFormat::Groups).await;
        let team_id = t.team_ids[0].clone();

        assert_eq!(db.active_tournaments_for_team(&team_id).await.unwrap(), vec![t.id.clone()]);

        t.status = TournamentStatus::Finished;
        t.phase = Phase::Finished;
        db.update_tournament_state(&t).await.unwrap();
        assert!(db.active_tournaments_for_team(&team_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_follow_and_unfollow() {
        let db = Database::in_memory().await.unwrap();
        let t = seeded_tournament(&db, 3, TournamentFormat::Groups).await;
        let user = User::new("Fan".to_string(), Role::Spectator);
        db.create_user(&user).await.unwrap();

        db.follow(&user.id, &t.id).await.unwrap();
        db.follow(&user.id, &t.id).await.unwrap();

        let loaded = db.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(loaded.followed_tournaments, vec![t.id.clone()]);
        assert_eq!(db.followers(&t.id).await.unwrap().len(), 1);

        assert!(db.unfollow(&user.id, &t.id).await.unwrap());
        assert!(!db.unfollow(&user.id, &t.id).await.unwrap());

        // Deleting the tournament drops the remaining follows
        db.follow(&user.id, &t.id).await.unwrap();
        db.delete_tournament(&t.id).await.unwrap();
        assert!(db.followed_tournaments(&user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_friendly_round_trip_and_filters() {
        let db = Database::in_memory().await.unwrap();
        let home = team("Local");
        let away = team("Visitante");
        db.create_team(&home).await.unwrap();
        db.create_team(&away).await.unwrap();

        let mut open = Friendly::availability(&home.id, "Parque".to_string());
        open.date = NaiveDate::from_ymd_opt(2026, 5, 2);
        db.create_friendly(&open).await.unwrap();
        let direct = Friendly::proposal(&away.id, &home.id, "Polideportivo".to_string());
        db.create_friendly(&direct).await.unwrap();

        let loaded = db.get_friendly(&open.id).await.unwrap().unwrap();
        assert_eq!(loaded.date, open.date);
        assert!(loaded.is_availability);

        let available = db.list_friendlies(Some(FriendlyStatus::Available), None).await.unwrap();
        assert_eq!(available.len(), 1);

        let for_home = db.list_friendlies(None, Some(&home.id)).await.unwrap();
        assert_eq!(for_home.len(), 2);

        // Deleting a team removes its friendlies
        db.delete_team(&away.id).await.unwrap();
        assert!(db.get_friendly(&direct.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_json_column_is_reported() {
        let db = Database::in_memory().await.unwrap();
        let t = team("Roto");
        db.create_team(&t).await.unwrap();

        sqlx::query("UPDATE teams SET colors = 'not json' WHERE id = ?")
            .bind(&t.id)
            .execute(db.pool())
            .await
            .unwrap();

        let err = db.get_team(&t.id).await.unwrap_err();
        assert!(err.to_string().contains("Corrupt colors value in teams"));
    }
}
