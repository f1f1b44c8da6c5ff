//! Whole-database export and import as a single JSON document
//!
//! The document keeps the collection names of the mobile app's storage
//! (`equipos`, `torneos`, ...), so data moved between devices stays
//! recognizable.

use serde::{Deserialize, Serialize};
use sqlx::{Row, SqliteConnection};
use std::sync::Arc;

use crate::db::{
    clear_entries, insert_club, insert_entry, insert_field, insert_friendly, insert_match,
    insert_team, insert_tournament, insert_user, OnConflict, TeamFilter, TournamentEntry,
    TournamentFilter,
};
use crate::error::{DbError, GolazoError, Result};
use crate::types::{Club, Field, Friendly, Match, MatchStatus, Phase, Team, Tournament, User};
use crate::Database;

pub const SNAPSHOT_VERSION: u32 = 1;

/// A team's place in a tournament draw
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryRecord {
    pub tournament_id: String,
    pub team_id: String,
    pub group: Option<String>,
    pub position: usize,
    #[serde(default)]
    pub eliminated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    #[serde(default)]
    pub equipos: Vec<Team>,
    #[serde(default)]
    pub torneos: Vec<Tournament>,
    /// Draw positions; rebuilt from `torneos[].team_ids` when absent
    #[serde(default)]
    pub inscripciones: Vec<EntryRecord>,
    #[serde(default)]
    pub partidos: Vec<Match>,
    #[serde(default)]
    pub amistosos: Vec<Friendly>,
    #[serde(default)]
    pub clubes: Vec<Club>,
    #[serde(default)]
    pub campos: Vec<Field>,
    #[serde(default)]
    pub usuarios: Vec<User>,
}

/// Records written and skipped by an import
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub replaced: usize,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct DataService {
    db: Arc<Database>,
}

async fn exists(conn: &mut SqliteConnection, table: &str, id: &str) -> Result<bool> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?", table);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DbError::SqlxError)?;
    Ok(row.is_some())
}

/// Decide what to do with one record: `None` skips it, otherwise it is
/// written with the returned conflict mode.
async fn claim(
    conn: &mut SqliteConnection,
    table: &str,
    id: &str,
    replace: bool,
    summary: &mut ImportSummary,
) -> Result<Option<OnConflict>> {
    if !exists(conn, table, id).await? {
        summary.imported += 1;
        return Ok(Some(OnConflict::Fail));
    }
    if replace {
        summary.replaced += 1;
        Ok(Some(OnConflict::Update))
    } else {
        tracing::debug!(table, id, "already present, skipped");
        summary.skipped += 1;
        Ok(None)
    }
}

/// A knockout round only closes once all its matches have a winner, and
/// nothing can replay a cancelled match.
fn check_matches(snapshot: &Snapshot) -> Result<()> {
    if let Some(m) = snapshot
        .partidos
        .iter()
        .find(|m| m.phase == Phase::Knockout && m.status == MatchStatus::Cancelled)
    {
        return Err(GolazoError::InvalidInput(format!(
            "match {} is a cancelled knockout match; its round could never be closed",
            m.id
        )));
    }
    Ok(())
}

impl DataService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Read everything into a snapshot
    pub async fn export(&self) -> Result<Snapshot> {
        let torneos = self.db.list_tournaments(&TournamentFilter::default()).await?;

        let mut inscripciones = Vec::new();
        let mut partidos = Vec::new();
        for t in &torneos {
            for entry in self.db.tournament_entries(&t.id).await? {
                inscripciones.push(EntryRecord {
                    tournament_id: t.id.clone(),
                    team_id: entry.team_id,
                    group: entry.group,
                    position: entry.position,
                    eliminated: entry.eliminated,
                });
            }
            partidos.extend(self.db.get_matches(&t.id).await?);
        }

        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            equipos: self.db.list_teams(&TeamFilter::default()).await?,
            torneos,
            inscripciones,
            partidos,
            amistosos: self.db.list_friendlies(None, None).await?,
            clubes: self.db.list_clubs(None).await?,
            campos: self.db.list_fields(None).await?,
            usuarios: self.db.list_users().await?,
        };
        tracing::info!(
            teams = snapshot.equipos.len(),
            tournaments = snapshot.torneos.len(),
            matches = snapshot.partidos.len(),
            "snapshot exported"
        );
        Ok(snapshot)
    }

    /// Load a snapshot in one transaction.
    ///
    /// Records whose id already exists are skipped, or overwritten when
    /// `replace` is set. A replaced tournament gets the snapshot's draw;
    /// its matches and follows that the snapshot lacks are kept. Any
    /// failure leaves the database untouched.
    pub async fn import(&self, snapshot: &Snapshot, replace: bool) -> Result<ImportSummary> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(GolazoError::InvalidInput(format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        check_matches(snapshot)?;

        let mut tx = self.db.begin().await?;
        let mut summary = ImportSummary::default();

        // Parents before children so foreign keys hold at every step.
        // Existing rows are overwritten in place, never deleted, so local
        // records that reference them survive a replace.
        for club in &snapshot.clubes {
            if let Some(mode) = claim(&mut tx, "clubs", &club.id, replace, &mut summary).await? {
                insert_club(&mut tx, club, mode).await?;
            }
        }
        for field in &snapshot.campos {
            if let Some(mode) = claim(&mut tx, "fields", &field.id, replace, &mut summary).await? {
                insert_field(&mut tx, field, mode).await?;
            }
        }
        for team in &snapshot.equipos {
            if let Some(mode) = claim(&mut tx, "teams", &team.id, replace, &mut summary).await? {
                insert_team(&mut tx, team, mode).await?;
            }
        }
        for tournament in &snapshot.torneos {
            let Some(mode) =
                claim(&mut tx, "tournaments", &tournament.id, replace, &mut summary).await?
            else {
                continue;
            };
            insert_tournament(&mut tx, tournament, mode).await?;
            if mode == OnConflict::Update {
                clear_entries(&mut tx, &tournament.id).await?;
            }

            let recorded: Vec<&EntryRecord> = snapshot
                .inscripciones
                .iter()
                .filter(|e| e.tournament_id == tournament.id)
                .collect();
            let entries: Vec<TournamentEntry> = if recorded.is_empty() {
                tournament
                    .team_ids
                    .iter()
                    .enumerate()
                    .map(|(position, team_id)| TournamentEntry {
                        team_id: team_id.clone(),
                        group: None,
                        position,
                        eliminated: false,
                    })
                    .collect()
            } else {
                recorded
                    .into_iter()
                    .map(|e| TournamentEntry {
                        team_id: e.team_id.clone(),
                        group: e.group.clone(),
                        position: e.position,
                        eliminated: e.eliminated,
                    })
                    .collect()
            };
            for entry in &entries {
                insert_entry(&mut tx, &tournament.id, entry).await?;
            }
        }
        for m in &snapshot.partidos {
            if let Some(mode) = claim(&mut tx, "matches", &m.id, replace, &mut summary).await? {
                insert_match(&mut tx, m, mode).await?;
            }
        }
        for friendly in &snapshot.amistosos {
            if let Some(mode) =
                claim(&mut tx, "friendlies", &friendly.id, replace, &mut summary).await?
            {
                insert_friendly(&mut tx, friendly, mode).await?;
            }
        }
        for user in &snapshot.usuarios {
            let Some(mode) = claim(&mut tx, "users", &user.id, replace, &mut summary).await? else {
                continue;
            };
            // Follows of tournaments this database does not have are dropped
            let mut user = user.clone();
            let mut followed = Vec::with_capacity(user.followed_tournaments.len());
            for id in &user.followed_tournaments {
                if exists(&mut tx, "tournaments", id).await? {
                    followed.push(id.clone());
                }
            }
            user.followed_tournaments = followed;
            insert_user(&mut tx, &user, mode).await?;
        }

        tx.commit().await.map_err(DbError::SqlxError)?;
        tracing::info!(
            imported = summary.imported,
            replaced = summary.replaced,
            skipped = summary.skipped,
            "snapshot imported"
        );
        Ok(summary)
    }

    /// Number of rows per table, for a quick look at a database
    pub async fn counts(&self) -> Result<Vec<(&'static str, i64)>> {
        let mut counts = Vec::new();
        for table in [
            "clubs",
            "fields",
            "teams",
            "players",
            "tournaments",
            "matches",
            "friendlies",
            "users",
        ] {
            let sql = format!("SELECT COUNT(*) AS n FROM {}", table);
            let row = sqlx::query(&sql)
                .fetch_one(self.db.pool())
                .await
                .map_err(DbError::SqlxError)?;
            counts.push((table, row.get::<i64, _>("n")));
        }
        Ok(counts)
    }
}
