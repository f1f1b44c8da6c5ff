//! Storage health checks and repairs

use serde::Serialize;
use sqlx::Row;
use std::sync::Arc;

use crate::error::{DbError, Result};
use crate::types::{Colors, Preferences, TournamentSettings};
use crate::Database;

/// JSON columns and the default written back when one does not parse
struct JsonColumn {
    table: &'static str,
    column: &'static str,
    check: fn(&str) -> std::result::Result<(), serde_json::Error>,
    fallback: fn() -> String,
}

fn parses<T: serde::de::DeserializeOwned>(raw: &str) -> std::result::Result<(), serde_json::Error> {
    serde_json::from_str::<T>(raw).map(|_| ())
}

fn default_json<T: Default + Serialize>() -> String {
    serde_json::to_string(&T::default()).unwrap_or_else(|_| "{}".to_string())
}

const JSON_COLUMNS: &[JsonColumn] = &[
    JsonColumn {
        table: "teams",
        column: "colors",
        check: parses::<Colors>,
        fallback: default_json::<Colors>,
    },
    JsonColumn {
        table: "tournaments",
        column: "settings",
        check: parses::<TournamentSettings>,
        fallback: default_json::<TournamentSettings>,
    },
    JsonColumn {
        table: "users",
        column: "preferences",
        check: parses::<Preferences>,
        fallback: default_json::<Preferences>,
    },
];

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct JsonIssue {
    pub table: String,
    pub column: String,
    pub id: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DanglingTeam {
    pub tournament_id: String,
    pub team_id: String,
}

/// Problems found in the database
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiagnosticReport {
    /// Lines reported by `PRAGMA integrity_check` other than "ok"
    pub integrity: Vec<String>,
    /// Rows violating a foreign key
    pub foreign_keys: Vec<String>,
    pub corrupt_json: Vec<JsonIssue>,
    /// Tournament entries whose team no longer exists
    pub dangling_teams: Vec<DanglingTeam>,
}

impl DiagnosticReport {
    pub fn is_healthy(&self) -> bool {
        self.integrity.is_empty()
            && self.foreign_keys.is_empty()
            && self.corrupt_json.is_empty()
            && self.dangling_teams.is_empty()
    }

    pub fn problem_count(&self) -> usize {
        self.integrity.len()
            + self.foreign_keys.len()
            + self.corrupt_json.len()
            + self.dangling_teams.len()
    }
}

/// What `repair` changed
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RepairSummary {
    pub json_reset: usize,
    pub dangling_removed: usize,
}

#[derive(Clone)]
pub struct DiagnosticsService {
    db: Arc<Database>,
}

impl DiagnosticsService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Run every check without changing anything
    pub async fn check(&self) -> Result<DiagnosticReport> {
        let pool = self.db.pool();
        let mut report = DiagnosticReport::default();

        let rows = sqlx::query("PRAGMA integrity_check")
            .fetch_all(pool)
            .await
            .map_err(DbError::SqlxError)?;
        for r in rows {
            let line: String = r.get(0);
            if line != "ok" {
                report.integrity.push(line);
            }
        }

        let rows = sqlx::query("PRAGMA foreign_key_check")
            .fetch_all(pool)
            .await
            .map_err(DbError::SqlxError)?;
        for r in rows {
            let table: String = r.get(0);
            let rowid: Option<i64> = r.get(1);
            let parent: String = r.get(2);
            report.foreign_keys.push(format!(
                "{} row {} references a missing {} row",
                table,
                rowid.map(|id| id.to_string()).unwrap_or_else(|| "?".to_string()),
                parent
            ));
        }

        for col in JSON_COLUMNS {
            let sql = format!("SELECT id, {} AS value FROM {}", col.column, col.table);
            let rows = sqlx::query(&sql)
                .fetch_all(pool)
                .await
                .map_err(DbError::SqlxError)?;
            for r in rows {
                let raw: String = r.get("value");
                if let Err(e) = (col.check)(&raw) {
                    report.corrupt_json.push(JsonIssue {
                        table: col.table.to_string(),
                        column: col.column.to_string(),
                        id: r.get("id"),
                        error: e.to_string(),
                    });
                }
            }
        }

        let rows = sqlx::query(
            r#"
            SELECT tt.tournament_id, tt.team_id
            FROM tournament_teams tt
            LEFT JOIN teams t ON t.id = tt.team_id
            WHERE t.id IS NULL
            ORDER BY tt.tournament_id, tt.position
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(DbError::SqlxError)?;
        report.dangling_teams = rows
            .iter()
            .map(|r| DanglingTeam {
                tournament_id: r.get("tournament_id"),
                team_id: r.get("team_id"),
            })
            .collect();

        if !report.is_healthy() {
            tracing::warn!(problems = report.problem_count(), "storage check found problems");
        }
        Ok(report)
    }

    /// Fix what can be fixed safely: reset unreadable JSON columns to
    /// their defaults and drop tournament entries of deleted teams.
    ///
    /// Integrity and foreign key problems are only reported.
    pub async fn repair(&self, report: &DiagnosticReport) -> Result<RepairSummary> {
        let mut tx = self.db.begin().await?;
        let mut summary = RepairSummary::default();

        for issue in &report.corrupt_json {
            let Some(col) = JSON_COLUMNS
                .iter()
                .find(|c| c.table == issue.table && c.column == issue.column)
            else {
                continue;
            };
            let sql = format!("UPDATE {} SET {} = ? WHERE id = ?", col.table, col.column);
            let result = sqlx::query(&sql)
                .bind((col.fallback)())
                .bind(&issue.id)
                .execute(&mut *tx)
                .await
                .map_err(DbError::SqlxError)?;
            summary.json_reset += result.rows_affected() as usize;
        }

        for dangling in &report.dangling_teams {
            let result =
                sqlx::query("DELETE FROM tournament_teams WHERE tournament_id = ? AND team_id = ?")
                    .bind(&dangling.tournament_id)
                    .bind(&dangling.team_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(DbError::SqlxError)?;
            summary.dangling_removed += result.rows_affected() as usize;
        }

        tx.commit().await.map_err(DbError::SqlxError)?;
        tracing::info!(
            json_reset = summary.json_reset,
            dangling_removed = summary.dangling_removed,
            "storage repaired"
        );
        Ok(summary)
    }
}
