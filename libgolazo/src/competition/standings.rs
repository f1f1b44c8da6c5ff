//! Group tables.
//!
//! Standings are always recomputed from the full list of matches, so the
//! computation is pure and calling it twice gives the same table.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::types::{Match, TournamentSettings};

/// One line of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingRow {
    pub team_id: String,
    pub team_name: String,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub points: u32,
}

impl StandingRow {
    fn empty(team_id: &str, team_name: &str) -> Self {
        Self {
            team_id: team_id.to_string(),
            team_name: team_name.to_string(),
            played: 0,
            won: 0,
            drawn: 0,
            lost: 0,
            goals_for: 0,
            goals_against: 0,
            points: 0,
        }
    }

    pub fn goal_difference(&self) -> i64 {
        i64::from(self.goals_for) - i64::from(self.goals_against)
    }

    fn record(&mut self, scored: u32, conceded: u32, settings: &TournamentSettings) {
        self.played += 1;
        self.goals_for += scored;
        self.goals_against += conceded;
        match scored.cmp(&conceded) {
            Ordering::Greater => {
                self.won += 1;
                self.points += u32::from(settings.points_win);
            }
            Ordering::Equal => {
                self.drawn += 1;
                self.points += u32::from(settings.points_draw);
            }
            Ordering::Less => {
                self.lost += 1;
                self.points += u32::from(settings.points_loss);
            }
        }
    }
}

/// Table order: points, goal difference and goals for descending, then name.
pub fn compare_rows(a: &StandingRow, b: &StandingRow) -> Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| b.goal_difference().cmp(&a.goal_difference()))
        .then_with(|| b.goals_for.cmp(&a.goals_for))
        .then_with(|| a.team_name.cmp(&b.team_name))
        .then_with(|| a.team_id.cmp(&b.team_id))
}

/// Build the table for `teams` (id, name) from `matches`.
///
/// Only played matches between two listed teams count. Teams without a
/// played match appear with zeros.
pub fn compute_standings(
    teams: &[(String, String)],
    matches: &[Match],
    settings: &TournamentSettings,
) -> Vec<StandingRow> {
    let mut rows: HashMap<&str, StandingRow> = teams
        .iter()
        .map(|(id, name)| (id.as_str(), StandingRow::empty(id, name)))
        .collect();

    for m in matches {
        let Some((home_goals, away_goals)) = m.score() else {
            continue;
        };
        if !rows.contains_key(m.home_team_id.as_str()) || !rows.contains_key(m.away_team_id.as_str()) {
            tracing::debug!(match_id = %m.id, "match outside the table, skipped");
            continue;
        }

        if let Some(row) = rows.get_mut(m.home_team_id.as_str()) {
            row.record(home_goals, away_goals, settings);
        }
        if let Some(row) = rows.get_mut(m.away_team_id.as_str()) {
            row.record(away_goals, home_goals, settings);
        }
    }

    let mut table: Vec<StandingRow> = rows.into_values().collect();
    table.sort_by(compare_rows);
    table
}

/// The first `n` teams of a table
pub fn classified(table: &[StandingRow], n: usize) -> Vec<String> {
    table.iter().take(n).map(|row| row.team_id.clone()).collect()
}
