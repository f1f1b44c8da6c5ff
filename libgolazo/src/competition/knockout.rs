//! Knockout progression: drawing the bracket from group tables and moving
//! winners from one round to the next.

use super::standings::{compare_rows, StandingRow};
use crate::error::CompetitionError;
use crate::types::{Match, MatchStatus};

/// What a finished knockout round produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    /// Teams in bracket order for the next round: byes first, then winners
    pub advancing: Vec<String>,
    pub eliminated: Vec<String>,
}

impl RoundOutcome {
    /// The champion, once a single team is left
    pub fn champion(&self) -> Option<&str> {
        match self.advancing.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

/// Order the classified teams of each group so that successive pairing
/// gives A1 v B2, B1 v A2, and so on.
///
/// The winner of group `i` meets the runner-up of group `i + 1` (wrapping);
/// with a single group that is 1st v 2nd. Teams classified below second
/// are pooled by rank and paired best v worst. An odd pool leaves its
/// middle team last, where it gets the bye. With one team per group the
/// winners are paired in group order.
pub fn seed_from_groups(tables: &[(String, Vec<StandingRow>)], per_group: usize) -> Vec<String> {
    let groups = tables.len();
    if groups == 0 {
        return Vec::new();
    }

    let smallest = tables.iter().map(|(_, rows)| rows.len()).min().unwrap_or(0);
    let per = per_group.min(smallest);

    if per == 1 {
        return tables.iter().map(|(_, rows)| rows[0].team_id.clone()).collect();
    }

    let mut order = Vec::with_capacity(groups * per);
    if per >= 2 {
        for i in 0..groups {
            order.push(tables[i].1[0].team_id.clone());
            order.push(tables[(i + 1) % groups].1[1].team_id.clone());
        }
    }

    // Third place and below, best rank first
    let pool: Vec<&str> = (2..per)
        .flat_map(|rank| tables.iter().map(move |(_, rows)| rows[rank].team_id.as_str()))
        .collect();
    let (mut low, mut high) = (0, pool.len());
    while high - low >= 2 {
        order.push(pool[low].to_string());
        order.push(pool[high - 1].to_string());
        low += 1;
        high -= 1;
    }
    if high > low {
        order.push(pool[low].to_string());
    }

    order
}

/// Settle a knockout round.
///
/// `entrants` are the teams that started the round in bracket order; any of
/// them without a match had a bye. Every match must be finished with a
/// winner, on goals or penalties.
pub fn resolve_round(entrants: &[String], round: &[Match]) -> Result<RoundOutcome, CompetitionError> {
    let pending = round
        .iter()
        .filter(|m| m.status != MatchStatus::Finished)
        .count();
    if pending > 0 {
        return Err(CompetitionError::RoundIncomplete { pending });
    }

    let mut winners = Vec::with_capacity(round.len());
    let mut eliminated = Vec::with_capacity(round.len());
    for m in round {
        let winner = m
            .winner()
            .ok_or_else(|| CompetitionError::UndecidedTie(m.id.clone()))?
            .to_string();
        let loser = if winner == m.home_team_id {
            m.away_team_id.clone()
        } else {
            m.home_team_id.clone()
        };
        winners.push(winner);
        eliminated.push(loser);
    }

    let mut advancing: Vec<String> = entrants
        .iter()
        .filter(|team| !round.iter().any(|m| m.involves(team)))
        .cloned()
        .collect();
    advancing.extend(winners);

    Ok(RoundOutcome {
        advancing,
        eliminated,
    })
}

/// Best team across several tables: each group leader, compared by the
/// usual table order.
pub fn best_leader(tables: &[(String, Vec<StandingRow>)]) -> Option<String> {
    tables
        .iter()
        .filter_map(|(_, rows)| rows.first())
        .min_by(|a, b| compare_rows(a, b))
        .map(|row| row.team_id.clone())
}
