//! Fixture generation: round robin groups and knockout rounds.

use chrono::{Days, NaiveDate};
use rand::Rng;
use std::collections::HashSet;

use super::seeding::{partition_groups, shuffle};
use crate::error::CompetitionError;
use crate::types::{Match, Phase, Tournament, TournamentFormat, TournamentSettings};

/// Most teams a tournament accepts
pub const MAX_TEAMS: usize = 64;

/// One scheduled meeting between two teams
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub home: String,
    pub away: String,
    pub round: u32,
}

/// A team's place in the draw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seed {
    pub team_id: String,
    pub group: Option<String>,
    /// Position in the draw, 0-based
    pub position: usize,
}

/// Everything produced when a tournament is drawn
#[derive(Debug, Clone)]
pub struct Fixture {
    pub seeds: Vec<Seed>,
    pub matches: Vec<Match>,
}

/// Pair every team with every other exactly once, using the circle method.
///
/// Rounds are numbered from `first_round`. With an odd number of teams one
/// team rests each round. Home and away alternate between rounds.
pub fn round_robin(teams: &[String], first_round: u32) -> Vec<Pairing> {
    let mut slots: Vec<Option<&String>> = teams.iter().map(Some).collect();
    if slots.len() % 2 == 1 {
        slots.push(None);
    }

    let n = slots.len();
    if n < 2 {
        return Vec::new();
    }

    let mut pairings = Vec::with_capacity(teams.len() * teams.len().saturating_sub(1) / 2);
    for r in 0..(n - 1) {
        for i in 0..n / 2 {
            let (Some(a), Some(b)) = (slots[i], slots[n - 1 - i]) else {
                continue;
            };
            let (home, away) = if r % 2 == 0 { (a, b) } else { (b, a) };
            pairings.push(Pairing {
                home: home.clone(),
                away: away.clone(),
                round: first_round + r as u32,
            });
        }
        // First slot stays put, the rest rotate one step
        slots[1..].rotate_right(1);
    }

    pairings
}

/// Pair teams in order: 0 vs 1, 2 vs 3, ...
///
/// Returns the pairings and the team left without an opponent, which goes
/// through to the next round.
pub fn knockout_pairings(teams: &[String]) -> (Vec<(String, String)>, Option<String>) {
    let pairs = teams
        .chunks(2)
        .filter(|c| c.len() == 2)
        .map(|c| (c[0].clone(), c[1].clone()))
        .collect();
    let bye = if teams.len() % 2 == 1 {
        teams.last().cloned()
    } else {
        None
    };
    (pairs, bye)
}

/// Name of a knockout stage by the number of teams entering it
pub fn stage_name(entrants: usize) -> String {
    match entrants {
        0..=2 => "final".to_string(),
        3..=4 => "semifinal".to_string(),
        5..=8 => "quarterfinal".to_string(),
        9..=16 => "round-of-16".to_string(),
        n => format!("round-of-{}", n.next_power_of_two()),
    }
}

/// Match day of a round given the tournament settings
pub fn round_date(settings: &TournamentSettings, round: u32) -> Option<NaiveDate> {
    let start = settings.start_date?;
    let offset = u64::from(round.saturating_sub(1)) * u64::from(settings.days_between_rounds);
    start.checked_add_days(Days::new(offset))
}

/// Check the team list can be drawn for the format
pub fn check_entrants(format: TournamentFormat, team_ids: &[String]) -> Result<(), CompetitionError> {
    let mut seen = HashSet::new();
    for id in team_ids {
        if !seen.insert(id.as_str()) {
            return Err(CompetitionError::DuplicateTeam(id.clone()));
        }
    }

    if team_ids.len() < format.min_teams() {
        return Err(CompetitionError::NotEnoughTeams {
            format: format.to_string(),
            required: format.min_teams(),
            actual: team_ids.len(),
        });
    }

    if team_ids.len() > MAX_TEAMS {
        return Err(CompetitionError::TooManyTeams {
            max: MAX_TEAMS,
            actual: team_ids.len(),
        });
    }

    Ok(())
}

/// Build the knockout matches of one round from teams in bracket order
pub fn knockout_round(
    tournament: &Tournament,
    entrants: &[String],
    round: u32,
) -> Vec<Match> {
    let stage = stage_name(entrants.len());
    let (pairs, bye) = knockout_pairings(entrants);
    if let Some(team) = bye {
        tracing::debug!(tournament = %tournament.id, team = %team, round, "bye");
    }

    pairs
        .into_iter()
        .map(|(home, away)| {
            let mut m = Match::new(&tournament.id, &home, &away, round, Phase::Knockout);
            m.stage = Some(stage.clone());
            m.date = round_date(&tournament.settings, round);
            m.time = Some(tournament.settings.kickoff);
            m
        })
        .collect()
}

/// Draw a tournament: shuffle the teams, then build its opening fixture.
///
/// Group formats get every group's round robin; the knockout format gets
/// its first round. The knockout of a groups-knockout tournament is drawn
/// later from the final standings.
pub fn generate_fixture<R: Rng + ?Sized>(
    tournament: &Tournament,
    rng: &mut R,
) -> Result<Fixture, CompetitionError> {
    check_entrants(tournament.format, &tournament.team_ids)?;

    let mut order = tournament.team_ids.clone();
    shuffle(&mut order, rng);

    let settings = &tournament.settings;
    let mut seeds = Vec::with_capacity(order.len());
    let mut matches = Vec::new();

    if tournament.format.has_group_stage() {
        let groups = partition_groups(&order, settings.teams_per_group);
        let mut position = 0;
        for (label, members) in groups {
            for pairing in round_robin(&members, 1) {
                let mut m = Match::new(
                    &tournament.id,
                    &pairing.home,
                    &pairing.away,
                    pairing.round,
                    Phase::Groups,
                );
                m.group = Some(label.clone());
                m.date = round_date(settings, pairing.round);
                m.time = Some(settings.kickoff);
                matches.push(m);
            }
            for team_id in members {
                seeds.push(Seed {
                    team_id,
                    group: Some(label.clone()),
                    position,
                });
                position += 1;
            }
        }
    } else {
        matches = knockout_round(tournament, &order, 1);
        seeds = order
            .into_iter()
            .enumerate()
            .map(|(position, team_id)| Seed {
                team_id,
                group: None,
                position,
            })
            .collect();
    }

    tracing::info!(
        tournament = %tournament.id,
        format = %tournament.format,
        teams = seeds.len(),
        matches = matches.len(),
        "fixture generated"
    );

    Ok(Fixture { seeds, matches })
}
