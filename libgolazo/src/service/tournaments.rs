//! Tournament lifecycle: draw, results, standings and progression
//!
//! A tournament is created `planned` with its opening fixture, `start`ed,
//! fed results, and moved on with `advance` until a champion is crowned.
//! `advance` closes the group stage or the current knockout round; it never
//! runs implicitly, so results stay editable until the organizer moves on.

use chrono::{NaiveDate, NaiveTime};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::events::{Event, EventBus};
use super::require_coach;
use super::validation::{ensure_valid, validate_tournament};
use crate::competition::fixtures::knockout_round;
use crate::competition::knockout::best_leader;
use crate::competition::{
    compute_standings, generate_fixture, resolve_round, seed_from_groups, StandingRow,
};
use crate::db::{TournamentEntry, TournamentFilter};
use crate::error::{CompetitionError, ConfigError, GolazoError, Result};
use crate::types::{
    FootballType, Match, MatchStatus, Phase, Tournament, TournamentFormat, TournamentSettings,
    TournamentStatus,
};
use crate::{Config, Database};

/// Details of a new tournament
#[derive(Debug, Clone)]
pub struct NewTournament {
    pub name: String,
    pub city: String,
    pub category: String,
    pub football_type: FootballType,
    pub format: TournamentFormat,
    pub team_ids: Vec<String>,
    /// Rules to play by; the configured defaults when `None`
    pub settings: Option<TournamentSettings>,
    /// Fixed seed for a reproducible draw
    pub seed: Option<u64>,
}

/// Final score of a match
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchResult {
    pub home_goals: u32,
    pub away_goals: u32,
    /// Shoot-out, only for level knockout matches
    pub penalties: Option<(u32, u32)>,
}

/// Schedule changes for a match; `None` leaves a value as it is
#[derive(Debug, Clone, Default)]
pub struct Reschedule {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub field_id: Option<String>,
}

/// Table of one group; `group` is `None` for knockout tournaments
#[derive(Debug, Clone, Serialize)]
pub struct GroupTable {
    pub group: Option<String>,
    pub rows: Vec<StandingRow>,
}

/// What `advance` did
#[derive(Debug, Clone)]
pub enum Advance {
    /// A new knockout round was drawn
    NextRound {
        round: u32,
        stage: String,
        matches: Vec<Match>,
    },
    Finished { champion_id: Option<String> },
}

#[derive(Clone)]
pub struct TournamentService {
    db: Arc<Database>,
    config: Arc<Config>,
    event_bus: EventBus,
}

impl TournamentService {
    pub fn new(db: Arc<Database>, config: Arc<Config>, event_bus: EventBus) -> Self {
        Self {
            db,
            config,
            event_bus,
        }
    }

    /// Create a tournament and draw its opening fixture.
    ///
    /// Teams are shuffled, then split into groups or paired for the first
    /// knockout round. The tournament, its draw and its matches are stored
    /// together or not at all.
    pub async fn create(&self, request: NewTournament) -> Result<Tournament> {
        let creator_id = require_coach(&self.db, &self.config, "create tournaments").await?;

        let mut settings = request
            .settings
            .unwrap_or_else(|| self.config.tournament.clone());
        if settings.start_date.is_none() {
            settings.start_date = Some(chrono::Local::now().date_naive());
        }

        let mut tournament = Tournament::new(
            request.name.trim().to_string(),
            request.city.trim().to_string(),
            request.category.trim().to_string(),
            request.football_type,
            request.format,
            request.team_ids,
            settings,
        );
        tournament.creator_id = creator_id;

        let mut errors = validate_tournament(&tournament);
        for team_id in &tournament.team_ids {
            match self.db.get_team(team_id).await? {
                Some(team) if team.football_type != tournament.football_type => {
                    errors.push(format!(
                        "{} plays {}, not {}",
                        team.name, team.football_type, tournament.football_type
                    ));
                }
                Some(_) => {}
                None => return Err(GolazoError::not_found("Team", team_id)),
            }
        }
        ensure_valid(errors)?;

        let mut rng = match request.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let fixture = generate_fixture(&tournament, &mut rng)?;
        tournament.team_ids = fixture.seeds.iter().map(|s| s.team_id.clone()).collect();

        self.db.create_tournament(&tournament, &fixture).await?;

        self.event_bus.emit(Event::TournamentCreated {
            tournament_id: tournament.id.clone(),
            name: tournament.name.clone(),
            teams: tournament.team_ids.len(),
            matches: fixture.matches.len(),
        });
        Ok(tournament)
    }

    pub async fn get(&self, tournament_id: &str) -> Result<Tournament> {
        self.db
            .get_tournament(tournament_id)
            .await?
            .ok_or_else(|| GolazoError::not_found("Tournament", tournament_id))
    }

    pub async fn list(&self, filter: &TournamentFilter) -> Result<Vec<Tournament>> {
        self.db.list_tournaments(filter).await
    }

    /// Move a planned tournament into play
    pub async fn start(&self, tournament_id: &str) -> Result<Tournament> {
        require_coach(&self.db, &self.config, "start tournaments").await?;
        let mut tournament = self.get(tournament_id).await?;

        match tournament.status {
            TournamentStatus::Planned => {}
            TournamentStatus::InProgress => {
                return Err(GolazoError::Conflict(format!(
                    "tournament {} has already started",
                    tournament_id
                )))
            }
            TournamentStatus::Finished => return Err(CompetitionError::AlreadyFinished.into()),
        }

        tournament.status = TournamentStatus::InProgress;
        self.db.update_tournament_state(&tournament).await?;
        tracing::info!(tournament = %tournament_id, "tournament started");

        self.event_bus.emit(Event::TournamentStarted {
            tournament_id: tournament.id.clone(),
        });
        Ok(tournament)
    }

    /// Every match of a tournament, by round
    pub async fn matches(&self, tournament_id: &str) -> Result<Vec<Match>> {
        self.get(tournament_id).await?;
        self.db.get_matches(tournament_id).await
    }

    /// Record or correct the result of a match of the current stage
    pub async fn record_result(&self, match_id: &str, result: MatchResult) -> Result<Match> {
        require_coach(&self.db, &self.config, "record results").await?;
        let mut m = self
            .db
            .get_match(match_id)
            .await?
            .ok_or_else(|| GolazoError::not_found("Match", match_id))?;
        let tournament = self.get(&m.tournament_id).await?;
        self.ensure_in_progress(&tournament)?;

        if m.status == MatchStatus::Cancelled {
            return Err(GolazoError::Conflict(format!("match {} was cancelled", match_id)));
        }
        self.ensure_current(&tournament, &m).await?;

        match result.penalties {
            None => {}
            Some(_) if m.phase != Phase::Knockout => {
                return Err(GolazoError::InvalidInput(
                    "penalties only decide knockout matches".to_string(),
                ))
            }
            Some(_) if result.home_goals != result.away_goals => {
                return Err(GolazoError::InvalidInput(
                    "penalties only apply to a level score".to_string(),
                ))
            }
            Some((home, away)) if home == away => {
                return Err(GolazoError::InvalidInput(
                    "a penalty shoot-out needs a winner".to_string(),
                ))
            }
            Some(_) => {}
        }

        m.status = MatchStatus::Finished;
        m.home_goals = Some(result.home_goals);
        m.away_goals = Some(result.away_goals);
        m.home_penalties = result.penalties.map(|(home, _)| home);
        m.away_penalties = result.penalties.map(|(_, away)| away);
        self.db.update_match(&m).await?;

        tracing::info!(
            tournament = %m.tournament_id,
            match_id = %m.id,
            score = %format!("{}-{}", result.home_goals, result.away_goals),
            "result recorded"
        );
        self.event_bus.emit(Event::ResultRecorded {
            tournament_id: m.tournament_id.clone(),
            match_id: m.id.clone(),
            home_team_id: m.home_team_id.clone(),
            away_team_id: m.away_team_id.clone(),
            home_goals: result.home_goals,
            away_goals: result.away_goals,
        });
        Ok(m)
    }

    /// Change the date, time or field of a match not yet played
    pub async fn reschedule(&self, match_id: &str, changes: Reschedule) -> Result<Match> {
        require_coach(&self.db, &self.config, "schedule matches").await?;
        let mut m = self
            .db
            .get_match(match_id)
            .await?
            .ok_or_else(|| GolazoError::not_found("Match", match_id))?;
        if m.status != MatchStatus::Scheduled {
            return Err(GolazoError::Conflict(format!(
                "match {} is {}",
                match_id,
                m.status.as_str()
            )));
        }

        if let Some(field_id) = changes.field_id {
            if self.db.get_field(&field_id).await?.is_none() {
                return Err(GolazoError::not_found("Field", &field_id));
            }
            m.field_id = Some(field_id);
        }
        if let Some(date) = changes.date {
            m.date = Some(date);
        }
        if let Some(time) = changes.time {
            m.time = Some(time);
        }

        self.db.update_match(&m).await?;
        Ok(m)
    }

    /// Tables of the group stage, or a single table for a knockout
    pub async fn standings(&self, tournament_id: &str) -> Result<Vec<GroupTable>> {
        let tournament = self.get(tournament_id).await?;
        let matches = self.db.get_matches(tournament_id).await?;
        let entries = self.db.tournament_entries(tournament_id).await?;

        let tables = self.tables(&tournament, &entries, &matches).await?;
        Ok(tables
            .into_iter()
            .map(|(group, rows)| GroupTable {
                group: Some(group).filter(|g| !g.is_empty()),
                rows,
            })
            .collect())
    }

    /// Close the current stage once all its matches are played.
    ///
    /// The group stage either crowns the best group leader (`groups`) or
    /// draws the knockout from the classified teams (`groups-knockout`). A
    /// finished knockout round draws the next one, or crowns the last team
    /// standing.
    pub async fn advance(&self, tournament_id: &str) -> Result<Advance> {
        require_coach(&self.db, &self.config, "advance tournaments").await?;
        let mut tournament = self.get(tournament_id).await?;
        self.ensure_in_progress(&tournament)?;

        let matches = self.db.get_matches(tournament_id).await?;
        let entries = self.db.tournament_entries(tournament_id).await?;
        // Checked again when the new state is written
        let seen_round = matches.iter().map(|m| m.round).max().unwrap_or(0);

        match tournament.phase {
            Phase::Groups => {
                let pending = matches
                    .iter()
                    .filter(|m| m.phase == Phase::Groups && m.status == MatchStatus::Scheduled)
                    .count();
                if pending > 0 {
                    return Err(CompetitionError::RoundIncomplete { pending }.into());
                }

                let tables = self.tables(&tournament, &entries, &matches).await?;
                if tournament.format == TournamentFormat::Groups {
                    let champion = best_leader(&tables);
                    return self.finish(&mut tournament, seen_round, champion, &[]).await;
                }

                let entrants = seed_from_groups(&tables, tournament.settings.classified_per_group);
                let classified: HashSet<&str> = entrants.iter().map(String::as_str).collect();
                let eliminated: Vec<String> = entries
                    .iter()
                    .filter(|e| !classified.contains(e.team_id.as_str()))
                    .map(|e| e.team_id.clone())
                    .collect();

                if entrants.len() < 2 {
                    let champion = entrants.into_iter().next();
                    return self
                        .finish(&mut tournament, seen_round, champion, &eliminated)
                        .await;
                }

                tournament.phase = Phase::Knockout;
                self.next_round(&tournament, &entrants, seen_round, &eliminated)
                    .await
            }
            Phase::Knockout => {
                let round = matches
                    .iter()
                    .filter(|m| m.phase == Phase::Knockout)
                    .map(|m| m.round)
                    .max()
                    .ok_or_else(|| {
                        GolazoError::Conflict(format!(
                            "tournament {} has no knockout round drawn",
                            tournament_id
                        ))
                    })?;
                let current: Vec<Match> = matches
                    .into_iter()
                    .filter(|m| m.phase == Phase::Knockout && m.round == round)
                    .collect();

                // Teams still in that did not play this round had a bye
                let mut entrants: Vec<String> = entries
                    .iter()
                    .filter(|e| !e.eliminated && !current.iter().any(|m| m.involves(&e.team_id)))
                    .map(|e| e.team_id.clone())
                    .collect();
                for m in &current {
                    entrants.push(m.home_team_id.clone());
                    entrants.push(m.away_team_id.clone());
                }

                let outcome = resolve_round(&entrants, &current)?;
                if let Some(champion) = outcome.champion() {
                    let champion = Some(champion.to_string());
                    return self
                        .finish(&mut tournament, seen_round, champion, &outcome.eliminated)
                        .await;
                }
                self.next_round(&tournament, &outcome.advancing, seen_round, &outcome.eliminated)
                    .await
            }
            Phase::Finished => Err(CompetitionError::AlreadyFinished.into()),
        }
    }

    pub async fn delete(&self, tournament_id: &str) -> Result<()> {
        require_coach(&self.db, &self.config, "delete tournaments").await?;
        if !self.db.delete_tournament(tournament_id).await? {
            return Err(GolazoError::not_found("Tournament", tournament_id));
        }
        tracing::info!(tournament = %tournament_id, "tournament deleted");
        Ok(())
    }

    /// Follow a tournament as the active user
    pub async fn follow(&self, tournament_id: &str) -> Result<()> {
        let user_id = self.profile_user()?;
        self.get(tournament_id).await?;
        self.db.follow(user_id, tournament_id).await
    }

    /// Stop following; returns whether the tournament was followed
    pub async fn unfollow(&self, tournament_id: &str) -> Result<bool> {
        let user_id = self.profile_user()?;
        self.db.unfollow(user_id, tournament_id).await
    }

    /// Tournaments the active user follows
    pub async fn followed(&self) -> Result<Vec<Tournament>> {
        let user_id = self.profile_user()?;
        let mut tournaments = Vec::new();
        for id in self.db.followed_tournaments(user_id).await? {
            if let Some(t) = self.db.get_tournament(&id).await? {
                tournaments.push(t);
            }
        }
        Ok(tournaments)
    }

    fn profile_user(&self) -> Result<&str> {
        self.config
            .active_user_id()
            .ok_or_else(|| ConfigError::MissingField("profile.user_id".to_string()).into())
    }

    fn ensure_in_progress(&self, tournament: &Tournament) -> Result<()> {
        match tournament.status {
            TournamentStatus::Planned => Err(CompetitionError::NotStarted.into()),
            TournamentStatus::InProgress => Ok(()),
            TournamentStatus::Finished => Err(CompetitionError::AlreadyFinished.into()),
        }
    }

    /// Results can change only for matches of the stage still open
    async fn ensure_current(&self, tournament: &Tournament, m: &Match) -> Result<()> {
        if m.phase != tournament.phase {
            return Err(GolazoError::Conflict(format!(
                "the {} stage of this tournament is closed",
                m.phase.as_str()
            )));
        }
        if m.phase == Phase::Knockout {
            let latest = self
                .db
                .get_matches(&tournament.id)
                .await?
                .iter()
                .filter(|other| other.phase == Phase::Knockout)
                .map(|other| other.round)
                .max()
                .unwrap_or(m.round);
            if m.round != latest {
                return Err(GolazoError::Conflict(format!(
                    "round {} is closed; round {} is being played",
                    m.round, latest
                )));
            }
        }
        Ok(())
    }

    /// Group label to table. Knockout tournaments get one table under "".
    async fn tables(
        &self,
        tournament: &Tournament,
        entries: &[TournamentEntry],
        matches: &[Match],
    ) -> Result<Vec<(String, Vec<StandingRow>)>> {
        let ids: Vec<String> = entries.iter().map(|e| e.team_id.clone()).collect();
        let names = self.db.team_names(&ids).await?;
        let named = |id: &String| {
            let name = names.get(id).cloned().unwrap_or_else(|| id.clone());
            (id.clone(), name)
        };

        if !tournament.format.has_group_stage() {
            let teams: Vec<(String, String)> = ids.iter().map(named).collect();
            let rows = compute_standings(&teams, matches, &tournament.settings);
            return Ok(vec![(String::new(), rows)]);
        }

        let mut groups: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
        for entry in entries {
            let label = entry.group.clone().unwrap_or_default();
            groups.entry(label).or_default().push(named(&entry.team_id));
        }

        Ok(groups
            .into_iter()
            .map(|(label, teams)| {
                let group_matches: Vec<Match> = matches
                    .iter()
                    .filter(|m| m.phase == Phase::Groups && m.group.as_deref() == Some(label.as_str()))
                    .cloned()
                    .collect();
                let rows = compute_standings(&teams, &group_matches, &tournament.settings);
                (label, rows)
            })
            .collect())
    }

    /// Draw the round after `last_round`
    async fn next_round(
        &self,
        tournament: &Tournament,
        entrants: &[String],
        last_round: u32,
        eliminated: &[String],
    ) -> Result<Advance> {
        let round = last_round + 1;
        let matches = knockout_round(tournament, entrants, round);
        self.db
            .advance_tournament(tournament, last_round, eliminated, &matches)
            .await?;

        let stage = crate::competition::stage_name(entrants.len());
        tracing::info!(
            tournament = %tournament.id,
            round,
            stage = %stage,
            teams = entrants.len(),
            "knockout round drawn"
        );
        self.event_bus.emit(Event::PhaseAdvanced {
            tournament_id: tournament.id.clone(),
            phase: Phase::Knockout,
            round,
            stage: Some(stage.clone()),
        });

        Ok(Advance::NextRound {
            round,
            stage,
            matches,
        })
    }

    async fn finish(
        &self,
        tournament: &mut Tournament,
        last_round: u32,
        champion_id: Option<String>,
        eliminated: &[String],
    ) -> Result<Advance> {
        tournament.status = TournamentStatus::Finished;
        tournament.phase = Phase::Finished;
        tournament.champion_id = champion_id.clone();
        self.db
            .advance_tournament(tournament, last_round, eliminated, &[])
            .await?;

        tracing::info!(
            tournament = %tournament.id,
            champion = ?champion_id,
            "tournament finished"
        );
        self.event_bus.emit(Event::TournamentFinished {
            tournament_id: tournament.id.clone(),
            champion_id: champion_id.clone(),
        });
        Ok(Advance::Finished { champion_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Team;

    struct Fixture {
        service: TournamentService,
        teams: Vec<String>,
    }

    async fn setup(n: usize) -> Fixture {
        let db = Database::in_memory().await.unwrap();
        let mut teams = Vec::new();
        for i in 0..n {
            let team = Team::new(
                format!("Equipo {}", i),
                "Bogotá".to_string(),
                "senior".to_string(),
                FootballType::Eleven,
            );
            db.create_team(&team).await.unwrap();
            teams.push(team.id);
        }
        let service = TournamentService::new(
            Arc::new(db),
            Arc::new(Config::default_config()),
            EventBus::new(100),
        );
        Fixture { service, teams }
    }

    fn request(format: TournamentFormat, team_ids: Vec<String>) -> NewTournament {
        NewTournament {
            name: "Copa Andina".to_string(),
            city: "Bogotá".to_string(),
            category: "senior".to_string(),
            football_type: FootballType::Eleven,
            format,
            team_ids,
            settings: None,
            seed: Some(42),
        }
    }

    /// Finish every scheduled match of the tournament, home side winning
    async fn play_all(service: &TournamentService, tournament_id: &str) {
        for m in service.matches(tournament_id).await.unwrap() {
            if m.status == MatchStatus::Scheduled {
                service
                    .record_result(
                        &m.id,
                        MatchResult {
                            home_goals: 2,
                            away_goals: 1,
                            penalties: None,
                        },
                    )
                    .await
                    .unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_create_stores_fixture_and_defaults_start_date() {
        let f = setup(4).await;
        let t = f
            .service
            .create(request(TournamentFormat::Groups, f.teams.clone()))
            .await
            .unwrap();

        assert_eq!(t.status, TournamentStatus::Planned);
        assert!(t.settings.start_date.is_some());
        assert_eq!(f.service.matches(&t.id).await.unwrap().len(), 6);

        let stored = f.service.get(&t.id).await.unwrap();
        assert_eq!(stored.team_ids, t.team_ids);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_and_mismatched_teams() {
        let f = setup(3).await;

        let mut ids = f.teams.clone();
        ids.push("ghost".to_string());
        let err = f
            .service
            .create(request(TournamentFormat::Groups, ids))
            .await
            .unwrap_err();
        assert!(matches!(err, GolazoError::NotFound { entity: "Team", .. }));

        let mut r = request(TournamentFormat::Groups, f.teams.clone());
        r.football_type = FootballType::Five;
        let err = f.service.create(r).await.unwrap_err();
        assert!(matches!(err, GolazoError::Validation(ref e) if e.len() == 3));
    }

    #[tokio::test]
    async fn test_create_needs_enough_teams() {
        let f = setup(3).await;
        let err = f
            .service
            .create(request(TournamentFormat::GroupsKnockout, f.teams.clone()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GolazoError::Competition(CompetitionError::NotEnoughTeams { required: 4, actual: 3, .. })
        ));
        assert!(f.service.list(&TournamentFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_results_need_a_started_tournament() {
        let f = setup(3).await;
        let t = f
            .service
            .create(request(TournamentFormat::Groups, f.teams.clone()))
            .await
            .unwrap();
        let m = &f.service.matches(&t.id).await.unwrap()[0];

        let err = f
            .service
            .record_result(&m.id, MatchResult::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GolazoError::Competition(CompetitionError::NotStarted)));

        f.service.start(&t.id).await.unwrap();
        assert!(matches!(
            f.service.start(&t.id).await.unwrap_err(),
            GolazoError::Conflict(_)
        ));
        f.service.record_result(&m.id, MatchResult::default()).await.unwrap();
    }

    #[tokio::test]
    async fn test_penalties_rules() {
        let f = setup(3).await;
        let t = f
            .service
            .create(request(TournamentFormat::Groups, f.teams.clone()))
            .await
            .unwrap();
        f.service.start(&t.id).await.unwrap();
        let m = &f.service.matches(&t.id).await.unwrap()[0];

        let result = MatchResult {
            home_goals: 1,
            away_goals: 1,
            penalties: Some((5, 4)),
        };
        let err = f.service.record_result(&m.id, result).await.unwrap_err();
        assert!(matches!(err, GolazoError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_groups_format_crowns_leader() {
        let f = setup(3).await;
        let t = f
            .service
            .create(request(TournamentFormat::Groups, f.teams.clone()))
            .await
            .unwrap();
        f.service.start(&t.id).await.unwrap();

        let err = f.service.advance(&t.id).await.unwrap_err();
        assert!(matches!(
            err,
            GolazoError::Competition(CompetitionError::RoundIncomplete { pending: 3 })
        ));

        play_all(&f.service, &t.id).await;
        let table = f.service.standings(&t.id).await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].group.as_deref(), Some("A"));
        let leader = table[0].rows[0].team_id.clone();

        match f.service.advance(&t.id).await.unwrap() {
            Advance::Finished { champion_id } => assert_eq!(champion_id, Some(leader.clone())),
            other => panic!("expected finish, got {:?}", other),
        }

        let done = f.service.get(&t.id).await.unwrap();
        assert_eq!(done.status, TournamentStatus::Finished);
        assert_eq!(done.champion_id, Some(leader));
        assert!(matches!(
            f.service.advance(&t.id).await.unwrap_err(),
            GolazoError::Competition(CompetitionError::AlreadyFinished)
        ));
    }

    #[tokio::test]
    async fn test_knockout_with_bye_runs_to_champion() {
        let f = setup(5).await;
        let t = f
            .service
            .create(request(TournamentFormat::Knockout, f.teams.clone()))
            .await
            .unwrap();
        f.service.start(&t.id).await.unwrap();
        let mut events = f.service.event_bus.subscribe();

        // 5 teams: 2 matches + bye, then 3 teams: 1 match + bye, then final
        let mut stages = Vec::new();
        let champion = loop {
            play_all(&f.service, &t.id).await;
            match f.service.advance(&t.id).await.unwrap() {
                Advance::NextRound { stage, matches, .. } => {
                    assert!(!matches.is_empty());
                    stages.push(stage);
                }
                Advance::Finished { champion_id } => break champion_id,
            }
        };

        assert_eq!(stages, vec!["semifinal", "final"]);
        assert!(champion.is_some());
        assert_eq!(f.service.matches(&t.id).await.unwrap().len(), 4);

        let mut finished = false;
        while let Ok(event) = events.try_recv() {
            finished |= matches!(event, Event::TournamentFinished { .. });
        }
        assert!(finished);
    }

    #[tokio::test]
    async fn test_drawn_knockout_match_needs_penalties() {
        let f = setup(2).await;
        let t = f
            .service
            .create(request(TournamentFormat::Knockout, f.teams.clone()))
            .await
            .unwrap();
        f.service.start(&t.id).await.unwrap();
        let final_match = f.service.matches(&t.id).await.unwrap().remove(0);

        let level = MatchResult {
            home_goals: 0,
            away_goals: 0,
            penalties: None,
        };
        f.service.record_result(&final_match.id, level).await.unwrap();
        assert!(matches!(
            f.service.advance(&t.id).await.unwrap_err(),
            GolazoError::Competition(CompetitionError::UndecidedTie(_))
        ));

        let shootout = MatchResult {
            penalties: Some((3, 5)),
            ..level
        };
        f.service.record_result(&final_match.id, shootout).await.unwrap();
        match f.service.advance(&t.id).await.unwrap() {
            Advance::Finished { champion_id } => {
                assert_eq!(champion_id, Some(final_match.away_team_id.clone()))
            }
            other => panic!("expected finish, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_closed_stage_results_are_locked() {
        let f = setup(4).await;
        let t = f
            .service
            .create(request(TournamentFormat::GroupsKnockout, f.teams.clone()))
            .await
            .unwrap();
        f.service.start(&t.id).await.unwrap();
        play_all(&f.service, &t.id).await;
        f.service.advance(&t.id).await.unwrap();

        let group_match = f
            .service
            .matches(&t.id)
            .await
            .unwrap()
            .into_iter()
            .find(|m| m.phase == Phase::Groups)
            .unwrap();
        let err = f
            .service
            .record_result(&group_match.id, MatchResult::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GolazoError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_concurrent_advance_draws_once() {
        let f = setup(4).await;
        let t = f
            .service
            .create(request(TournamentFormat::GroupsKnockout, f.teams.clone()))
            .await
            .unwrap();
        f.service.start(&t.id).await.unwrap();
        play_all(&f.service, &t.id).await;

        let (first, second) = tokio::join!(f.service.advance(&t.id), f.service.advance(&t.id));
        let drawn: Vec<Advance> = [first, second].into_iter().filter_map(|r| r.ok()).collect();
        assert_eq!(drawn.len(), 1);

        let Advance::NextRound { round, matches, .. } = &drawn[0] else {
            panic!("expected a knockout round, got {:?}", drawn[0]);
        };
        let knockout: Vec<Match> = f
            .service
            .matches(&t.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.phase == Phase::Knockout)
            .collect();
        assert_eq!(knockout.len(), matches.len());
        assert!(knockout.iter().all(|m| m.round == *round));
    }

    #[tokio::test]
    async fn test_stale_round_is_not_written() {
        let f = setup(4).await;
        let t = f
            .service
            .create(request(TournamentFormat::GroupsKnockout, f.teams.clone()))
            .await
            .unwrap();
        f.service.start(&t.id).await.unwrap();
        play_all(&f.service, &t.id).await;

        let stale = f.service.get(&t.id).await.unwrap();
        let last_group_round = f
            .service
            .matches(&t.id)
            .await
            .unwrap()
            .iter()
            .map(|m| m.round)
            .max()
            .unwrap();
        f.service.advance(&t.id).await.unwrap();
        let before = f.service.matches(&t.id).await.unwrap().len();

        let err = f
            .service
            .db
            .advance_tournament(&stale, last_group_round, &[], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, GolazoError::Conflict(_)));
        assert_eq!(f.service.matches(&t.id).await.unwrap().len(), before);
        assert_eq!(f.service.get(&t.id).await.unwrap().phase, Phase::Knockout);
    }

    #[tokio::test]
    async fn test_follow_requires_profile() {
        let f = setup(3).await;
        let t = f
            .service
            .create(request(TournamentFormat::Groups, f.teams.clone()))
            .await
            .unwrap();
        let err = f.service.follow(&t.id).await.unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
