//! Teams and their squads

use std::sync::Arc;

use super::require_coach;
use super::validation::{ensure_valid, validate_player, validate_team};
use crate::db::TeamFilter;
use crate::error::{GolazoError, Result};
use crate::types::{Colors, FootballType, Player, Position, Team};
use crate::{Config, Database};

#[derive(Debug, Clone)]
pub struct NewPlayer {
    pub name: String,
    pub number: u8,
    pub position: Position,
}

/// Details of a new team
#[derive(Debug, Clone)]
pub struct NewTeam {
    pub name: String,
    pub city: String,
    pub category: String,
    pub football_type: FootballType,
    pub colors: Colors,
    pub club_id: Option<String>,
    pub crest: Option<String>,
    pub players: Vec<NewPlayer>,
}

/// Changes to a team; `None` leaves a value as it is
#[derive(Debug, Clone, Default)]
pub struct TeamUpdate {
    pub name: Option<String>,
    pub city: Option<String>,
    pub category: Option<String>,
    pub football_type: Option<FootballType>,
    pub colors: Option<Colors>,
    /// `Some(None)` detaches the team from its club
    pub club_id: Option<Option<String>>,
    pub crest: Option<Option<String>>,
}

#[derive(Clone)]
pub struct TeamService {
    db: Arc<Database>,
    config: Arc<Config>,
}

impl TeamService {
    pub fn new(db: Arc<Database>, config: Arc<Config>) -> Self {
        Self { db, config }
    }

    /// Create a team with its initial squad, coached by the active user
    pub async fn create(&self, request: NewTeam) -> Result<Team> {
        let coach_id = require_coach(&self.db, &self.config, "create teams").await?;
        if let Some(club_id) = request.club_id.as_deref() {
            self.ensure_club(club_id).await?;
        }

        let mut team = Team::new(
            request.name.trim().to_string(),
            request.city.trim().to_string(),
            request.category.trim().to_string(),
            request.football_type,
        );
        team.colors = request.colors;
        team.coach_id = coach_id;
        team.club_id = request.club_id;
        team.crest = request.crest;
        let team_id = team.id.clone();
        team.players = request
            .players
            .into_iter()
            .map(|p| Player::new(&team_id, p.name.trim().to_string(), p.number, p.position))
            .collect();
        ensure_valid(validate_team(&team))?;

        self.db.create_team(&team).await?;
        tracing::info!(team = %team.id, name = %team.name, players = team.players.len(), "team created");
        Ok(team)
    }

    pub async fn get(&self, team_id: &str) -> Result<Team> {
        self.db
            .get_team(team_id)
            .await?
            .ok_or_else(|| GolazoError::not_found("Team", team_id))
    }

    pub async fn list(&self, filter: &TeamFilter) -> Result<Vec<Team>> {
        self.db.list_teams(filter).await
    }

    pub async fn update(&self, team_id: &str, update: TeamUpdate) -> Result<Team> {
        require_coach(&self.db, &self.config, "edit teams").await?;
        let mut team = self.get(team_id).await?;

        if let Some(name) = update.name {
            team.name = name.trim().to_string();
        }
        if let Some(city) = update.city {
            team.city = city.trim().to_string();
        }
        if let Some(category) = update.category {
            team.category = category.trim().to_string();
        }
        if let Some(football_type) = update.football_type {
            team.football_type = football_type;
        }
        if let Some(colors) = update.colors {
            team.colors = colors;
        }
        if let Some(club_id) = update.club_id {
            if let Some(id) = club_id.as_deref() {
                self.ensure_club(id).await?;
            }
            team.club_id = club_id;
        }
        if let Some(crest) = update.crest {
            team.crest = crest;
        }
        ensure_valid(validate_team(&team))?;

        self.db.update_team(&team).await?;
        Ok(team)
    }

    /// Delete a team with its squad and friendlies.
    ///
    /// Refused while the team plays in a tournament that is not finished.
    pub async fn delete(&self, team_id: &str) -> Result<()> {
        require_coach(&self.db, &self.config, "delete teams").await?;

        let active = self.db.active_tournaments_for_team(team_id).await?;
        if !active.is_empty() {
            return Err(GolazoError::Conflict(format!(
                "team {} plays in {} unfinished tournament(s): {}",
                team_id,
                active.len(),
                active.join(", ")
            )));
        }

        if !self.db.delete_team(team_id).await? {
            return Err(GolazoError::not_found("Team", team_id));
        }
        tracing::info!(team = %team_id, "team deleted");
        Ok(())
    }

    pub async fn add_player(&self, team_id: &str, request: NewPlayer) -> Result<Player> {
        require_coach(&self.db, &self.config, "edit squads").await?;
        let team = self.get(team_id).await?;

        let player = Player::new(
            &team.id,
            request.name.trim().to_string(),
            request.number,
            request.position,
        );
        ensure_valid(validate_player(&player, &team.players))?;

        self.db.add_player(&player).await?;
        Ok(player)
    }

    pub async fn remove_player(&self, team_id: &str, player_id: &str) -> Result<()> {
        require_coach(&self.db, &self.config, "edit squads").await?;
        if !self.db.remove_player(team_id, player_id).await? {
            return Err(GolazoError::not_found("Player", player_id));
        }
        Ok(())
    }

    async fn ensure_club(&self, club_id: &str) -> Result<()> {
        match self.db.get_club(club_id).await? {
            Some(_) => Ok(()),
            None => Err(GolazoError::not_found("Club", club_id)),
        }
    }
}
