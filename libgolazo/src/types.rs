//! Core types for Golazo

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::DbError;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn unknown(kind: &'static str, value: &str) -> DbError {
    DbError::InvalidValue {
        kind,
        value: value.to_string(),
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// Football variant by players per side
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum FootballType {
    #[serde(rename = "f5")]
    Five,
    #[serde(rename = "f7")]
    Seven,
    #[serde(rename = "f8")]
    Eight,
    #[default]
    #[serde(rename = "f11")]
    Eleven,
}

impl FootballType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Five => "f5",
            Self::Seven => "f7",
            Self::Eight => "f8",
            Self::Eleven => "f11",
        }
    }

    /// Players on the pitch per side
    pub fn players_per_side(&self) -> usize {
        match self {
            Self::Five => 5,
            Self::Seven => 7,
            Self::Eight => 8,
            Self::Eleven => 11,
        }
    }
}

impl FromStr for FootballType {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "f5" | "5" => Ok(Self::Five),
            "f7" | "7" => Ok(Self::Seven),
            "f8" | "8" => Ok(Self::Eight),
            "f11" | "11" => Ok(Self::Eleven),
            _ => Err(unknown("football type", s)),
        }
    }
}

impl std::fmt::Display for FootballType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Coach,
    Spectator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coach => "coach",
            Self::Spectator => "spectator",
        }
    }
}

impl FromStr for Role {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "coach" => Ok(Self::Coach),
            "spectator" => Ok(Self::Spectator),
            _ => Err(unknown("role", s)),
        }
    }
}

/// How a tournament is played
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TournamentFormat {
    /// Round robin inside groups; the best of the table wins
    Groups,
    /// Single elimination from the first match
    Knockout,
    /// Group stage followed by a knockout among the classified teams
    GroupsKnockout,
}

impl TournamentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groups => "groups",
            Self::Knockout => "knockout",
            Self::GroupsKnockout => "groups-knockout",
        }
    }

    /// Fewest teams the format can be played with
    pub fn min_teams(&self) -> usize {
        match self {
            Self::Groups => 3,
            Self::Knockout => 2,
            Self::GroupsKnockout => 4,
        }
    }

    pub fn has_group_stage(&self) -> bool {
        matches!(self, Self::Groups | Self::GroupsKnockout)
    }
}

impl FromStr for TournamentFormat {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "groups" => Ok(Self::Groups),
            "knockout" => Ok(Self::Knockout),
            "groups-knockout" => Ok(Self::GroupsKnockout),
            _ => Err(unknown("tournament format", s)),
        }
    }
}

impl std::fmt::Display for TournamentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TournamentStatus {
    Planned,
    InProgress,
    Finished,
}

impl TournamentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::InProgress => "in-progress",
            Self::Finished => "finished",
        }
    }
}

impl FromStr for TournamentStatus {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planned" => Ok(Self::Planned),
            "in-progress" => Ok(Self::InProgress),
            "finished" => Ok(Self::Finished),
            _ => Err(unknown("tournament status", s)),
        }
    }
}

/// Competition phase (fase)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Groups,
    Knockout,
    Finished,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groups => "groups",
            Self::Knockout => "knockout",
            Self::Finished => "finished",
        }
    }
}

impl FromStr for Phase {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "groups" => Ok(Self::Groups),
            "knockout" => Ok(Self::Knockout),
            "finished" => Ok(Self::Finished),
            _ => Err(unknown("phase", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Finished,
    Cancelled,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for MatchStatus {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "finished" => Ok(Self::Finished),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(unknown("match status", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FriendlyStatus {
    /// A team announced it is free to play; no opponent yet
    Available,
    Proposed,
    Confirmed,
    Finished,
    Cancelled,
}

impl FriendlyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Proposed => "proposed",
            Self::Confirmed => "confirmed",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }
}

impl FromStr for FriendlyStatus {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(Self::Available),
            "proposed" => Ok(Self::Proposed),
            "confirmed" => Ok(Self::Confirmed),
            "finished" => Ok(Self::Finished),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(unknown("friendly status", s)),
        }
    }
}

impl std::fmt::Display for FriendlyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Natural,
    Artificial,
    Hybrid,
    Indoor,
}

impl Surface {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Natural => "natural",
            Self::Artificial => "artificial",
            Self::Hybrid => "hybrid",
            Self::Indoor => "indoor",
        }
    }
}

impl FromStr for Surface {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "natural" => Ok(Self::Natural),
            "artificial" => Ok(Self::Artificial),
            "hybrid" => Ok(Self::Hybrid),
            "indoor" => Ok(Self::Indoor),
            _ => Err(unknown("surface", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Goalkeeper => "goalkeeper",
            Self::Defender => "defender",
            Self::Midfielder => "midfielder",
            Self::Forward => "forward",
        }
    }
}

impl FromStr for Position {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "goalkeeper" | "gk" => Ok(Self::Goalkeeper),
            "defender" | "df" => Ok(Self::Defender),
            "midfielder" | "mf" => Ok(Self::Midfielder),
            "forward" | "fw" => Ok(Self::Forward),
            _ => Err(unknown("position", s)),
        }
    }
}

// ============================================================================
// Clubs, teams and players
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Colors {
    pub primary: String,
    pub secondary: String,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            primary: "white".to_string(),
            secondary: "black".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub team_id: String,
    pub name: String,
    /// Jersey number, unique within the team
    pub number: u8,
    pub position: Position,
}

impl Player {
    pub fn new(team_id: &str, name: String, number: u8, position: Position) -> Self {
        Self {
            id: new_id(),
            team_id: team_id.to_string(),
            name,
            number,
            position,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub city: String,
    pub category: String,
    pub football_type: FootballType,
    pub colors: Colors,
    pub coach_id: Option<String>,
    pub club_id: Option<String>,
    /// Path or URL of the crest image
    pub crest: Option<String>,
    #[serde(default)]
    pub players: Vec<Player>,
    pub created_at: i64,
}

impl Team {
    pub fn new(name: String, city: String, category: String, football_type: FootballType) -> Self {
        Self {
            id: new_id(),
            name,
            city,
            category,
            football_type,
            colors: Colors::default(),
            coach_id: None,
            club_id: None,
            crest: None,
            players: Vec::new(),
            created_at: now(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub address: String,
    pub city: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Club {
    pub id: String,
    pub name: String,
    pub location: Location,
    /// Category name to the ids of the club's teams in it, derived from teams
    #[serde(default)]
    pub categories: std::collections::BTreeMap<String, Vec<String>>,
    pub coach_id: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: i64,
}

impl Club {
    pub fn new(name: String, location: Location) -> Self {
        Self {
            id: new_id(),
            name,
            location,
            categories: Default::default(),
            coach_id: None,
            phone: None,
            email: None,
            created_at: now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A pitch (campo) where matches are played
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub football_type: FootballType,
    pub surface: Surface,
    pub coordinates: Option<Coordinates>,
}

impl Field {
    pub fn new(
        name: String,
        address: String,
        city: String,
        football_type: FootballType,
        surface: Surface,
    ) -> Self {
        Self {
            id: new_id(),
            name,
            address,
            city,
            football_type,
            surface,
            coordinates: None,
        }
    }
}

// ============================================================================
// Tournaments and matches
// ============================================================================

/// Scoring and scheduling rules of a tournament
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TournamentSettings {
    pub points_win: u8,
    pub points_draw: u8,
    pub points_loss: u8,
    /// Length of a match in minutes
    pub match_minutes: u16,
    pub teams_per_group: usize,
    /// Teams per group that go through to the knockout
    pub classified_per_group: usize,
    pub days_between_rounds: u32,
    pub kickoff: NaiveTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

impl Default for TournamentSettings {
    fn default() -> Self {
        Self {
            points_win: 3,
            points_draw: 1,
            points_loss: 0,
            match_minutes: 90,
            teams_per_group: 4,
            classified_per_group: 2,
            days_between_rounds: 7,
            kickoff: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default(),
            start_date: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    pub id: String,
    pub name: String,
    pub city: String,
    pub category: String,
    pub football_type: FootballType,
    pub format: TournamentFormat,
    pub team_ids: Vec<String>,
    pub status: TournamentStatus,
    pub settings: TournamentSettings,
    pub creator_id: Option<String>,
    pub phase: Phase,
    pub champion_id: Option<String>,
    pub created_at: i64,
}

impl Tournament {
    pub fn new(
        name: String,
        city: String,
        category: String,
        football_type: FootballType,
        format: TournamentFormat,
        team_ids: Vec<String>,
        settings: TournamentSettings,
    ) -> Self {
        let phase = if format.has_group_stage() {
            Phase::Groups
        } else {
            Phase::Knockout
        };

        Self {
            id: new_id(),
            name,
            city,
            category,
            football_type,
            format,
            team_ids,
            status: TournamentStatus::Planned,
            settings,
            creator_id: None,
            phase,
            champion_id: None,
            created_at: now(),
        }
    }
}

/// A tournament match (partido)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub tournament_id: String,
    pub home_team_id: String,
    pub away_team_id: String,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub status: MatchStatus,
    /// Round (jornada) number, 1-based
    pub round: u32,
    pub phase: Phase,
    /// Group label for group-stage matches
    pub group: Option<String>,
    /// Knockout stage name, e.g. "semifinal"
    pub stage: Option<String>,
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
    pub home_penalties: Option<u32>,
    pub away_penalties: Option<u32>,
    pub field_id: Option<String>,
}

impl Match {
    pub fn new(tournament_id: &str, home_team_id: &str, away_team_id: &str, round: u32, phase: Phase) -> Self {
        Self {
            id: new_id(),
            tournament_id: tournament_id.to_string(),
            home_team_id: home_team_id.to_string(),
            away_team_id: away_team_id.to_string(),
            date: None,
            time: None,
            status: MatchStatus::Scheduled,
            round,
            phase,
            group: None,
            stage: None,
            home_goals: None,
            away_goals: None,
            home_penalties: None,
            away_penalties: None,
            field_id: None,
        }
    }

    /// Final score, if the match was played
    pub fn score(&self) -> Option<(u32, u32)> {
        match (self.status, self.home_goals, self.away_goals) {
            (MatchStatus::Finished, Some(home), Some(away)) => Some((home, away)),
            _ => None,
        }
    }

    pub fn involves(&self, team_id: &str) -> bool {
        self.home_team_id == team_id || self.away_team_id == team_id
    }

    /// Winner by goals, then by penalties; `None` while unplayed or level
    pub fn winner(&self) -> Option<&str> {
        let (home, away) = self.score()?;
        let (home, away) = if home == away {
            (self.home_penalties?, self.away_penalties?)
        } else {
            (home, away)
        };

        if home > away {
            Some(&self.home_team_id)
        } else if away > home {
            Some(&self.away_team_id)
        } else {
            None
        }
    }
}

// ============================================================================
// Friendlies
// ============================================================================

/// A friendly match (amistoso) or a team's availability to play one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friendly {
    pub id: String,
    pub home_team_id: String,
    pub away_team_id: Option<String>,
    pub status: FriendlyStatus,
    /// Created as an open availability rather than a direct proposal
    pub is_availability: bool,
    pub location: String,
    pub field_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub proposed_by: Option<String>,
    pub proposed_to: Option<String>,
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
    pub notes: Option<String>,
    pub created_at: i64,
}

impl Friendly {
    /// An open slot a team offers to any opponent
    pub fn availability(team_id: &str, location: String) -> Self {
        Self {
            id: new_id(),
            home_team_id: team_id.to_string(),
            away_team_id: None,
            status: FriendlyStatus::Available,
            is_availability: true,
            location,
            field_id: None,
            date: None,
            time: None,
            proposed_by: None,
            proposed_to: None,
            home_goals: None,
            away_goals: None,
            notes: None,
            created_at: now(),
        }
    }

    /// A direct proposal from one team to another
    pub fn proposal(home_team_id: &str, away_team_id: &str, location: String) -> Self {
        Self {
            away_team_id: Some(away_team_id.to_string()),
            status: FriendlyStatus::Proposed,
            is_availability: false,
            proposed_by: Some(home_team_id.to_string()),
            proposed_to: Some(away_team_id.to_string()),
            ..Self::availability(home_team_id, location)
        }
    }
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Preferences {
    pub notifications: bool,
    pub dark_mode: bool,
    pub language: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            notifications: true,
            dark_mode: false,
            language: "es".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub preferences: Preferences,
    #[serde(default)]
    pub followed_tournaments: Vec<String>,
    pub created_at: i64,
}

impl User {
    pub fn new(name: String, role: Role) -> Self {
        Self {
            id: new_id(),
            name,
            role,
            preferences: Preferences::default(),
            followed_tournaments: Vec::new(),
            created_at: now(),
        }
    }
}
