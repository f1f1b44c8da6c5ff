//! Service layer for Golazo
//!
//! Business rules shared by every interface (the `gol-*` tools today).
//! `GolazoService` is the entry point and hands out specialized services:
//!
//! - `ClubService`: clubs and football fields
//! - `TeamService`: teams and squads
//! - `TournamentService`: draw, results, standings, progression, follows
//! - `FriendlyService`: availability, proposals and friendly results
//! - `UserService`: local profiles and preferences
//! - `DiagnosticsService`: storage checks and repairs
//! - `DataService`: JSON snapshot export and import
//! - `EventBus`: change notifications
//!
//! When the configuration names an active profile, only coaches may change
//! clubs, teams, tournaments and friendlies. Without a profile every
//! operation is allowed.
//!
//! # Example
//!
//! ```no_run
//! use libgolazo::service::GolazoService;
//!
//! # async fn example() -> libgolazo::Result<()> {
//! let service = GolazoService::new().await?;
//!
//! for tournament in service.tournaments().followed().await? {
//!     println!("{} ({})", tournament.name, tournament.status.as_str());
//! }
//! # Ok(())
//! # }
//! ```

pub mod clubs;
pub mod diagnostics;
pub mod events;
pub mod friendlies;
pub mod snapshot;
pub mod teams;
pub mod tournaments;
pub mod users;
pub mod validation;

pub use events::{Event, EventBus};

use self::clubs::ClubService;
use self::diagnostics::DiagnosticsService;
use self::friendlies::FriendlyService;
use self::snapshot::DataService;
use self::teams::TeamService;
use self::tournaments::TournamentService;
use self::users::UserService;
use crate::error::{ConfigError, GolazoError};
use crate::types::{Role, User};
use crate::{Config, Database, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// Id of the acting user, checking they may change data.
///
/// `Ok(None)` when no profile is configured.
pub(crate) async fn require_coach(
    db: &Database,
    config: &Config,
    action: &str,
) -> Result<Option<String>> {
    let Some(user_id) = config.active_user_id() else {
        return Ok(None);
    };

    let user = db
        .get_user(user_id)
        .await?
        .ok_or_else(|| GolazoError::not_found("User", user_id))?;
    if user.role != Role::Coach {
        return Err(GolazoError::PermissionDenied(format!(
            "only coaches can {}",
            action
        )));
    }
    Ok(Some(user.id))
}

/// Main service facade
///
/// All sub-services share one `Arc<Database>`, one `Arc<Config>` and one
/// event bus.
pub struct GolazoService {
    db: Arc<Database>,
    config: Arc<Config>,
    clubs: ClubService,
    teams: TeamService,
    tournaments: TournamentService,
    friendlies: FriendlyService,
    users: UserService,
    diagnostics: DiagnosticsService,
    data: DataService,
    event_bus: EventBus,
}

impl GolazoService {
    /// Create a service from the configuration at the default location
    pub async fn new() -> Result<Self> {
        let config = Config::load()?;
        Self::from_config(config).await
    }

    /// Create a service with a given configuration, opening its database
    pub async fn from_config(config: Config) -> Result<Self> {
        let db_path = crate::config::resolve_db_path(Some(&config.database.path))?;
        let db_path_str = db_path.to_str().ok_or_else(|| {
            GolazoError::Config(ConfigError::MissingField(
                "Invalid database path".to_string(),
            ))
        })?;
        let db = Database::new(db_path_str).await?;
        Ok(Self::with_database(db, config))
    }

    /// Build the service around an already open database
    pub fn with_database(db: Database, config: Config) -> Self {
        let db = Arc::new(db);
        let config = Arc::new(config);
        let event_bus = EventBus::new(100);

        Self {
            clubs: ClubService::new(Arc::clone(&db), Arc::clone(&config)),
            teams: TeamService::new(Arc::clone(&db), Arc::clone(&config)),
            tournaments: TournamentService::new(
                Arc::clone(&db),
                Arc::clone(&config),
                event_bus.clone(),
            ),
            friendlies: FriendlyService::new(
                Arc::clone(&db),
                Arc::clone(&config),
                event_bus.clone(),
            ),
            users: UserService::new(Arc::clone(&db), Arc::clone(&config)),
            diagnostics: DiagnosticsService::new(Arc::clone(&db)),
            data: DataService::new(Arc::clone(&db)),
            db,
            config,
            event_bus,
        }
    }

    /// Access the database directly
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clubs(&self) -> &ClubService {
        &self.clubs
    }

    pub fn teams(&self) -> &TeamService {
        &self.teams
    }

    pub fn tournaments(&self) -> &TournamentService {
        &self.tournaments
    }

    pub fn friendlies(&self) -> &FriendlyService {
        &self.friendlies
    }

    pub fn users(&self) -> &UserService {
        &self.users
    }

    pub fn diagnostics(&self) -> &DiagnosticsService {
        &self.diagnostics
    }

    pub fn data(&self) -> &DataService {
        &self.data
    }

    /// Subscribe to service events
    ///
    /// Every subscriber receives every event emitted after it subscribed.
    pub fn subscribe(&self) -> events::EventReceiver {
        self.event_bus.subscribe()
    }

    /// Users who should be notified of an event.
    ///
    /// Tournament events go to the tournament's followers; friendly events
    /// go to the coaches of the teams involved. Users who turned
    /// notifications off are left out.
    pub async fn notify_targets(&self, event: &Event) -> Result<Vec<User>> {
        let mut users = Vec::new();

        if let Some(tournament_id) = event.tournament_id() {
            users = self.db.followers(tournament_id).await?;
        }

        let mut seen: HashSet<String> = users.iter().map(|u| u.id.clone()).collect();
        for team_id in event.team_ids() {
            let Some(team) = self.db.get_team(team_id).await? else {
                continue;
            };
            let Some(coach_id) = team.coach_id else {
                continue;
            };
            if !seen.insert(coach_id.clone()) {
                continue;
            }
            if let Some(user) = self.db.get_user(&coach_id).await? {
                users.push(user);
            }
        }

        users.retain(|u| u.preferences.notifications);
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfileConfig;
    use crate::service::friendlies::FriendlyDetails;
    use crate::service::teams::NewTeam;
    use crate::types::{Colors, FootballType, Preferences};

    #[tokio::test]
    async fn test_require_coach() {
        let db = Database::in_memory().await.unwrap();
        let mut config = Config::default_config();
        assert_eq!(require_coach(&db, &config, "test").await.unwrap(), None);

        let coach = User::new("Coach".to_string(), Role::Coach);
        let fan = User::new("Fan".to_string(), Role::Spectator);
        db.create_user(&coach).await.unwrap();
        db.create_user(&fan).await.unwrap();

        config.profile = Some(ProfileConfig { user_id: coach.id.clone() });
        assert_eq!(
            require_coach(&db, &config, "test").await.unwrap(),
            Some(coach.id.clone())
        );

        config.profile = Some(ProfileConfig { user_id: fan.id.clone() });
        let err = require_coach(&db, &config, "create teams").await.unwrap_err();
        assert_eq!(err.to_string(), "Permission denied: only coaches can create teams");
    }

    #[tokio::test]
    async fn test_notify_targets_for_tournament_followers() {
        let db = Database::in_memory().await.unwrap();
        let service = GolazoService::with_database(db, Config::default_config());

        let mut teams = Vec::new();
        for name in ["Norte", "Sur", "Este"] {
            let team = crate::types::Team::new(name.to_string(), "Caracas".to_string(), "senior".to_string(), FootballType::Eleven);
            service.database().create_team(&team).await.unwrap();
            teams.push(team.id);
        }
        let t = service
            .tournaments()
            .create(tournaments::NewTournament {
                name: "Liga Barrial".to_string(),
                city: "Caracas".to_string(),
                category: "senior".to_string(),
                football_type: FootballType::Eleven,
                format: crate::types::TournamentFormat::Groups,
                team_ids: teams,
                settings: None,
                seed: Some(1),
            })
            .await
            .unwrap();

        let loud = service.users().create("Loud", Role::Spectator).await.unwrap();
        let mut quiet = User::new("Quiet".to_string(), Role::Spectator);
        quiet.preferences = Preferences {
            notifications: false,
            ..Preferences::default()
        };
        service.database().create_user(&quiet).await.unwrap();
        service.database().follow(&loud.id, &t.id).await.unwrap();
        service.database().follow(&quiet.id, &t.id).await.unwrap();

        let event = Event::TournamentStarted {
            tournament_id: t.id.clone(),
        };
        let targets = service.notify_targets(&event).await.unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id, loud.id);
    }

    #[tokio::test]
    async fn test_notify_targets_for_friendly_coaches() {
        let db = Database::in_memory().await.unwrap();
        let coach = User::new("Profe".to_string(), Role::Coach);
        db.create_user(&coach).await.unwrap();

        let mut config = Config::default_config();
        config.profile = Some(ProfileConfig { user_id: coach.id.clone() });
        let service = GolazoService::with_database(db, config);

        let new_team = |name: &str| NewTeam {
            name: name.to_string(),
            city: "Caracas".to_string(),
            category: "senior".to_string(),
            football_type: FootballType::Seven,
            colors: Colors::default(),
            club_id: None,
            crest: None,
            players: Vec::new(),
        };
        let home = service.teams().create(new_team("Leones")).await.unwrap();
        let away = service.teams().create(new_team("Pumas")).await.unwrap();

        let mut events = service.subscribe();
        let details = FriendlyDetails {
            location: "Cancha Municipal".to_string(),
            ..Default::default()
        };
        service
            .friendlies()
            .propose(&home.id, &away.id, details)
            .await
            .unwrap();

        let event = events.recv().await.unwrap();
        let targets = service.notify_targets(&event).await.unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id, coach.id);
    }
}
