//! Friendly matches and availability matchmaking
//!
//! ```text
//! available --request--> proposed --accept--> confirmed --result--> finished
//!     ^                      |
//!     +--------reject--------+   (when it came from an availability)
//! proposed --reject--> cancelled (direct proposal)
//! available | proposed | confirmed --cancel--> cancelled
//! ```

use chrono::{NaiveDate, NaiveTime};
use std::sync::Arc;

use super::events::{Event, EventBus};
use super::require_coach;
use super::validation::{ensure_valid, validate_friendly};
use crate::error::{GolazoError, Result};
use crate::types::{Friendly, FriendlyStatus};
use crate::{Config, Database};

/// Where and when a friendly is played
#[derive(Debug, Clone, Default)]
pub struct FriendlyDetails {
    pub location: String,
    pub field_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct FriendlyService {
    db: Arc<Database>,
    config: Arc<Config>,
    event_bus: EventBus,
}

fn illegal(friendly: &Friendly, action: &str) -> GolazoError {
    GolazoError::Conflict(format!(
        "cannot {} friendly {}: it is {}",
        action, friendly.id, friendly.status
    ))
}

impl FriendlyService {
    pub fn new(db: Arc<Database>, config: Arc<Config>, event_bus: EventBus) -> Self {
        Self {
            db,
            config,
            event_bus,
        }
    }

    /// Offer an open slot any team can request
    pub async fn publish_availability(
        &self,
        team_id: &str,
        details: FriendlyDetails,
    ) -> Result<Friendly> {
        require_coach(&self.db, &self.config, "arrange friendlies").await?;
        self.ensure_team(team_id).await?;

        let mut friendly = Friendly::availability(team_id, details.location.trim().to_string());
        self.apply_details(&mut friendly, details).await?;
        ensure_valid(validate_friendly(&friendly))?;

        self.db.create_friendly(&friendly).await?;
        tracing::info!(friendly = %friendly.id, team = %team_id, "availability published");
        Ok(friendly)
    }

    /// Propose a friendly directly to another team
    pub async fn propose(
        &self,
        from_team_id: &str,
        to_team_id: &str,
        details: FriendlyDetails,
    ) -> Result<Friendly> {
        require_coach(&self.db, &self.config, "arrange friendlies").await?;
        self.ensure_team(from_team_id).await?;
        self.ensure_team(to_team_id).await?;

        let mut friendly =
            Friendly::proposal(from_team_id, to_team_id, details.location.trim().to_string());
        self.apply_details(&mut friendly, details).await?;
        ensure_valid(validate_friendly(&friendly))?;

        self.db.create_friendly(&friendly).await?;
        self.event_bus.emit(Event::FriendlyProposed {
            friendly_id: friendly.id.clone(),
            from_team_id: from_team_id.to_string(),
            to_team_id: to_team_id.to_string(),
        });
        Ok(friendly)
    }

    /// Ask to play against a published availability
    pub async fn request(&self, friendly_id: &str, team_id: &str) -> Result<Friendly> {
        require_coach(&self.db, &self.config, "arrange friendlies").await?;
        let mut friendly = self.get(friendly_id).await?;
        if friendly.status != FriendlyStatus::Available {
            return Err(illegal(&friendly, "request"));
        }
        if friendly.home_team_id == team_id {
            return Err(GolazoError::InvalidInput(
                "a team cannot request its own availability".to_string(),
            ));
        }
        self.ensure_team(team_id).await?;

        friendly.away_team_id = Some(team_id.to_string());
        friendly.proposed_by = Some(team_id.to_string());
        friendly.proposed_to = Some(friendly.home_team_id.clone());
        friendly.status = FriendlyStatus::Proposed;
        self.db.update_friendly(&friendly).await?;

        self.event_bus.emit(Event::FriendlyProposed {
            friendly_id: friendly.id.clone(),
            from_team_id: team_id.to_string(),
            to_team_id: friendly.home_team_id.clone(),
        });
        Ok(friendly)
    }

    /// Accept a proposal addressed to `team_id`
    pub async fn accept(&self, friendly_id: &str, team_id: &str) -> Result<Friendly> {
        require_coach(&self.db, &self.config, "arrange friendlies").await?;
        let mut friendly = self.get(friendly_id).await?;
        if friendly.status != FriendlyStatus::Proposed {
            return Err(illegal(&friendly, "accept"));
        }
        Self::ensure_addressee(&friendly, team_id)?;

        friendly.status = FriendlyStatus::Confirmed;
        self.db.update_friendly(&friendly).await?;
        tracing::info!(friendly = %friendly.id, "friendly confirmed");

        self.event_bus.emit(Event::FriendlyConfirmed {
            friendly_id: friendly.id.clone(),
            home_team_id: friendly.home_team_id.clone(),
            away_team_id: friendly.away_team_id.clone().unwrap_or_default(),
        });
        Ok(friendly)
    }

    /// Turn down a proposal addressed to `team_id`.
    ///
    /// A request against an availability reopens the availability; a
    /// direct proposal is cancelled.
    pub async fn reject(&self, friendly_id: &str, team_id: &str) -> Result<Friendly> {
        require_coach(&self.db, &self.config, "arrange friendlies").await?;
        let mut friendly = self.get(friendly_id).await?;
        if friendly.status != FriendlyStatus::Proposed {
            return Err(illegal(&friendly, "reject"));
        }
        Self::ensure_addressee(&friendly, team_id)?;

        let proposer = friendly.proposed_by.clone();
        if friendly.is_availability {
            friendly.status = FriendlyStatus::Available;
            friendly.away_team_id = None;
            friendly.proposed_by = None;
            friendly.proposed_to = None;
        } else {
            friendly.status = FriendlyStatus::Cancelled;
        }
        self.db.update_friendly(&friendly).await?;

        if friendly.status == FriendlyStatus::Cancelled {
            self.event_bus.emit(Event::FriendlyCancelled {
                friendly_id: friendly.id.clone(),
                team_ids: proposer.into_iter().collect(),
            });
        }
        Ok(friendly)
    }

    /// Call off a friendly that is not yet played. Either team may cancel.
    pub async fn cancel(&self, friendly_id: &str, team_id: &str) -> Result<Friendly> {
        require_coach(&self.db, &self.config, "arrange friendlies").await?;
        let mut friendly = self.get(friendly_id).await?;
        if friendly.status.is_terminal() {
            return Err(illegal(&friendly, "cancel"));
        }
        if friendly.home_team_id != team_id && friendly.away_team_id.as_deref() != Some(team_id) {
            return Err(GolazoError::PermissionDenied(format!(
                "team {} is not part of friendly {}",
                team_id, friendly_id
            )));
        }

        friendly.status = FriendlyStatus::Cancelled;
        self.db.update_friendly(&friendly).await?;

        // Tell the other side, if there is one
        let others: Vec<String> = std::iter::once(friendly.home_team_id.clone())
            .chain(friendly.away_team_id.clone())
            .filter(|id| id != team_id)
            .collect();
        self.event_bus.emit(Event::FriendlyCancelled {
            friendly_id: friendly.id.clone(),
            team_ids: others,
        });
        Ok(friendly)
    }

    /// Record the score of a confirmed friendly
    pub async fn record_result(
        &self,
        friendly_id: &str,
        home_goals: u32,
        away_goals: u32,
    ) -> Result<Friendly> {
        require_coach(&self.db, &self.config, "record results").await?;
        let mut friendly = self.get(friendly_id).await?;
        if friendly.status != FriendlyStatus::Confirmed {
            return Err(illegal(&friendly, "record a result for"));
        }

        friendly.home_goals = Some(home_goals);
        friendly.away_goals = Some(away_goals);
        friendly.status = FriendlyStatus::Finished;
        self.db.update_friendly(&friendly).await?;
        Ok(friendly)
    }

    pub async fn get(&self, friendly_id: &str) -> Result<Friendly> {
        self.db
            .get_friendly(friendly_id)
            .await?
            .ok_or_else(|| GolazoError::not_found("Friendly", friendly_id))
    }

    /// Friendlies by status and by a team on either side
    pub async fn list(
        &self,
        status: Option<FriendlyStatus>,
        team_id: Option<&str>,
    ) -> Result<Vec<Friendly>> {
        self.db.list_friendlies(status, team_id).await
    }

    fn ensure_addressee(friendly: &Friendly, team_id: &str) -> Result<()> {
        if friendly.proposed_to.as_deref() == Some(team_id) {
            Ok(())
        } else {
            Err(GolazoError::PermissionDenied(format!(
                "only the invited team can answer friendly {}",
                friendly.id
            )))
        }
    }

    async fn ensure_team(&self, team_id: &str) -> Result<()> {
        match self.db.get_team(team_id).await? {
            Some(_) => Ok(()),
            None => Err(GolazoError::not_found("Team", team_id)),
        }
    }

    async fn apply_details(&self, friendly: &mut Friendly, details: FriendlyDetails) -> Result<()> {
        if let Some(field_id) = details.field_id {
            let field = self
                .db
                .get_field(&field_id)
                .await?
                .ok_or_else(|| GolazoError::not_found("Field", &field_id))?;
            if friendly.location.is_empty() {
                friendly.location = field.name.clone();
            }
            friendly.field_id = Some(field.id);
        }
        friendly.date = details.date;
        friendly.time = details.time;
        friendly.notes = details.notes.filter(|n| !n.trim().is_empty());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FootballType, Team};

    struct Setup {
        service: FriendlyService,
        home: String,
        away: String,
    }

    async fn setup() -> Setup {
        let db = Database::in_memory().await.unwrap();
        let home = Team::new("Halcones".to_string(), "Cali".to_string(), "senior".to_string(), FootballType::Seven);
        let away = Team::new("Cóndores".to_string(), "Cali".to_string(), "senior".to_string(), FootballType::Seven);
        db.create_team(&home).await.unwrap();
        db.create_team(&away).await.unwrap();

        let service = FriendlyService::new(
            Arc::new(db),
            Arc::new(Config::default_config()),
            EventBus::new(16),
        );
        Setup {
            service,
            home: home.id,
            away: away.id,
        }
    }

    fn details() -> FriendlyDetails {
        FriendlyDetails {
            location: "Parque del Perro".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 11, 7),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_availability_full_cycle() {
        let s = setup().await;
        let open = s.service.publish_availability(&s.home, details()).await.unwrap();
        assert_eq!(open.status, FriendlyStatus::Available);

        let requested = s.service.request(&open.id, &s.away).await.unwrap();
        assert_eq!(requested.status, FriendlyStatus::Proposed);
        assert_eq!(requested.proposed_to.as_deref(), Some(s.home.as_str()));

        let confirmed = s.service.accept(&open.id, &s.home).await.unwrap();
        assert_eq!(confirmed.status, FriendlyStatus::Confirmed);

        let played = s.service.record_result(&open.id, 3, 3).await.unwrap();
        assert_eq!(played.status, FriendlyStatus::Finished);
        assert_eq!((played.home_goals, played.away_goals), (Some(3), Some(3)));

        // Finished is terminal
        assert!(matches!(
            s.service.cancel(&open.id, &s.home).await.unwrap_err(),
            GolazoError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn test_cannot_request_own_availability() {
        let s = setup().await;
        let open = s.service.publish_availability(&s.home, details()).await.unwrap();
        let err = s.service.request(&open.id, &s.home).await.unwrap_err();
        assert!(matches!(err, GolazoError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_reject_reopens_availability() {
        let s = setup().await;
        let open = s.service.publish_availability(&s.home, details()).await.unwrap();
        s.service.request(&open.id, &s.away).await.unwrap();

        // Only the invited team answers
        assert!(matches!(
            s.service.accept(&open.id, &s.away).await.unwrap_err(),
            GolazoError::PermissionDenied(_)
        ));

        let reopened = s.service.reject(&open.id, &s.home).await.unwrap();
        assert_eq!(reopened.status, FriendlyStatus::Available);
        assert!(reopened.away_team_id.is_none());
        assert!(reopened.proposed_to.is_none());
    }

    #[tokio::test]
    async fn test_reject_direct_proposal_cancels() {
        let s = setup().await;
        let mut events = s.service.event_bus.subscribe();

        let direct = s.service.propose(&s.home, &s.away, details()).await.unwrap();
        let rejected = s.service.reject(&direct.id, &s.away).await.unwrap();
        assert_eq!(rejected.status, FriendlyStatus::Cancelled);

        assert!(matches!(events.recv().await.unwrap(), Event::FriendlyProposed { .. }));
        match events.recv().await.unwrap() {
            Event::FriendlyCancelled { team_ids, .. } => assert_eq!(team_ids, vec![s.home.clone()]),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_result_needs_confirmation() {
        let s = setup().await;
        let direct = s.service.propose(&s.home, &s.away, details()).await.unwrap();
        assert!(matches!(
            s.service.record_result(&direct.id, 1, 0).await.unwrap_err(),
            GolazoError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn test_cancel_by_outsider_refused() {
        let s = setup().await;
        let direct = s.service.propose(&s.home, &s.away, details()).await.unwrap();
        assert!(matches!(
            s.service.cancel(&direct.id, "someone-else").await.unwrap_err(),
            GolazoError::PermissionDenied(_)
        ));

        let cancelled = s.service.cancel(&direct.id, &s.away).await.unwrap();
        assert_eq!(cancelled.status, FriendlyStatus::Cancelled);
        assert!(s.service.accept(&direct.id, &s.away).await.is_err());
    }

    #[tokio::test]
    async fn test_list_by_status_and_team() {
        let s = setup().await;
        s.service.publish_availability(&s.home, details()).await.unwrap();
        s.service.propose(&s.away, &s.home, details()).await.unwrap();

        let open = s.service.list(Some(FriendlyStatus::Available), None).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(s.service.list(None, Some(&s.away)).await.unwrap().len(), 1);
        assert_eq!(s.service.list(None, Some(&s.home)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_direct_proposal_to_itself() {
        let s = setup().await;
        let err = s.service.propose(&s.home, &s.home, details()).await.unwrap_err();
        assert!(matches!(err, GolazoError::Validation(_)));
    }
}
