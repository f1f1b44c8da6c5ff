//! Clubs and the football fields matches are played on

use std::sync::Arc;

use super::require_coach;
use super::validation::{ensure_valid, validate_club, validate_field};
use crate::error::{GolazoError, Result};
use crate::types::{Club, Coordinates, Field, FootballType, Location, Surface};
use crate::{Config, Database};

/// Details of a new club
#[derive(Debug, Clone, Default)]
pub struct NewClub {
    pub name: String,
    pub address: String,
    pub city: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Changes to a club; `None` leaves a value as it is
#[derive(Debug, Clone, Default)]
pub struct ClubUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewField {
    pub name: String,
    pub address: String,
    pub city: String,
    pub football_type: FootballType,
    pub surface: Surface,
    pub coordinates: Option<Coordinates>,
}

/// Club and field management
#[derive(Clone)]
pub struct ClubService {
    db: Arc<Database>,
    config: Arc<Config>,
}

impl ClubService {
    pub fn new(db: Arc<Database>, config: Arc<Config>) -> Self {
        Self { db, config }
    }

    /// Create a club owned by the active coach
    pub async fn create(&self, request: NewClub) -> Result<Club> {
        let coach_id = require_coach(&self.db, &self.config, "create clubs").await?;

        let mut club = Club::new(
            request.name.trim().to_string(),
            Location {
                address: request.address.trim().to_string(),
                city: request.city.trim().to_string(),
            },
        );
        club.coach_id = coach_id;
        club.phone = request.phone;
        club.email = request.email;
        ensure_valid(validate_club(&club))?;

        self.db.create_club(&club).await?;
        tracing::info!(club = %club.id, name = %club.name, "club created");
        Ok(club)
    }

    pub async fn get(&self, club_id: &str) -> Result<Club> {
        self.db
            .get_club(club_id)
            .await?
            .ok_or_else(|| GolazoError::not_found("Club", club_id))
    }

    pub async fn list(&self, city: Option<&str>) -> Result<Vec<Club>> {
        self.db.list_clubs(city).await
    }

    pub async fn update(&self, club_id: &str, update: ClubUpdate) -> Result<Club> {
        require_coach(&self.db, &self.config, "edit clubs").await?;
        let mut club = self.get(club_id).await?;

        if let Some(name) = update.name {
            club.name = name.trim().to_string();
        }
        if let Some(address) = update.address {
            club.location.address = address.trim().to_string();
        }
        if let Some(city) = update.city {
            club.location.city = city.trim().to_string();
        }
        if let Some(phone) = update.phone {
            club.phone = Some(phone).filter(|p| !p.is_empty());
        }
        if let Some(email) = update.email {
            club.email = Some(email).filter(|e| !e.is_empty());
        }
        ensure_valid(validate_club(&club))?;

        self.db.update_club(&club).await?;
        Ok(club)
    }

    /// Delete a club. Its teams are kept without a club.
    pub async fn delete(&self, club_id: &str) -> Result<()> {
        require_coach(&self.db, &self.config, "delete clubs").await?;
        if !self.db.delete_club(club_id).await? {
            return Err(GolazoError::not_found("Club", club_id));
        }
        tracing::info!(club = %club_id, "club deleted");
        Ok(())
    }

    pub async fn add_field(&self, request: NewField) -> Result<Field> {
        require_coach(&self.db, &self.config, "add fields").await?;

        let mut field = Field::new(
            request.name.trim().to_string(),
            request.address.trim().to_string(),
            request.city.trim().to_string(),
            request.football_type,
            request.surface,
        );
        field.coordinates = request.coordinates;
        ensure_valid(validate_field(&field))?;

        self.db.create_field(&field).await?;
        Ok(field)
    }

    pub async fn get_field(&self, field_id: &str) -> Result<Field> {
        self.db
            .get_field(field_id)
            .await?
            .ok_or_else(|| GolazoError::not_found("Field", field_id))
    }

    pub async fn list_fields(&self, city: Option<&str>) -> Result<Vec<Field>> {
        self.db.list_fields(city).await
    }

    /// Delete a field; matches scheduled on it lose their field
    pub async fn delete_field(&self, field_id: &str) -> Result<()> {
        require_coach(&self.db, &self.config, "delete fields").await?;
        if !self.db.delete_field(field_id).await? {
            return Err(GolazoError::not_found("Field", field_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfileConfig;
    use crate::types::{Role, User};

    async fn service(role: Option<Role>) -> ClubService {
        let db = Database::in_memory().await.unwrap();
        let mut config = Config::default_config();
        if let Some(role) = role {
            let user = User::new("Marta".to_string(), role);
            db.create_user(&user).await.unwrap();
            config.profile = Some(ProfileConfig { user_id: user.id });
        }
        ClubService::new(Arc::new(db), Arc::new(config))
    }

    fn new_club() -> NewClub {
        NewClub {
            name: " Deportivo Sur ".to_string(),
            address: "Av. Central 100".to_string(),
            city: "La Paz".to_string(),
            phone: None,
            email: Some("sur@example.org".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_update_club() {
        let clubs = service(Some(Role::Coach)).await;
        let club = clubs.create(new_club()).await.unwrap();
        assert_eq!(club.name, "Deportivo Sur");
        assert!(club.coach_id.is_some());

        let updated = clubs
            .update(
                &club.id,
                ClubUpdate {
                    city: Some("El Alto".to_string()),
                    email: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.location.city, "El Alto");
        assert!(updated.email.is_none());
        assert_eq!(clubs.list(Some("el alto")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_spectator_cannot_create() {
        let clubs = service(Some(Role::Spectator)).await;
        let err = clubs.create(new_club()).await.unwrap_err();
        assert!(matches!(err, GolazoError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_no_profile_is_allowed() {
        let clubs = service(None).await;
        let club = clubs.create(new_club()).await.unwrap();
        assert!(club.coach_id.is_none());
    }

    #[tokio::test]
    async fn test_invalid_club_rejected() {
        let clubs = service(None).await;
        let mut request = new_club();
        request.name = String::new();
        let err = clubs.create(request).await.unwrap_err();
        assert!(matches!(err, GolazoError::Validation(ref e) if e.len() == 1));
    }

    #[tokio::test]
    async fn test_delete_missing_club() {
        let clubs = service(None).await;
        let err = clubs.delete("nope").await.unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn test_fields() {
        let clubs = service(None).await;
        let field = clubs
            .add_field(NewField {
                name: "Cancha Norte".to_string(),
                address: String::new(),
                city: "La Paz".to_string(),
                football_type: FootballType::Seven,
                surface: Surface::Artificial,
                coordinates: Some(Coordinates { lat: -16.5, lng: -68.15 }),
            })
            .await
            .unwrap();

        assert_eq!(clubs.get_field(&field.id).await.unwrap().name, "Cancha Norte");
        assert_eq!(clubs.list_fields(None).await.unwrap().len(), 1);

        clubs.delete_field(&field.id).await.unwrap();
        assert!(clubs.list_fields(None).await.unwrap().is_empty());
        assert!(clubs.delete_field(&field.id).await.is_err());
    }
}
