//! Local user profiles and their preferences

use std::sync::Arc;

use crate::error::{GolazoError, Result};
use crate::types::{Role, User};
use crate::{Config, Database};

/// Preference changes; `None` leaves a value as it is
#[derive(Debug, Clone, Default)]
pub struct PreferencesUpdate {
    pub notifications: Option<bool>,
    pub dark_mode: Option<bool>,
    pub language: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    db: Arc<Database>,
    config: Arc<Config>,
}

impl UserService {
    pub fn new(db: Arc<Database>, config: Arc<Config>) -> Self {
        Self { db, config }
    }

    pub async fn create(&self, name: &str, role: Role) -> Result<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GolazoError::Validation(vec!["User name is required".to_string()]));
        }

        let user = User::new(name.to_string(), role);
        self.db.create_user(&user).await?;
        tracing::info!(user = %user.id, role = user.role.as_str(), "user created");
        Ok(user)
    }

    pub async fn get(&self, user_id: &str) -> Result<User> {
        self.db
            .get_user(user_id)
            .await?
            .ok_or_else(|| GolazoError::not_found("User", user_id))
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        self.db.list_users().await
    }

    /// The user named by the configured profile, if any
    pub async fn active(&self) -> Result<Option<User>> {
        match self.config.active_user_id() {
            Some(id) => Ok(Some(self.get(id).await?)),
            None => Ok(None),
        }
    }

    pub async fn update_preferences(
        &self,
        user_id: &str,
        update: PreferencesUpdate,
    ) -> Result<User> {
        let mut user = self.get(user_id).await?;

        if let Some(notifications) = update.notifications {
            user.preferences.notifications = notifications;
        }
        if let Some(dark_mode) = update.dark_mode {
            user.preferences.dark_mode = dark_mode;
        }
        if let Some(language) = update.language {
            let language = language.trim().to_lowercase();
            if language.len() != 2 || !language.chars().all(|c| c.is_ascii_lowercase()) {
                return Err(GolazoError::InvalidInput(format!(
                    "'{}' is not a two-letter language code",
                    language
                )));
            }
            user.preferences.language = language;
        }

        self.db.update_user(&user).await?;
        Ok(user)
    }
}
