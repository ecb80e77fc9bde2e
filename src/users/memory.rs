//! In-memory [`UserStore`], used by tests and `AppState::fake`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::users::repo::UserStore;
use crate::users::repo_types::{NewUser, User, UserChanges};

#[derive(Debug, Default, Clone)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

/// Mirrors the table's unique constraints, ignoring the row being updated.
fn conflict(
    users: &HashMap<Uuid, User>,
    skip: Option<Uuid>,
    username: Option<&str>,
    email: Option<&str>,
) -> Option<AppError> {
    for u in users.values().filter(|u| Some(u.id) != skip) {
        if username == Some(u.username.as_str()) {
            return Some(AppError::Conflict("username".into()));
        }
        if email.is_some_and(|e| e.eq_ignore_ascii_case(&u.email)) {
            return Some(AppError::Conflict("email".into()));
        }
    }
    None
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, user: NewUser) -> AppResult<User> {
        let mut users = self.users.write().await;
        if let Some(err) = conflict(&users, None, Some(&user.username), Some(&user.email)) {
            return Err(err);
        }
        let user = User::from_new(user);
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_username_or_email(&self, key: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.username == key || u.email.eq_ignore_ascii_case(key))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> AppResult<User> {
        let mut users = self.users.write().await;
        if !users.contains_key(&id) {
            return Err(AppError::NotFound(id));
        }
        if let Some(err) = conflict(
            &users,
            Some(id),
            changes.username.as_deref(),
            changes.email.as_deref(),
        ) {
            return Err(err);
        }
        let user = users.get_mut(&id).ok_or(AppError::NotFound(id))?;
        user.apply(changes);
        Ok(user.clone())
    }

    async fn record_login(&self, id: Uuid) -> AppResult<()> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(AppError::NotFound(id))?;
        user.last_login = Some(OffsetDateTime::now_utc());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.users
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(AppError::NotFound(id))
    }
}
