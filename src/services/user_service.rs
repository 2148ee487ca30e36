//! User service - Handles user-related business logic.
//!
//! Reads go through the identity store; registration stages the new user
//! in a unit of work and commits it.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Password, User};
use crate::errors::{AppError, AppResult};
use crate::infra::{IdentityStore, Persistence, UserRecord};

/// User service trait for dependency injection.
#[async_trait]
pub trait UserService: Send + Sync {
    async fn list_users(&self) -> AppResult<Vec<User>>;

    async fn get_user(&self, id: Uuid) -> AppResult<User>;

    /// Create a user with the default role.
    async fn register(
        &self,
        user_name: String,
        email: Option<String>,
        password: String,
    ) -> AppResult<User>;
}

/// Concrete implementation of UserService using Unit of Work.
pub struct UserManager<I: IdentityStore> {
    persistence: Arc<Persistence>,
    identities: Arc<I>,
}

impl<I: IdentityStore> UserManager<I> {
    pub fn new(persistence: Arc<Persistence>, identities: Arc<I>) -> Self {
        Self {
            persistence,
            identities,
        }
    }
}

#[async_trait]
impl<I: IdentityStore + 'static> UserService for UserManager<I> {
    async fn list_users(&self) -> AppResult<Vec<User>> {
        let uow = self.persistence.begin();
        let mut users: Vec<User> = uow
            .repository::<UserRecord>()?
            .get_all()
            .await?
            .into_iter()
            .map(User::from)
            .collect();
        users.sort_by(|a, b| a.user_name.cmp(&b.user_name));
        Ok(users)
    }

    async fn get_user(&self, id: Uuid) -> AppResult<User> {
        self.identities
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn register(
        &self,
        user_name: String,
        email: Option<String>,
        password: String,
    ) -> AppResult<User> {
        if self.identities.find_by_user_name(&user_name).await?.is_some() {
            return Err(AppError::conflict("User"));
        }

        let password_hash = Password::new(&password)?.into_string();
        let user = User::new(user_name, email, password_hash);

        let uow = self.persistence.begin();
        uow.repository::<UserRecord>()?
            .add(UserRecord::from(user.clone()))?;
        uow.commit().await.map_err(|e| match e {
            // Lost a race with a concurrent registration of the same name.
            AppError::Persistence(ref db)
                if matches!(db.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) =>
            {
                AppError::conflict("User")
            }
            other => other,
        })?;

        tracing::info!(user_id = %user.id, user_name = %user.user_name, "user registered");
        Ok(user)
    }
}
