//! Identity lookup and credential verification.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use super::repositories::entities::user;
use crate::domain::{Password, User, UserRole};
use crate::errors::AppResult;

/// The authenticated principal a token is issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub user_name: String,
    pub role: UserRole,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            user_name: user.user_name.clone(),
            role: user.role,
        }
    }
}

/// Read-only view of the user store used by authentication.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// `Some` only when the user exists and the password matches.
    async fn verify_credentials(&self, user_name: &str, password: &str)
        -> AppResult<Option<Identity>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn find_by_user_name(&self, user_name: &str) -> AppResult<Option<User>>;
}

/// [`IdentityStore`] reading committed users straight from the database.
#[derive(Clone)]
pub struct UserDirectory {
    db: DatabaseConnection,
}

impl UserDirectory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentityStore for UserDirectory {
    async fn verify_credentials(
        &self,
        user_name: &str,
        password: &str,
    ) -> AppResult<Option<Identity>> {
        let Some(user) = self.find_by_user_name(user_name).await? else {
            // Same hashing cost as a real miss, so user names cannot be probed by timing.
            Password::verify_dummy(password);
            return Ok(None);
        };

        if !Password::from_hash(user.password_hash.clone()).verify(password) {
            return Ok(None);
        }

        Ok(Some(Identity::from(&user)))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let found = user::Entity::find_by_id(id).one(&self.db).await?;
        Ok(found.map(User::from))
    }

    async fn find_by_user_name(&self, user_name: &str) -> AppResult<Option<User>> {
        let found = user::Entity::find()
            .filter(user::Column::UserName.eq(user_name))
            .one(&self.db)
            .await?;
        Ok(found.map(User::from))
    }
}
