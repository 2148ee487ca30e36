//! User database entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::{User, UserRole};
use std::sync::{Arc, OnceLock};

use crate::infra::repositories::{Record, Repository, RepositorySlots};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub user_name: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Record for Model {
    type Table = Entity;
    type Active = ActiveModel;

    const NAME: &'static str = "user";

    fn id(&self) -> Uuid {
        self.id
    }

    fn id_column() -> Column {
        Column::Id
    }

    fn slot(slots: &RepositorySlots) -> &OnceLock<Arc<Repository<Self>>> {
        &slots.users
    }
}

/// Convert database model to domain entity
impl From<Model> for User {
    fn from(model: Model) -> Self {
        User {
            id: model.id,
            user_name: model.user_name,
            email: model.email,
            password_hash: model.password_hash,
            role: UserRole::from(model.role.as_str()),
            created_at: model.created_at,
        }
    }
}

impl From<User> for Model {
    fn from(user: User) -> Self {
        Model {
            id: user.id,
            user_name: user.user_name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role.to_string(),
            created_at: user.created_at,
        }
    }
}
