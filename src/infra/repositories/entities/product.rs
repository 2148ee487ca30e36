//! Product database entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::Product;
use std::sync::{Arc, OnceLock};

use crate::infra::repositories::{Record, Repository, RepositorySlots};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub unit_price: f64,
    pub created_by: Uuid,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Record for Model {
    type Table = Entity;
    type Active = ActiveModel;

    const NAME: &'static str = "product";

    fn id(&self) -> Uuid {
        self.id
    }

    fn id_column() -> Column {
        Column::Id
    }

    fn slot(slots: &RepositorySlots) -> &OnceLock<Arc<Repository<Self>>> {
        &slots.products
    }
}

impl From<Model> for Product {
    fn from(model: Model) -> Self {
        Product {
            id: model.id,
            name: model.name,
            description: model.description,
            quantity: model.quantity,
            unit_price: model.unit_price,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<Product> for Model {
    fn from(product: Product) -> Self {
        Model {
            id: product.id,
            name: product.name,
            description: product.description,
            quantity: product.quantity,
            unit_price: product.unit_price,
            created_by: product.created_by,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}
