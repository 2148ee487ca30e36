//! Product service - Inventory use cases.
//!
//! Every operation runs in its own unit of work; writes commit before
//! the result is returned.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{NewProduct, Product, ProductChanges};
use crate::errors::{AppResult, OptionExt};
use crate::infra::{Persistence, ProductRecord};

#[async_trait]
pub trait ProductService: Send + Sync {
    async fn list_products(&self) -> AppResult<Vec<Product>>;

    async fn get_product(&self, id: Uuid) -> AppResult<Product>;

    /// Create a product owned by `owner`.
    async fn create_product(&self, owner: Uuid, input: NewProduct) -> AppResult<Product>;

    /// Apply a partial update. Absent fields keep their current value.
    async fn update_product(&self, id: Uuid, changes: ProductChanges) -> AppResult<Product>;

    async fn delete_product(&self, id: Uuid) -> AppResult<()>;
}

pub struct ProductManager {
    persistence: Arc<Persistence>,
}

impl ProductManager {
    pub fn new(persistence: Arc<Persistence>) -> Self {
        Self { persistence }
    }
}

#[async_trait]
impl ProductService for ProductManager {
    async fn list_products(&self) -> AppResult<Vec<Product>> {
        let uow = self.persistence.begin();
        let mut products: Vec<Product> = uow
            .repository::<ProductRecord>()?
            .get_all()
            .await?
            .into_iter()
            .map(Product::from)
            .collect();
        products.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        Ok(products)
    }

    async fn get_product(&self, id: Uuid) -> AppResult<Product> {
        let uow = self.persistence.begin();
        let record = uow
            .repository::<ProductRecord>()?
            .get_by_id(id)
            .await?
            .ok_or_not_found()?;
        Ok(Product::from(record))
    }

    async fn create_product(&self, owner: Uuid, input: NewProduct) -> AppResult<Product> {
        let product = Product::new(input, owner);

        let uow = self.persistence.begin();
        uow.repository::<ProductRecord>()?
            .add(ProductRecord::from(product.clone()))?;
        uow.commit().await?;

        tracing::info!(product_id = %product.id, owner = %owner, "product created");
        Ok(product)
    }

    async fn update_product(&self, id: Uuid, changes: ProductChanges) -> AppResult<Product> {
        let uow = self.persistence.begin();
        let products = uow.repository::<ProductRecord>()?;

        let mut product = Product::from(products.get_by_id(id).await?.ok_or_not_found()?);
        product.apply(changes);
        products.update(ProductRecord::from(product.clone())).await?;
        uow.commit().await?;

        tracing::info!(product_id = %id, "product updated");
        Ok(product)
    }

    async fn delete_product(&self, id: Uuid) -> AppResult<()> {
        let uow = self.persistence.begin();
        uow.repository::<ProductRecord>()?.remove(id).await?;
        uow.commit().await?;

        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }
}
