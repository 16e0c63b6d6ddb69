use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::products::ProductEntity;

/// Read-only catalog view. Consulted when a product is added to a cart, never at checkout.
#[automock]
#[async_trait]
pub trait CatalogRepository {
    async fn get_product(&self, product_id: Uuid) -> Result<Option<ProductEntity>>;
}
