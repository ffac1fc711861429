use crate::domain::model::{CatalogProduct, Category, ProductId};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// A durable key-value slot, the way a browser's local storage is one.
/// Reads and writes are local and synchronous.
pub trait SnapshotSlot: Send + Sync {
    /// `Ok(None)` when nothing has been stored under `key` yet.
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// Read-only view of the external catalog service.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn product(&self, id: ProductId) -> Result<CatalogProduct>;
    async fn products(&self, category_id: Option<u64>) -> Result<Vec<CatalogProduct>>;
    async fn categories(&self) -> Result<Vec<Category>>;
}

pub trait ConfigProvider: Send + Sync {
    fn catalog_endpoint(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn lookup_timeout(&self) -> Duration;
    fn store_path(&self) -> &str;
    fn store_key(&self) -> &str;
}
