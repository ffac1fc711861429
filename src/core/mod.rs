pub mod cart;
pub mod checkout;
pub mod engine;
pub mod reconcile;
pub mod store;
pub mod view;

pub use crate::domain::model::{
    CartLine, CatalogProduct, Category, PersistedCartSnapshot, Price, ProductId, SnapshotEntry,
};
pub use crate::domain::ports::{CatalogClient, ConfigProvider, SnapshotSlot};
pub use crate::utils::error::Result;
