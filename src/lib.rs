pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{FileSlot, HttpCatalogClient, MemorySlot};
pub use config::toml_config::TomlConfig;
pub use core::{
    cart::Cart,
    checkout::{CheckoutFlow, CheckoutOutcome, CheckoutSummary},
    engine::{CartEngine, CartObserver},
    reconcile::{Reconciler, Reconciliation, RestorePoint},
    store::CartStore,
    view::{escape_html, CartView},
};
pub use domain::model::{CartLine, CatalogProduct, PersistedCartSnapshot, Price, ProductId};
pub use utils::error::{CartError, Result};
