// Adapters layer: concrete implementations of the domain ports.

pub mod file_slot;
pub mod http_catalog;
pub mod memory_slot;

pub use file_slot::FileSlot;
pub use http_catalog::HttpCatalogClient;
pub use memory_slot::MemorySlot;
