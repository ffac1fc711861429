use crate::core::engine::CartEngine;
use crate::core::{
    CartLine, CatalogClient, CatalogProduct, PersistedCartSnapshot, ProductId, SnapshotEntry,
    SnapshotSlot,
};
use crate::utils::error::{CartError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// A persisted entry the catalog could not back with a live product.
#[derive(Debug)]
pub struct DroppedLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub reason: CartError,
}

/// The stored snapshot a pass resolves, plus the engine state it was read
/// against: the engine's commit epoch and the ids the cart held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestorePoint {
    pub snapshot: PersistedCartSnapshot,
    pub epoch: u64,
    pub held: Vec<ProductId>,
}

impl From<PersistedCartSnapshot> for RestorePoint {
    fn from(snapshot: PersistedCartSnapshot) -> Self {
        Self {
            snapshot,
            ..Self::default()
        }
    }
}

impl From<&PersistedCartSnapshot> for RestorePoint {
    fn from(snapshot: &PersistedCartSnapshot) -> Self {
        Self::from(snapshot.clone())
    }
}

/// Result of one reconciliation pass.
#[derive(Debug)]
pub struct Reconciliation {
    generation: u64,
    latest: Arc<AtomicU64>,
    pub(crate) epoch: u64,
    pub(crate) held: Vec<ProductId>,
    pub lines: Vec<CartLine>,
    pub dropped: Vec<DroppedLine>,
}

impl Reconciliation {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Commit epoch of the engine when the snapshot was read.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// False once a newer pass has been started on the same reconciler.
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.generation
    }
}

/// Resolves snapshots against the catalog, one concurrent lookup per
/// distinct product. Live catalog name and price always replace whatever
/// the cart showed before.
pub struct Reconciler<C: CatalogClient + 'static> {
    catalog: Arc<C>,
    lookup_timeout: Duration,
    generation: Arc<AtomicU64>,
}

impl<C: CatalogClient + 'static> Reconciler<C> {
    pub fn new(catalog: Arc<C>) -> Self {
        Self::with_timeout(catalog, DEFAULT_LOOKUP_TIMEOUT)
    }

    pub fn with_timeout(catalog: Arc<C>, lookup_timeout: Duration) -> Self {
        Self {
            catalog,
            lookup_timeout,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub async fn reconcile(&self, point: impl Into<RestorePoint>) -> Reconciliation {
        let point = point.into();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let entries = point.snapshot.deduplicated();
        let mut reconciliation = Reconciliation {
            generation,
            latest: Arc::clone(&self.generation),
            epoch: point.epoch,
            held: point.held,
            lines: Vec::with_capacity(entries.len()),
            dropped: Vec::new(),
        };
        if entries.is_empty() {
            tracing::debug!("Pass {}: nothing stored, no lookups issued", generation);
            return reconciliation;
        }

        tracing::debug!(
            "Pass {}: resolving {} stored products",
            generation,
            entries.len()
        );

        let timeout_ms = u64::try_from(self.lookup_timeout.as_millis()).unwrap_or(u64::MAX);
        let mut lookups = JoinSet::new();
        for (index, entry) in entries.iter().copied().enumerate() {
            let catalog = Arc::clone(&self.catalog);
            let lookup_timeout = self.lookup_timeout;
            lookups.spawn(async move {
                let id = entry.product_id;
                let result = match tokio::time::timeout(lookup_timeout, catalog.product(id)).await {
                    Ok(result) => result,
                    Err(_) => Err(CartError::LookupTimeout {
                        id: id.get(),
                        timeout_ms,
                    }),
                };
                (index, result)
            });
        }

        let mut settled: Vec<Option<Result<CatalogProduct>>> =
            entries.iter().map(|_| None).collect();
        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((index, result)) => settled[index] = Some(result),
                Err(e) => tracing::warn!("Pass {}: catalog lookup task failed: {}", generation, e),
            }
        }

        for (entry, result) in entries.into_iter().zip(settled) {
            let result = result.unwrap_or_else(|| {
                Err(CartError::ProductUnavailable {
                    id: entry.product_id.get(),
                    reason: "lookup did not complete".to_string(),
                })
            });
            match result {
                Ok(product) if product.available => reconciliation.lines.push(CartLine {
                    product_id: entry.product_id,
                    name: product.name,
                    unit_price: product.price,
                    quantity: entry.quantity,
                }),
                Ok(_) => drop_entry(
                    &mut reconciliation,
                    entry,
                    "marked unavailable by the catalog".to_string(),
                ),
                Err(e) => drop_entry(&mut reconciliation, entry, e.to_string()),
            }
        }

        tracing::info!(
            "Restored {} of {} stored cart lines",
            reconciliation.lines.len(),
            reconciliation.lines.len() + reconciliation.dropped.len()
        );
        reconciliation
    }

    /// Loads the engine's stored snapshot, reconciles it and applies the
    /// result. Returns false when the pass was superseded.
    pub async fn restore<S: SnapshotSlot>(&self, engine: &mut CartEngine<S>) -> bool {
        let reconciliation = self.reconcile(engine.restore_point()).await;
        engine.apply_reconciliation(reconciliation)
    }
}

fn drop_entry(reconciliation: &mut Reconciliation, entry: SnapshotEntry, reason: String) {
    let error = CartError::ProductUnavailable {
        id: entry.product_id.get(),
        reason,
    };
    tracing::warn!("Dropping from restored cart: {}", error);
    reconciliation.dropped.push(DroppedLine {
        product_id: entry.product_id,
        quantity: entry.quantity,
        reason: error,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_slot::MemorySlot;
    use crate::core::store::CartStore;
    use crate::core::{Category, Price};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct FakeCatalog {
        products: HashMap<u64, CatalogProduct>,
        delays: HashMap<u64, Duration>,
        calls: AtomicUsize,
    }

    impl FakeCatalog {
        fn with(mut self, id: u64, name: &str, cents: u64) -> Self {
            self.products.insert(id, product(id, name, cents));
            self
        }

        fn delayed(mut self, id: u64, delay: Duration) -> Self {
            self.delays.insert(id, delay);
            self
        }
    }

    fn product(id: u64, name: &str, cents: u64) -> CatalogProduct {
        CatalogProduct {
            id: ProductId::new(id).unwrap(),
            name: name.to_string(),
            price: Price::from_cents(cents),
            category_id: None,
            description: None,
            thumbnail_path: None,
            image_path: None,
            available: true,
        }
    }

    #[async_trait]
    impl CatalogClient for FakeCatalog {
        async fn product(&self, id: ProductId) -> Result<CatalogProduct> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delays.get(&id.get()) {
                tokio::time::sleep(*delay).await;
            }
            self.products
                .get(&id.get())
                .cloned()
                .ok_or(CartError::ProductNotFound { id: id.get() })
        }

        async fn products(&self, _category_id: Option<u64>) -> Result<Vec<CatalogProduct>> {
            Ok(self.products.values().cloned().collect())
        }

        async fn categories(&self) -> Result<Vec<Category>> {
            Ok(Vec::new())
        }
    }

    fn snapshot(pairs: &[(u64, u32)]) -> PersistedCartSnapshot {
        PersistedCartSnapshot::new(
            pairs
                .iter()
                .map(|(id, quantity)| SnapshotEntry {
                    product_id: ProductId::new(*id).unwrap(),
                    quantity: *quantity,
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn empty_snapshot_issues_no_lookups() {
        let catalog = Arc::new(FakeCatalog::default().with(1, "A", 100));
        let reconciler = Reconciler::new(Arc::clone(&catalog));

        let result = reconciler.reconcile(&PersistedCartSnapshot::default()).await;

        assert!(result.lines.is_empty());
        assert!(result.dropped.is_empty());
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_product_is_dropped_and_order_kept() {
        let catalog = Arc::new(
            FakeCatalog::default()
                .with(3, "Three", 300)
                .with(1, "One", 100)
                .delayed(3, Duration::from_millis(30)),
        );
        let reconciler = Reconciler::new(catalog);

        let result = reconciler
            .reconcile(&snapshot(&[(3, 2), (2, 1), (1, 4)]))
            .await;

        let ids: Vec<u64> = result.lines.iter().map(|l| l.product_id.get()).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(result.lines[0].quantity, 2);
        assert_eq!(result.dropped.len(), 1);
        assert_eq!(result.dropped[0].product_id.get(), 2);
        assert!(matches!(
            result.dropped[0].reason,
            CartError::ProductUnavailable { id: 2, .. }
        ));
    }

    #[tokio::test]
    async fn duplicate_ids_are_looked_up_once() {
        let catalog = Arc::new(FakeCatalog::default().with(4, "Four", 400));
        let reconciler = Reconciler::new(Arc::clone(&catalog));

        let result = reconciler.reconcile(&snapshot(&[(4, 1), (4, 2)])).await;

        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].quantity, 3);
    }

    #[tokio::test]
    async fn slow_lookup_times_out_as_failure() {
        let catalog = Arc::new(
            FakeCatalog::default()
                .with(1, "Fast", 100)
                .with(2, "Slow", 200)
                .delayed(2, Duration::from_secs(5)),
        );
        let reconciler = Reconciler::with_timeout(catalog, Duration::from_millis(50));

        let result = reconciler.reconcile(&snapshot(&[(1, 1), (2, 1)])).await;

        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].name, "Fast");
        assert_eq!(result.dropped.len(), 1);
        assert!(result.dropped[0].reason.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn unavailable_products_are_dropped() {
        let mut hidden = product(6, "Hidden", 600);
        hidden.available = false;
        let mut catalog = FakeCatalog::default();
        catalog.products.insert(6, hidden);
        let reconciler = Reconciler::new(Arc::new(catalog));

        let result = reconciler.reconcile(&snapshot(&[(6, 1)])).await;

        assert!(result.lines.is_empty());
        assert_eq!(result.dropped.len(), 1);
    }

    #[tokio::test]
    async fn newer_pass_supersedes_older() {
        let catalog = Arc::new(
            FakeCatalog::default()
                .with(1, "One", 100)
                .delayed(1, Duration::from_millis(80))
                .with(2, "Two", 200),
        );
        let reconciler = Reconciler::new(catalog);

        let slow = snapshot(&[(1, 1)]);
        let fast = snapshot(&[(2, 1)]);
        let (older, newer) = tokio::join!(reconciler.reconcile(&slow), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            reconciler.reconcile(&fast).await
        });

        assert_eq!(older.generation(), 1);
        assert_eq!(newer.generation(), 2);
        assert!(!older.is_current());
        assert!(newer.is_current());
    }

    fn stored_engine(raw: &str) -> (CartEngine<MemorySlot>, MemorySlot) {
        let slot = MemorySlot::new();
        slot.write("shoppingList", raw).unwrap();
        (CartEngine::new(CartStore::new(slot.clone())), slot)
    }

    fn slot_ids(slot: &MemorySlot) -> Vec<u64> {
        let raw = slot.read("shoppingList").unwrap().unwrap();
        let stored: PersistedCartSnapshot = serde_json::from_str(&raw).unwrap();
        stored.entries.iter().map(|e| e.product_id.get()).collect()
    }

    fn cart_ids<S: SnapshotSlot>(engine: &CartEngine<S>) -> Vec<u64> {
        engine
            .cart()
            .lines()
            .iter()
            .map(|l| l.product_id.get())
            .collect()
    }

    #[tokio::test]
    async fn add_during_pass_is_merged_and_persisted() {
        let catalog = Arc::new(FakeCatalog::default().with(1, "One", 100));
        let reconciler = Reconciler::new(catalog);
        let (mut engine, slot) = stored_engine(r#"[{"id":1,"quantity":1}]"#);

        let pass = reconciler.reconcile(engine.restore_point()).await;
        engine
            .add_item(ProductId::new(9).unwrap(), "Nine", Price::from_cents(900), 1)
            .unwrap();

        assert!(engine.apply_reconciliation(pass));
        assert_eq!(cart_ids(&engine), vec![9, 1]);
        assert_eq!(slot_ids(&slot), cart_ids(&engine));
    }

    #[tokio::test]
    async fn in_session_line_wins_over_restored_one() {
        let catalog = Arc::new(FakeCatalog::default().with(1, "One", 100));
        let reconciler = Reconciler::new(catalog);
        let (mut engine, slot) = stored_engine(r#"[{"id":1,"quantity":5}]"#);

        let pass = reconciler.reconcile(engine.restore_point()).await;
        engine
            .add_item(ProductId::new(1).unwrap(), "One", Price::from_cents(100), 2)
            .unwrap();
        engine.apply_reconciliation(pass);

        assert_eq!(engine.cart().lines()[0].quantity, 2);
        assert_eq!(engine.persisted_snapshot(), engine.cart().snapshot());
        assert_eq!(slot_ids(&slot), vec![1]);
    }

    #[tokio::test]
    async fn lines_removed_during_pass_stay_removed() {
        let catalog = Arc::new(FakeCatalog::default().with(1, "One", 100).with(2, "Two", 200));
        let reconciler = Reconciler::new(catalog);
        let (mut engine, slot) = stored_engine(r#"[{"id":1,"quantity":1},{"id":2,"quantity":1}]"#);
        assert!(reconciler.restore(&mut engine).await);

        let pass = reconciler.reconcile(engine.restore_point()).await;
        engine.clear();
        assert!(engine.apply_reconciliation(pass));

        assert!(engine.cart().is_empty());
        assert!(slot_ids(&slot).is_empty());
    }

    #[tokio::test]
    async fn pass_without_intervening_commit_does_not_write_back() {
        let catalog = Arc::new(FakeCatalog::default().with(1, "One", 100));
        let reconciler = Reconciler::new(catalog);
        let (mut engine, slot) = stored_engine(r#"[{"id":1,"quantity":1},{"id":2,"quantity":1}]"#);

        let pass = reconciler.reconcile(engine.restore_point()).await;
        assert_eq!(pass.epoch(), engine.epoch());
        assert!(engine.apply_reconciliation(pass));

        assert_eq!(cart_ids(&engine), vec![1]);
        assert_eq!(slot_ids(&slot), vec![1, 2]);
        assert_eq!(engine.epoch(), 0);
    }
}
