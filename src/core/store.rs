use crate::core::{PersistedCartSnapshot, ProductId, SnapshotEntry, SnapshotSlot};
use crate::utils::error::{CartError, Result};
use serde_json::Value;

pub const DEFAULT_SLOT_KEY: &str = "shoppingList";

/// JSON codec over one named slot.
pub struct CartStore<S: SnapshotSlot> {
    slot: S,
    key: String,
}

impl<S: SnapshotSlot> CartStore<S> {
    pub fn new(slot: S) -> Self {
        Self::with_key(slot, DEFAULT_SLOT_KEY)
    }

    pub fn with_key(slot: S, key: impl Into<String>) -> Self {
        Self {
            slot,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    /// Never fails: a missing slot is an empty cart, and so is a corrupt one
    /// (after a warning).
    pub fn load(&self) -> PersistedCartSnapshot {
        match self.try_load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                tracing::debug!("No stored cart under '{}'", self.key);
                PersistedCartSnapshot::default()
            }
            Err(e) => {
                tracing::warn!("Ignoring stored cart under '{}': {}", self.key, e);
                PersistedCartSnapshot::default()
            }
        }
    }

    /// Like [`load`](Self::load) but reports corruption as
    /// [`CartError::StoreCorrupt`].
    pub fn try_load(&self) -> Result<Option<PersistedCartSnapshot>> {
        let raw = self
            .slot
            .read(&self.key)
            .map_err(|e| CartError::StoreCorrupt {
                reason: format!("slot could not be read: {}", e),
            })?;
        raw.map(|text| decode_snapshot(&text)).transpose()
    }

    pub fn save(&self, snapshot: &PersistedCartSnapshot) -> Result<()> {
        let encoded = serde_json::to_string(snapshot)?;
        self.slot.write(&self.key, &encoded)?;
        tracing::debug!(
            "Saved {} cart entries under '{}'",
            snapshot.len(),
            self.key
        );
        Ok(())
    }
}

/// The document must be a JSON array. Entries that do not carry a positive
/// id and quantity are skipped one by one so the rest of the cart survives.
fn decode_snapshot(text: &str) -> Result<PersistedCartSnapshot> {
    let document: Value = serde_json::from_str(text).map_err(|e| CartError::StoreCorrupt {
        reason: format!("not valid JSON: {}", e),
    })?;
    let Value::Array(items) = document else {
        return Err(CartError::StoreCorrupt {
            reason: "expected a JSON array of cart entries".to_string(),
        });
    };

    let mut entries = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match decode_entry(item) {
            Some(entry) => entries.push(entry),
            None => tracing::warn!("Skipping malformed stored cart entry #{}", index),
        }
    }
    Ok(PersistedCartSnapshot::new(entries))
}

fn decode_entry(item: Value) -> Option<SnapshotEntry> {
    let id = item.get("id").or_else(|| item.get("productId"))?.as_u64()?;
    let quantity = item.get("quantity")?.as_u64()?;
    let quantity = u32::try_from(quantity).ok().filter(|q| *q >= 1)?;
    Some(SnapshotEntry {
        product_id: ProductId::new(id).ok()?,
        quantity,
    })
}
