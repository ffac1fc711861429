use crate::utils::error::{CartError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Catalog product identifier. Always greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct ProductId(u64);

impl ProductId {
    pub fn new(raw: u64) -> Result<Self> {
        if raw == 0 {
            return Err(CartError::InvalidProductId {
                input: raw.to_string(),
            });
        }
        Ok(Self(raw))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for ProductId {
    type Error = CartError;

    fn try_from(raw: u64) -> Result<Self> {
        Self::new(raw)
    }
}

impl From<ProductId> for u64 {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

impl FromStr for ProductId {
    type Err = CartError;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim().parse::<u64>().map_err(|_| CartError::InvalidProductId {
            input: s.to_string(),
        })?;
        Self::new(raw)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Monetary amount in cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price {
    cents: u64,
}

impl Price {
    pub const ZERO: Price = Price { cents: 0 };

    pub const fn from_cents(cents: u64) -> Self {
        Self { cents }
    }

    pub fn cents(self) -> u64 {
        self.cents
    }

    /// Rounds to the nearest cent. Negative and non-finite values are rejected.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let cents = (value * 100.0).round();
        if cents > u64::MAX as f64 {
            return None;
        }
        Some(Self::from_cents(cents as u64))
    }

    /// Exact decimal parse of strings such as `"12.50"` or `"3"`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (whole, frac) = text.split_once('.').unwrap_or((text, ""));
        if whole.is_empty() && frac.is_empty() {
            return None;
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }

        let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let mut digits = frac.bytes().map(|b| u64::from(b - b'0'));
        let tenths = digits.next().unwrap_or(0);
        let hundredths = digits.next().unwrap_or(0);
        let round_up = digits.next().is_some_and(|d| d >= 5);

        whole
            .checked_mul(100)?
            .checked_add(tenths * 10 + hundredths)?
            .checked_add(u64::from(round_up))
            .map(Self::from_cents)
    }

    pub fn times(self, quantity: u32) -> Self {
        Self::from_cents(self.cents.saturating_mul(u64::from(quantity)))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl std::iter::Sum for Price {
    fn sum<I: Iterator<Item = Price>>(iter: I) -> Self {
        iter.fold(Price::ZERO, |acc, p| {
            Price::from_cents(acc.cents.saturating_add(p.cents))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Price,
    pub quantity: u32,
}

impl CartLine {
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    #[serde(rename = "id", alias = "productId")]
    pub product_id: ProductId,
    pub quantity: u32,
}

/// What survives in the durable slot: ids and quantities only. Names and
/// prices are fetched again from the catalog on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistedCartSnapshot {
    pub entries: Vec<SnapshotEntry>,
}

impl PersistedCartSnapshot {
    pub fn new(entries: Vec<SnapshotEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Merges repeated ids into the first occurrence, summing quantities.
    pub fn deduplicated(&self) -> Vec<SnapshotEntry> {
        let mut merged: Vec<SnapshotEntry> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            match merged.iter_mut().find(|e| e.product_id == entry.product_id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(entry.quantity)
                }
                None => merged.push(*entry),
            }
        }
        merged
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub category_id: Option<u64>,
    pub description: Option<String>,
    pub thumbnail_path: Option<String>,
    pub image_path: Option<String>,
    pub available: bool,
}

impl CatalogProduct {
    /// Thumbnail first, then the full image, then the storefront's
    /// conventional fallback path.
    pub fn display_image(&self) -> String {
        self.thumbnail_path
            .clone()
            .or_else(|| self.image_path.clone())
            .unwrap_or_else(|| format!("images/product{}.jpg", self.id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub catid: u64,
    pub name: String,
}
