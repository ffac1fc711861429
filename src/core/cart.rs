use crate::core::{CartLine, PersistedCartSnapshot, Price, ProductId, SnapshotEntry};
use crate::utils::error::{CartError, Result};

/// Ordered cart lines, at most one per product, none with quantity zero.
///
/// Mutators return whether anything changed so the engine only persists
/// and re-renders on real transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Adds `quantity` units. A product already in the cart keeps the name
    /// and price it was first added with.
    pub fn add_item(
        &mut self,
        product_id: ProductId,
        name: impl Into<String>,
        unit_price: Price,
        quantity: u32,
    ) -> Result<()> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity {
                input: quantity.to_string(),
            });
        }

        match self.line_mut(product_id) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => self.lines.push(CartLine {
                product_id,
                name: name.into(),
                unit_price,
                quantity,
            }),
        }
        Ok(())
    }

    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> Result<bool> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity {
                input: quantity.to_string(),
            });
        }

        match self.line_mut(product_id) {
            Some(line) if line.quantity != quantity => {
                line.quantity = quantity;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn increment(&mut self, product_id: ProductId) -> bool {
        match self.line_mut(product_id) {
            Some(line) if line.quantity < u32::MAX => {
                line.quantity += 1;
                true
            }
            _ => false,
        }
    }

    /// Removes the line instead of letting it reach zero.
    pub fn decrement(&mut self, product_id: ProductId) -> bool {
        let Some(line) = self.line_mut(product_id) else {
            return false;
        };
        if line.quantity > 1 {
            line.quantity -= 1;
            return true;
        }
        self.remove_item(product_id)
    }

    pub fn remove_item(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.product_id != product_id);
        self.lines.len() != before
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.lines.is_empty();
        self.lines.clear();
        changed
    }

    /// Swaps in a whole new set of lines, keeping the per-product and
    /// non-zero invariants: zero quantities are dropped and repeated ids
    /// are folded into their first occurrence.
    pub fn replace_lines(&mut self, lines: Vec<CartLine>) {
        let mut next = Cart::new();
        for line in lines {
            if let Err(e) = next.add_item(line.product_id, line.name, line.unit_price, line.quantity)
            {
                tracing::debug!("Skipping line for product {}: {}", line.product_id, e);
            }
        }
        *self = next;
    }

    pub fn snapshot(&self) -> PersistedCartSnapshot {
        PersistedCartSnapshot::new(
            self.lines
                .iter()
                .map(|line| SnapshotEntry {
                    product_id: line.product_id,
                    quantity: line.quantity,
                })
                .collect(),
        )
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }
}
