use crate::core::cart::Cart;
use crate::core::checkout::{CheckoutFlow, CheckoutOutcome};
use crate::core::reconcile::{Reconciliation, RestorePoint};
use crate::core::store::CartStore;
use crate::core::view::CartView;
use crate::core::{PersistedCartSnapshot, Price, ProductId, SnapshotSlot};
use crate::utils::error::Result;

/// The single subscriber that re-renders after each state change.
pub trait CartObserver: Send {
    fn cart_changed(&mut self, view: &CartView);
}

impl<F> CartObserver for F
where
    F: FnMut(&CartView) + Send,
{
    fn cart_changed(&mut self, view: &CartView) {
        self(view)
    }
}

/// Owns the authoritative cart. Every transition writes the snapshot
/// through to the store and then notifies the subscriber.
pub struct CartEngine<S: SnapshotSlot> {
    cart: Cart,
    store: CartStore<S>,
    observer: Option<Box<dyn CartObserver>>,
    epoch: u64,
}

impl<S: SnapshotSlot> CartEngine<S> {
    /// Starts with an empty cart; use a reconciliation pass to restore the
    /// stored one.
    pub fn new(store: CartStore<S>) -> Self {
        Self {
            cart: Cart::new(),
            store,
            observer: None,
            epoch: 0,
        }
    }

    /// Replaces any previous subscriber.
    pub fn subscribe(&mut self, observer: impl CartObserver + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn store(&self) -> &CartStore<S> {
        &self.store
    }

    pub fn total(&self) -> Price {
        self.cart.total()
    }

    pub fn view(&self) -> CartView {
        CartView::from_cart(&self.cart)
    }

    pub fn persisted_snapshot(&self) -> PersistedCartSnapshot {
        self.store.load()
    }

    /// Number of committed transitions so far.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Reads the stored snapshot for a reconciliation pass, tagged with the
    /// current epoch and the ids held in memory.
    pub fn restore_point(&self) -> RestorePoint {
        RestorePoint {
            snapshot: self.store.load(),
            epoch: self.epoch,
            held: self.cart.lines().iter().map(|line| line.product_id).collect(),
        }
    }

    pub fn add_item(
        &mut self,
        product_id: ProductId,
        name: impl Into<String>,
        unit_price: Price,
        quantity: u32,
    ) -> Result<&Cart> {
        self.cart.add_item(product_id, name, unit_price, quantity)?;
        tracing::debug!("Added {} x product {}", quantity, product_id);
        self.commit();
        Ok(&self.cart)
    }

    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> Result<&Cart> {
        if self.cart.set_quantity(product_id, quantity)? {
            self.commit();
        }
        Ok(&self.cart)
    }

    pub fn increment(&mut self, product_id: ProductId) -> &Cart {
        if self.cart.increment(product_id) {
            self.commit();
        }
        &self.cart
    }

    pub fn decrement(&mut self, product_id: ProductId) -> &Cart {
        if self.cart.decrement(product_id) {
            self.commit();
        }
        &self.cart
    }

    pub fn remove_item(&mut self, product_id: ProductId) -> &Cart {
        if self.cart.remove_item(product_id) {
            self.commit();
        }
        &self.cart
    }

    pub fn clear(&mut self) -> &Cart {
        if self.cart.clear() {
            self.commit();
        }
        &self.cart
    }

    /// Begins and confirms a checkout in one step.
    pub fn checkout(&mut self) -> CheckoutOutcome {
        let mut flow = CheckoutFlow::new();
        match flow.begin(&self.cart) {
            CheckoutOutcome::AwaitingConfirmation(_) => flow.confirm(self),
            other => other,
        }
    }

    /// Installs the lines of a reconciliation pass in one step. Results of a
    /// superseded pass are discarded and false is returned.
    ///
    /// If nothing was committed since the pass read the slot, the lines
    /// replace the cart and the snapshot is not written back: products that
    /// failed to resolve stay in the slot until the next user action
    /// persists. Otherwise the restored lines are merged under the
    /// in-session ones and the result is committed. Lines the shopper
    /// removed while the pass ran stay removed.
    pub fn apply_reconciliation(&mut self, reconciliation: Reconciliation) -> bool {
        if !reconciliation.is_current() {
            tracing::debug!(
                "Discarding superseded reconciliation pass {}",
                reconciliation.generation()
            );
            return false;
        }

        if reconciliation.epoch == self.epoch {
            self.cart.replace_lines(reconciliation.lines);
            self.notify();
            return true;
        }

        tracing::debug!(
            "Cart changed during reconciliation pass {}, merging restored lines",
            reconciliation.generation()
        );
        let held = reconciliation.held;
        let mut merged = self.cart.lines().to_vec();
        merged.extend(reconciliation.lines.into_iter().filter(|line| {
            self.cart.line(line.product_id).is_none() && !held.contains(&line.product_id)
        }));
        if merged.len() != self.cart.len() {
            self.cart.replace_lines(merged);
            self.commit();
        }
        true
    }

    fn commit(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        if let Err(e) = self.store.save(&self.cart.snapshot()) {
            tracing::warn!("Cart kept in memory only, snapshot write failed: {}", e);
        }
        self.notify();
    }

    fn notify(&mut self) {
        if let Some(observer) = self.observer.as_mut() {
            let view = CartView::from_cart(&self.cart);
            observer.cart_changed(&view);
        }
    }
}
