use crate::core::cart::Cart;
use crate::core::engine::CartEngine;
use crate::core::view::escape_html;
use crate::core::{Price, SnapshotSlot};
use crate::utils::error::CartError;
use chrono::{DateTime, Utc};
use std::fmt;

/// `name` is already escaped for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLine {
    pub name: String,
    pub quantity: u32,
    pub line_total: Price,
}

/// What the shopper is asked to confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSummary {
    pub lines: Vec<CheckoutLine>,
    pub total: Price,
    pub prepared_at: DateTime<Utc>,
}

impl CheckoutSummary {
    pub fn from_cart(cart: &Cart) -> Option<Self> {
        if cart.is_empty() {
            return None;
        }
        Some(Self {
            lines: cart
                .lines()
                .iter()
                .map(|line| CheckoutLine {
                    name: escape_html(&line.name),
                    quantity: line.quantity,
                    line_total: line.line_total(),
                })
                .collect(),
            total: cart.total(),
            prepared_at: Utc::now(),
        })
    }

    /// When the summary was prepared, for the confirmation prompt.
    pub fn prepared_label(&self) -> String {
        self.prepared_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    }

    fn same_items(&self, other: &CheckoutSummary) -> bool {
        self.lines == other.lines && self.total == other.total
    }
}

impl fmt::Display for CheckoutSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "You are about to checkout the following items:")?;
        writeln!(f)?;
        for line in &self.lines {
            writeln!(
                f,
                "{} - Quantity: {} - Price: ${}",
                line.name, line.quantity, line.line_total
            )?;
        }
        writeln!(f)?;
        write!(f, "Total: ${}", self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Nothing to check out. Guidance for the shopper, not a failure.
    EmptyCart { guidance: String },
    AwaitingConfirmation(CheckoutSummary),
    Completed(CheckoutSummary),
    Cancelled,
}

impl CheckoutOutcome {
    fn empty_cart() -> Self {
        CheckoutOutcome::EmptyCart {
            guidance: CartError::EmptyCartCheckout.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CheckoutState {
    #[default]
    Idle,
    Confirming(CheckoutSummary),
}

/// `Idle -> Confirming -> Idle`, clearing the cart only on confirm.
#[derive(Debug, Default)]
pub struct CheckoutFlow {
    state: CheckoutState,
}

impl CheckoutFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    pub fn begin(&mut self, cart: &Cart) -> CheckoutOutcome {
        match CheckoutSummary::from_cart(cart) {
            Some(summary) => {
                self.state = CheckoutState::Confirming(summary.clone());
                CheckoutOutcome::AwaitingConfirmation(summary)
            }
            None => {
                tracing::debug!("Checkout requested on an empty cart");
                self.state = CheckoutState::Idle;
                CheckoutOutcome::empty_cart()
            }
        }
    }

    /// Clears the cart if it still holds what the shopper was shown. If it
    /// changed since [`begin`](Self::begin), a fresh summary is returned for
    /// confirmation instead.
    pub fn confirm<S: SnapshotSlot>(&mut self, engine: &mut CartEngine<S>) -> CheckoutOutcome {
        let CheckoutState::Confirming(shown) = std::mem::take(&mut self.state) else {
            return self.begin(engine.cart());
        };

        match CheckoutSummary::from_cart(engine.cart()) {
            Some(current) if current.same_items(&shown) => {
                engine.clear();
                tracing::info!(
                    "Checked out {} lines totalling ${}",
                    shown.lines.len(),
                    shown.total
                );
                CheckoutOutcome::Completed(shown)
            }
            Some(current) => {
                tracing::debug!("Cart changed while confirming checkout");
                self.state = CheckoutState::Confirming(current.clone());
                CheckoutOutcome::AwaitingConfirmation(current)
            }
            None => CheckoutOutcome::empty_cart(),
        }
    }

    pub fn cancel(&mut self) -> CheckoutOutcome {
        self.state = CheckoutState::Idle;
        CheckoutOutcome::Cancelled
    }
}
