use clap::Subcommand;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Subcommand)]
pub enum Command {
    /// Print the cart
    Show {
        #[arg(long, help = "Print the shopping-list HTML fragment")]
        html: bool,
    },
    /// Add a catalog product to the cart
    Add {
        pid: String,
        #[arg(long, short, default_value = "1")]
        quantity: String,
    },
    /// Replace the quantity of a line
    Set { pid: String, quantity: String },
    /// Add one unit to a line
    Inc { pid: String },
    /// Remove one unit from a line, dropping it at zero
    Dec { pid: String },
    /// Delete a line
    Remove { pid: String },
    /// Empty the cart
    Clear,
    /// Summarize the cart and empty it
    Checkout {
        #[arg(long, help = "Show the summary but keep the cart")]
        cancel: bool,
    },
    /// List catalog categories
    Categories,
    /// List catalog products
    Browse {
        #[arg(long)]
        category: Option<u64>,
    },
}
