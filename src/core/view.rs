use crate::core::cart::Cart;
use crate::core::ProductId;
use serde::Serialize;
use std::fmt::Write;

/// Escapes the five characters that matter inside HTML text and attributes.
///
/// Product names are editable by catalog admins and end up in markup, so
/// every name goes through here before it reaches a view.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineView {
    pub product_id: ProductId,
    /// Already HTML-escaped.
    pub display_name: String,
    pub unit_price_formatted: String,
    pub quantity: u32,
    pub line_total_formatted: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub lines: Vec<LineView>,
    pub grand_total_formatted: String,
    pub line_count: usize,
    pub header: String,
}

impl CartView {
    pub fn from_cart(cart: &Cart) -> Self {
        let lines = cart
            .lines()
            .iter()
            .map(|line| LineView {
                product_id: line.product_id,
                display_name: escape_html(&line.name),
                unit_price_formatted: line.unit_price.to_string(),
                quantity: line.quantity,
                line_total_formatted: line.line_total().to_string(),
            })
            .collect::<Vec<_>>();
        let grand_total_formatted = cart.total().to_string();

        Self {
            line_count: lines.len(),
            header: format!("Shopping List - ${}", grand_total_formatted),
            lines,
            grand_total_formatted,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Renders the shopping-list items as `<li>` elements.
    pub fn render_html(&self) -> String {
        let mut html = String::new();
        for line in &self.lines {
            let id = line.product_id;
            // writing into a String cannot fail
            let _ = write!(
                html,
                concat!(
                    "<li id=\"cart-item-{id}\">",
                    "<span class=\"item-name\">{name}</span> - $<span class=\"unit-price\">{unit}</span> each<br>",
                    "<div class=\"quantity-controls\">",
                    "<button class=\"decrement\">-</button>",
                    "<input type=\"number\" id=\"item-qty-{id}\" value=\"{qty}\" min=\"1\">",
                    "<button class=\"increment\">+</button>",
                    "<button class=\"remove\">Delete</button>",
                    "</div>",
                    "<div class=\"item-total\">Total: $<span>{total}</span></div>",
                    "</li>\n"
                ),
                id = id,
                name = line.display_name,
                unit = line.unit_price_formatted,
                qty = line.quantity,
                total = line.line_total_formatted,
            );
        }
        html
    }

    /// Plain listing for terminals. Names print in their escaped form, the
    /// same text every other surface gets, so output copied into a page is
    /// still inert.
    pub fn render_text(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "{}", self.header);
        if self.lines.is_empty() {
            let _ = writeln!(text, "  (empty)");
        }
        for line in &self.lines {
            let _ = writeln!(
                text,
                "  #{} {} [{}] - ${} each = ${}",
                line.product_id,
                line.display_name,
                line.quantity,
                line.unit_price_formatted,
                line.line_total_formatted
            );
        }
        text
    }
}
