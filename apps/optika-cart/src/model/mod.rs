use serde::Deserialize;
use std::fmt;

/// Hard per-line purchase cap enforced by the storefront regardless of stock.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Stock status reported by the cart service for a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    Available,
    OutOfStock,
    Unavailable,
    #[serde(other)]
    Unknown,
}

impl LineStatus {
    /// Whether quantity edits are accepted for a line in this status.
    /// Out-of-stock and unavailable lines are pinned at the server quantity.
    pub fn is_editable(self) -> bool {
        matches!(self, LineStatus::Available | LineStatus::Unknown)
    }
}

/// One product-variant entry in the cart, as last confirmed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    /// Server-issued id once the line is persisted. Absent for a line the
    /// client added optimistically but the service has not acknowledged.
    pub cart_item_id: Option<String>,
    pub variant_id: String,
    pub product_slug: String,
    /// Server-confirmed quantity.
    pub quantity: u32,
    /// Upper bound for the quantity; `None` means unbounded.
    pub available_inventory: Option<u32>,
    pub status: LineStatus,
}

impl CartLine {
    /// Maximum purchasable quantity for this line:
    /// `min(MAX_LINE_QUANTITY, available_inventory)`.
    pub fn purchase_limit(&self) -> u32 {
        self.available_inventory
            .map_or(MAX_LINE_QUANTITY, |inventory| {
                inventory.min(MAX_LINE_QUANTITY)
            })
    }

    /// Clamp a requested quantity into `[1, purchase_limit]`. Applied at
    /// commit time (blur or +/- step), never during free typing.
    pub fn clamp_quantity(&self, requested: u32) -> u32 {
        requested.clamp(1, self.purchase_limit().max(1))
    }
}

/// Stable identity for a cart line within a UI session.
///
/// The server-issued `cart_item_id` when present, otherwise a
/// `slug__variant` fallback for lines that are not persisted yet. All
/// transient sync state is indexed by this key, so it must not change for a
/// line while a commit is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey(String);

impl ItemKey {
    pub fn for_line(line: &CartLine) -> Self {
        match &line.cart_item_id {
            Some(id) => ItemKey(id.clone()),
            None => ItemKey(format!("{}__{}", line.product_slug, line.variant_id)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(cart_item_id: Option<&str>, inventory: Option<u32>) -> CartLine {
        CartLine {
            cart_item_id: cart_item_id.map(str::to_string),
            variant_id: "v-42".into(),
            product_slug: "aviator-classic".into(),
            quantity: 2,
            available_inventory: inventory,
            status: LineStatus::Available,
        }
    }

    #[test]
    fn item_key_prefers_server_id() {
        let key = ItemKey::for_line(&line(Some("ci-123"), None));
        assert_eq!(key.as_str(), "ci-123");
    }

    #[test]
    fn item_key_falls_back_to_slug_and_variant() {
        let key = ItemKey::for_line(&line(None, None));
        assert_eq!(key.as_str(), "aviator-classic__v-42");
    }

    #[test]
    fn purchase_limit_caps_at_inventory_then_hard_cap() {
        assert_eq!(line(None, Some(10)).purchase_limit(), 10);
        assert_eq!(line(None, Some(500)).purchase_limit(), MAX_LINE_QUANTITY);
        assert_eq!(line(None, None).purchase_limit(), MAX_LINE_QUANTITY);
    }

    #[test]
    fn clamp_quantity_bounds_both_ends() {
        let l = line(None, Some(10));
        assert_eq!(l.clamp_quantity(150), 10);
        assert_eq!(l.clamp_quantity(0), 1);
        assert_eq!(l.clamp_quantity(7), 7);
    }

    #[test]
    fn clamp_quantity_with_zero_inventory_still_floors_at_one() {
        // Lines with no purchasable stock should be OutOfStock and guarded
        // upstream; the clamp itself never produces zero.
        assert_eq!(line(None, Some(0)).clamp_quantity(3), 1);
    }

    #[test]
    fn out_of_stock_and_unavailable_are_not_editable() {
        assert!(LineStatus::Available.is_editable());
        assert!(LineStatus::Unknown.is_editable());
        assert!(!LineStatus::OutOfStock.is_editable());
        assert!(!LineStatus::Unavailable.is_editable());
    }
}
