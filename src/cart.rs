//! The single active cart of a cashier session.
//!
//! Lines freeze the product's name and price the first time it is added, so
//! the checkout total always matches what the customer was shown.

use crate::catalog::Product;
use crate::error::{Result, StoreError};
use crate::money::checked_line_total;
use serde::{Deserialize, Serialize};

/// One product in the cart, or one item of a committed order.
///
/// # Invariants
///
/// - `qty` is always positive while the line is in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,

    /// Name at the time the product was first added.
    pub name: String,

    /// Unit price at the time the product was first added.
    pub price: i64,

    pub qty: i64,
}

impl CartLine {
    /// `price * qty`, saturating at the `i64` bounds.
    pub fn line_total(&self) -> i64 {
        self.price.saturating_mul(self.qty)
    }
}

/// An ordered collection of cart lines, unique by product id.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Cart::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Adds one unit of `product`.
    ///
    /// An existing line is incremented without re-reading the product's
    /// current price; a new line snapshots name and price now.
    pub fn add_item(&mut self, product: &Product) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            line.qty = line.qty.saturating_add(1);
            return;
        }

        self.lines.push(CartLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            qty: 1,
        });
    }

    /// Sets a line's quantity; zero or less removes the line.
    pub fn set_qty(&mut self, product_id: &str, qty: i64) -> Result<()> {
        let index = self.index_of(product_id)?;
        if qty <= 0 {
            self.lines.remove(index);
        } else {
            self.lines[index].qty = qty;
        }
        Ok(())
    }

    /// Changes a line's quantity by `delta`, removing it at zero.
    pub fn change_qty(&mut self, product_id: &str, delta: i64) -> Result<()> {
        let index = self.index_of(product_id)?;
        let qty = self.lines[index].qty.saturating_add(delta);
        self.set_qty(product_id, qty)
    }

    /// Drops a line regardless of its quantity.
    pub fn remove_item(&mut self, product_id: &str) -> Result<CartLine> {
        let index = self.index_of(product_id)?;
        Ok(self.lines.remove(index))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of `price * qty` over all lines, for display.
    ///
    /// Saturates at `i64::MAX`; committing such a cart fails with
    /// `OutOfRange`.
    pub fn total(&self) -> i64 {
        checked_line_total(self.lines.iter().map(|l| (l.price, l.qty))).unwrap_or(i64::MAX)
    }

    /// Sum of quantities, saturating.
    pub fn count(&self) -> i64 {
        self.lines.iter().fold(0i64, |acc, l| acc.saturating_add(l.qty))
    }

    fn index_of(&self, product_id: &str) -> Result<usize> {
        self.lines
            .iter()
            .position(|l| l.product_id == product_id)
            .ok_or_else(|| StoreError::not_found("Cart line", product_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, price: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("item {id}"),
            price,
            category: "雜貨".to_string(),
            stock: 10,
            barcode: None,
        }
    }

    #[test]
    fn test_add_same_product_increments() {
        let mut cart = Cart::new();
        let coke = product("P002", 30);
        cart.add_item(&coke);
        cart.add_item(&coke);

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.get("P002").unwrap().qty, 2);
        assert_eq!(cart.total(), 60);
        assert_eq!(cart.count(), 2);
    }

    #[test]
    fn test_price_frozen_at_first_add() {
        let mut cart = Cart::new();
        let mut coke = product("P002", 30);
        cart.add_item(&coke);
        coke.price = 50;
        cart.add_item(&coke);

        assert_eq!(cart.get("P002").unwrap().price, 30);
        assert_eq!(cart.total(), 60);
    }

    #[test]
    fn test_decrement_to_one_keeps_line() {
        let mut cart = Cart::new();
        let coke = product("P002", 30);
        cart.add_item(&coke);
        cart.add_item(&coke);
        cart.change_qty("P002", -1).unwrap();

        assert_eq!(cart.get("P002").unwrap().qty, 1);
    }

    #[test]
    fn test_qty_zero_removes_line() {
        let mut cart = Cart::new();
        cart.add_item(&product("P002", 30));
        cart.add_item(&product("P003", 45));

        cart.change_qty("P002", -1).unwrap();
        assert!(cart.get("P002").is_none());

        cart.set_qty("P003", -4).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), 0);
        assert_eq!(cart.count(), 0);
    }

    #[test]
    fn test_set_qty_unknown_line() {
        let mut cart = Cart::new();
        assert!(matches!(
            cart.set_qty("P404", 2),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new();
        cart.add_item(&product("P002", 30));
        cart.add_item(&product("P003", 45));
        cart.set_qty("P003", 3).unwrap();

        assert_eq!(cart.total(), 165);
        let removed = cart.remove_item("P002").unwrap();
        assert_eq!(removed.qty, 1);
        assert_eq!(cart.count(), 3);

        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_huge_quantity_saturates_display_total() {
        let mut cart = Cart::new();
        cart.add_item(&product("P002", 30));
        cart.set_qty("P002", i64::MAX).unwrap();

        assert_eq!(cart.get("P002").unwrap().line_total(), i64::MAX);
        assert_eq!(cart.total(), i64::MAX);
        assert_eq!(cart.count(), i64::MAX);
    }
}
