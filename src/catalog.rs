//! Product catalog: sellable products, their stock counts and categories.
//!
//! Stock is advisory at the point of sale. A committed sale decrements it
//! unconditionally, so counts may go negative until a restock edit.

use crate::error::{Result, StoreError};
use crate::ids;
use log::debug;
use serde::{Deserialize, Serialize};

/// Category assigned to products whose category was deleted.
pub const UNCATEGORIZED: &str = "未分類";

/// Category used for imported products that name none.
pub const DEFAULT_CATEGORY: &str = "雜貨";

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier.
    pub id: String,

    pub name: String,

    /// Unit price in minor currency units. Never negative.
    pub price: i64,

    pub category: String,

    /// Units on hand. May be negative after an oversell.
    pub stock: i64,

    /// Optional scannable code, unique across the catalog when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
}

/// Input for [`Catalog::add_product`].
#[derive(Debug, Clone, Default)]
pub struct ProductDraft {
    /// Generated when absent.
    pub id: Option<String>,
    pub name: String,
    pub price: i64,
    pub category: String,
    pub stock: i64,
    pub barcode: Option<String>,
}

/// Partial update for [`Catalog::update_product`]. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<i64>,
    pub category: Option<String>,
    /// Explicit restock edit.
    pub stock: Option<i64>,
    /// `Some(None)` clears the barcode.
    pub barcode: Option<Option<String>>,
}

/// Category selector for [`Catalog::list_by_category`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter<'a> {
    All,
    Only(&'a str),
}

/// The authoritative product list.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    categories: Vec<String>,
}

impl Catalog {
    /// Creates a catalog from persisted products and categories.
    ///
    /// Categories referenced by products but missing from the list are
    /// registered so every product points at a known category.
    pub fn new(products: Vec<Product>, categories: Vec<String>) -> Self {
        let mut catalog = Catalog {
            products: Vec::new(),
            categories,
        };
        for product in products {
            catalog.register_category(&product.category);
            catalog.products.push(product);
        }
        catalog
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Looks up a product by its exact barcode.
    pub fn find_by_barcode(&self, barcode: &str) -> Option<&Product> {
        self.products
            .iter()
            .find(|p| p.barcode.as_deref() == Some(barcode))
    }

    /// Adds a product, generating an id when the draft has none.
    ///
    /// A category the catalog has not seen before is registered implicitly.
    pub fn add_product(&mut self, draft: ProductDraft) -> Result<&Product> {
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            return Err(StoreError::invalid("name", "product name is required"));
        }
        validate_price(draft.price)?;

        let id = match draft.id.filter(|id| !id.trim().is_empty()) {
            Some(id) => {
                if self.get(&id).is_some() {
                    return Err(StoreError::invalid("id", format!("{id} already exists")));
                }
                id
            }
            None => self.next_product_id(),
        };

        let barcode = normalize_barcode(draft.barcode);
        self.ensure_barcode_free(barcode.as_deref(), &id)?;

        let category = if draft.category.trim().is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            draft.category.trim().to_string()
        };
        self.register_category(&category);

        debug!("Added product {} ({})", id, name);
        self.products.push(Product {
            id,
            name,
            price: draft.price,
            category,
            stock: draft.stock,
            barcode,
        });

        Ok(&self.products[self.products.len() - 1])
    }

    /// Applies a partial update to an existing product.
    pub fn update_product(&mut self, id: &str, patch: ProductPatch) -> Result<&Product> {
        let index = self.index_of(id)?;

        if let Some(price) = patch.price {
            validate_price(price)?;
        }
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(StoreError::invalid("name", "product name is required"));
            }
        }
        let barcode = patch.barcode.map(normalize_barcode);
        if let Some(Some(code)) = &barcode {
            self.ensure_barcode_free(Some(code), id)?;
        }
        if let Some(category) = &patch.category {
            self.register_category(category.trim());
        }

        let product = &mut self.products[index];
        if let Some(name) = patch.name {
            product.name = name.trim().to_string();
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(category) = patch.category {
            product.category = category.trim().to_string();
        }
        if let Some(stock) = patch.stock {
            product.stock = stock;
        }
        if let Some(barcode) = barcode {
            product.barcode = barcode;
        }

        debug!("Updated product {}", id);
        Ok(&self.products[index])
    }

    /// Removes a product. Historical orders keep their own snapshot.
    pub fn delete_product(&mut self, id: &str) -> Result<Product> {
        let index = self.index_of(id)?;
        debug!("Deleted product {}", id);
        Ok(self.products.remove(index))
    }

    /// Adds `delta` to a product's stock and returns the new count.
    ///
    /// The result may be negative: oversell is tolerated here and policed,
    /// if at all, by the order engine. Only arithmetic overflow is an error.
    pub fn adjust_stock(&mut self, id: &str, delta: i64) -> Result<i64> {
        let index = self.index_of(id)?;
        let product = &mut self.products[index];
        product.stock = product
            .stock
            .checked_add(delta)
            .ok_or_else(|| StoreError::OutOfRange(format!("stock of {id}")))?;
        Ok(product.stock)
    }

    /// Products in a category (or all of them) whose name or barcode contains
    /// `search`, in catalog order.
    pub fn list_by_category(
        &self,
        filter: CategoryFilter<'_>,
        search: Option<&str>,
    ) -> Vec<&Product> {
        let term = search.map(str::trim).filter(|t| !t.is_empty());
        self.products
            .iter()
            .filter(|p| match filter {
                CategoryFilter::All => true,
                CategoryFilter::Only(category) => p.category == category,
            })
            .filter(|p| match term {
                None => true,
                Some(term) => {
                    p.name.contains(term)
                        || p.barcode.as_deref().is_some_and(|b| b.contains(term))
                }
            })
            .collect()
    }

    /// Products whose stock is below `threshold`.
    pub fn low_stock(&self, threshold: i64) -> Vec<&Product> {
        self.products.iter().filter(|p| p.stock < threshold).collect()
    }

    /// Registers a category. Returns `false` if it already existed.
    pub fn add_category(&mut self, name: &str) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::invalid("category", "name is required"));
        }
        Ok(self.register_category(name))
    }

    /// Renames a category and every product filed under it.
    ///
    /// Returns the number of products moved.
    pub fn rename_category(&mut self, old: &str, new: &str) -> Result<usize> {
        let new = new.trim();
        if new.is_empty() {
            return Err(StoreError::invalid("category", "name is required"));
        }
        let position = self
            .categories
            .iter()
            .position(|c| c == old)
            .ok_or_else(|| StoreError::not_found("Category", old))?;
        if old == new {
            return Ok(0);
        }
        if self.categories.iter().any(|c| c == new) {
            return Err(StoreError::invalid("category", format!("{new} already exists")));
        }

        self.categories[position] = new.to_string();
        Ok(self.recategorize(old, new))
    }

    /// Deletes a category; its products move to [`UNCATEGORIZED`].
    pub fn delete_category(&mut self, name: &str) -> Result<usize> {
        let position = self
            .categories
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| StoreError::not_found("Category", name))?;
        self.categories.remove(position);

        let moved = self.recategorize(name, UNCATEGORIZED);
        if moved > 0 {
            self.register_category(UNCATEGORIZED);
        }
        Ok(moved)
    }

    /// Inserts or replaces a product by id. Used by import, which has already
    /// validated the whole batch.
    pub(crate) fn upsert(&mut self, product: Product) {
        self.register_category(&product.category);
        match self.products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product,
            None => self.products.push(product),
        }
    }

    pub(crate) fn next_product_id(&self) -> String {
        ids::next_id("P", 3, self.products.iter().map(|p| p.id.as_str()))
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.products
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| StoreError::not_found("Product", id))
    }

    fn ensure_barcode_free(&self, barcode: Option<&str>, owner: &str) -> Result<()> {
        if let Some(code) = barcode {
            if let Some(other) = self.find_by_barcode(code) {
                if other.id != owner {
                    return Err(StoreError::invalid(
                        "barcode",
                        format!("{code} is already used by {}", other.id),
                    ));
                }
            }
        }
        Ok(())
    }

    fn register_category(&mut self, name: &str) -> bool {
        if name.is_empty() || self.categories.iter().any(|c| c == name) {
            return false;
        }
        self.categories.push(name.to_string());
        true
    }

    fn recategorize(&mut self, from: &str, to: &str) -> usize {
        let mut moved = 0;
        for product in self.products.iter_mut().filter(|p| p.category == from) {
            product.category = to.to_string();
            moved += 1;
        }
        moved
    }
}

fn validate_price(price: i64) -> Result<()> {
    if price < 0 {
        return Err(StoreError::invalid("price", "must not be negative"));
    }
    Ok(())
}

pub(crate) fn normalize_barcode(barcode: Option<String>) -> Option<String> {
    barcode
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, price: i64, category: &str, stock: i64) -> ProductDraft {
        ProductDraft {
            name: name.to_string(),
            price,
            category: category.to_string(),
            stock,
            ..Default::default()
        }
    }

    fn sample() -> Catalog {
        let mut catalog = Catalog::new(Vec::new(), vec!["飲料".into(), "食品".into()]);
        catalog
            .add_product(ProductDraft {
                id: Some("P002".into()),
                barcode: Some("88002".into()),
                ..draft("可口可樂", 30, "飲料", 110)
            })
            .unwrap();
        catalog
            .add_product(ProductDraft {
                id: Some("P003".into()),
                barcode: Some("88003".into()),
                ..draft("海鮮泡麵", 45, "食品", 75)
            })
            .unwrap();
        catalog
    }

    #[test]
    fn test_add_generates_id_and_registers_category() {
        let mut catalog = sample();
        let product = catalog.add_product(draft("暈船藥", 150, "藥品", 45)).unwrap();
        assert_eq!(product.id, "P004");
        assert!(catalog.categories().iter().any(|c| c == "藥品"));
    }

    #[test]
    fn test_add_rejects_negative_price_and_duplicate_id() {
        let mut catalog = sample();
        assert!(matches!(
            catalog.add_product(draft("x", -1, "飲料", 0)),
            Err(StoreError::InvalidField { field: "price", .. })
        ));
        let dup = ProductDraft {
            id: Some("P002".into()),
            ..draft("x", 1, "飲料", 0)
        };
        assert!(matches!(
            catalog.add_product(dup),
            Err(StoreError::InvalidField { field: "id", .. })
        ));
    }

    #[test]
    fn test_barcode_must_be_unique() {
        let mut catalog = sample();
        let clash = ProductDraft {
            barcode: Some("88002".into()),
            ..draft("礦泉水", 20, "飲料", 180)
        };
        assert!(matches!(
            catalog.add_product(clash),
            Err(StoreError::InvalidField { field: "barcode", .. })
        ));

        let patch = ProductPatch {
            barcode: Some(Some("88003".into())),
            ..Default::default()
        };
        assert!(catalog.update_product("P002", patch).is_err());

        // Re-assigning a product its own barcode is fine.
        let patch = ProductPatch {
            barcode: Some(Some("88002".into())),
            ..Default::default()
        };
        assert!(catalog.update_product("P002", patch).is_ok());
    }

    #[test]
    fn test_update_product_patch() {
        let mut catalog = sample();
        let patch = ProductPatch {
            price: Some(35),
            category: Some("零食".into()),
            stock: Some(200),
            barcode: Some(None),
            ..Default::default()
        };
        let product = catalog.update_product("P002", patch).unwrap();
        assert_eq!(product.price, 35);
        assert_eq!(product.stock, 200);
        assert_eq!(product.barcode, None);
        assert!(catalog.categories().iter().any(|c| c == "零食"));
    }

    #[test]
    fn test_adjust_stock_allows_negative() {
        let mut catalog = sample();
        assert_eq!(catalog.adjust_stock("P003", -80).unwrap(), -5);
        assert_eq!(catalog.adjust_stock("P003", 5).unwrap(), 0);
    }

    #[test]
    fn test_adjust_stock_errors() {
        let mut catalog = sample();
        assert!(matches!(
            catalog.adjust_stock("P999", 1),
            Err(StoreError::NotFound { entity: "Product", .. })
        ));
        catalog.update_product("P002", ProductPatch {
            stock: Some(i64::MIN),
            ..Default::default()
        }).unwrap();
        assert!(matches!(
            catalog.adjust_stock("P002", -1),
            Err(StoreError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_list_by_category_and_search() {
        let catalog = sample();
        assert_eq!(catalog.list_by_category(CategoryFilter::All, None).len(), 2);

        let drinks = catalog.list_by_category(CategoryFilter::Only("飲料"), None);
        assert_eq!(drinks.len(), 1);
        assert_eq!(drinks[0].id, "P002");

        let by_name = catalog.list_by_category(CategoryFilter::All, Some("泡麵"));
        assert_eq!(by_name[0].id, "P003");

        let by_barcode = catalog.list_by_category(CategoryFilter::All, Some("8800"));
        assert_eq!(by_barcode.len(), 2);

        assert!(catalog
            .list_by_category(CategoryFilter::Only("食品"), Some("可樂"))
            .is_empty());
    }

    #[test]
    fn test_delete_category_moves_products() {
        let mut catalog = sample();
        assert_eq!(catalog.delete_category("飲料").unwrap(), 1);
        assert_eq!(catalog.get("P002").unwrap().category, UNCATEGORIZED);
        assert!(!catalog.categories().iter().any(|c| c == "飲料"));
    }

    #[test]
    fn test_rename_category_cascades() {
        let mut catalog = sample();
        assert_eq!(catalog.rename_category("食品", "餐點").unwrap(), 1);
        assert_eq!(catalog.get("P003").unwrap().category, "餐點");
        assert!(catalog.rename_category("食品", "x").is_err());
        assert!(catalog.rename_category("餐點", "飲料").is_err());
    }

    #[test]
    fn test_delete_product_and_low_stock() {
        let mut catalog = sample();
        assert_eq!(catalog.low_stock(100).len(), 1);
        catalog.delete_product("P003").unwrap();
        assert!(catalog.get("P003").is_none());
        assert!(catalog.delete_product("P003").is_err());
        assert!(catalog.low_stock(100).is_empty());
    }
}
