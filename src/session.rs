//! A single cashier session on the terminal.
//!
//! [`Terminal`] ties the engine to a key-value store: it loads the
//! collections on open and writes all of them back after every mutation.
//! A failed write-back is logged and the in-memory change stands.

use crate::cart::Cart;
use crate::csv_io::parse_records;
use crate::engine::{EnginePolicy, OrderEngine, Store};
use crate::error::{Result, StoreError};
use crate::import::{import_customers, import_orders, import_products, ImportReport};
use crate::order::{Order, PaymentMethod};
use crate::persist::{load_store, save_store, KeyValueStore};
use crate::users::User;
use log::{debug, warn};
use std::io::Read;

pub struct Terminal {
    engine: OrderEngine,
    cart: Cart,
    kv: Box<dyn KeyValueStore>,
    user_id: Option<String>,
    customer_id: Option<String>,
}

impl Terminal {
    /// Loads (or seeds) every collection from `kv`.
    pub fn open(kv: Box<dyn KeyValueStore>, policy: EnginePolicy) -> Result<Self> {
        let store = load_store(kv.as_ref())?;
        Ok(Terminal {
            engine: OrderEngine::new(store, policy),
            cart: Cart::new(),
            kv,
            user_id: None,
            customer_id: None,
        })
    }

    pub fn store(&self) -> &Store {
        self.engine.store()
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn current_user(&self) -> Option<&User> {
        self.user_id
            .as_deref()
            .and_then(|id| self.engine.store().users.get(id))
    }

    pub fn active_customer(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }

    /// Logs in the cashier owning `pin`.
    pub fn login(&mut self, pin: &str) -> Result<&User> {
        let user = self
            .engine
            .store()
            .users
            .authenticate(pin)
            .ok_or_else(|| StoreError::invalid("pin", "no cashier with this PIN"))?;
        debug!("Cashier {} logged in", user.id);
        self.user_id = Some(user.id.clone());
        Ok(user)
    }

    /// Ends the session; the cart and customer selection are dropped.
    pub fn logout(&mut self) {
        self.user_id = None;
        self.customer_id = None;
        self.cart.clear();
    }

    pub fn select_customer(&mut self, customer_id: &str) -> Result<()> {
        if self.engine.store().ledger.get(customer_id).is_none() {
            return Err(StoreError::not_found("Customer", customer_id));
        }
        self.customer_id = Some(customer_id.to_string());
        Ok(())
    }

    pub fn clear_customer(&mut self) {
        self.customer_id = None;
    }

    /// Adds one unit of a product, looked up by id or barcode.
    pub fn add_to_cart(&mut self, code: &str) -> Result<()> {
        let catalog = &self.engine.store().catalog;
        let product = catalog
            .get(code)
            .or_else(|| catalog.find_by_barcode(code))
            .ok_or_else(|| StoreError::not_found("Product", code))?;
        self.cart.add_item(product);
        Ok(())
    }

    pub fn set_qty(&mut self, product_id: &str, qty: i64) -> Result<()> {
        self.cart.set_qty(product_id, qty)
    }

    pub fn change_qty(&mut self, product_id: &str, delta: i64) -> Result<()> {
        self.cart.change_qty(product_id, delta)
    }

    pub fn remove_from_cart(&mut self, product_id: &str) -> Result<()> {
        self.cart.remove_item(product_id).map(|_| ())
    }

    /// Commits the cart for the active customer under the logged-in cashier.
    pub fn checkout(&mut self, method: PaymentMethod) -> Result<Order> {
        let cashier = self
            .current_user()
            .map(|u| u.name.clone())
            .ok_or_else(|| StoreError::InvalidCommit("no cashier logged in".to_string()))?;
        let order = self.engine.commit(
            &mut self.cart,
            self.customer_id.as_deref(),
            &cashier,
            method,
        )?;
        self.customer_id = None;
        self.persist();
        Ok(order)
    }

    pub fn refund(&mut self, order_id: &str) -> Result<Order> {
        let order = self.engine.refund(order_id)?;
        self.persist();
        Ok(order)
    }

    pub fn import_products<R: Read>(&mut self, reader: R) -> Result<ImportReport> {
        let records = parse_records(reader)?;
        let report = import_products(&mut self.engine.store_mut().catalog, &records)?;
        self.persist();
        Ok(report)
    }

    pub fn import_customers<R: Read>(&mut self, reader: R) -> Result<ImportReport> {
        let records = parse_records(reader)?;
        let report = import_customers(&mut self.engine.store_mut().ledger, &records)?;
        self.persist();
        Ok(report)
    }

    pub fn import_orders<R: Read>(&mut self, reader: R) -> Result<ImportReport> {
        let records = parse_records(reader)?;
        let report = import_orders(&mut self.engine.store_mut().history, &records)?;
        self.persist();
        Ok(report)
    }

    /// Runs an administrative edit against the store and persists the result.
    ///
    /// Nothing is written when `edit` fails.
    pub fn administer<T, F>(&mut self, edit: F) -> Result<T>
    where
        F: FnOnce(&mut Store) -> Result<T>,
    {
        let value = edit(self.engine.store_mut())?;
        self.persist();
        Ok(value)
    }

    fn persist(&mut self) {
        if let Err(e) = save_store(self.kv.as_mut(), self.engine.store()) {
            warn!("Failed to persist store: {}", e);
        }
    }
}
