//! Order engine: commits carts into orders and reverses them on refund.
//!
//! The engine owns the [`Store`] it mutates; nothing else reaches into the
//! catalog, ledger or history while a commit or refund is in progress.
//!
//! Both operations validate every precondition before touching any state and
//! then apply their effects in one uninterrupted sequence. With a single
//! writer this makes them atomic: no caller can observe stock decremented
//! without the order recorded, or the order refunded without the balance
//! reversed. A multi-terminal deployment would need a real transaction here.

use crate::cart::{Cart, CartLine};
use crate::catalog::Catalog;
use crate::error::{Result, StoreError};
use crate::history::History;
use crate::ledger::Ledger;
use crate::money::checked_line_total;
use crate::order::{format_timestamp, Order, OrderStatus, PaymentMethod};
use crate::users::UserDirectory;
use chrono::{Local, NaiveDateTime};
use log::{info, warn};

/// All persistent collections of the terminal.
#[derive(Debug, Clone, Default)]
pub struct Store {
    pub catalog: Catalog,
    pub ledger: Ledger,
    pub history: History,
    pub users: UserDirectory,
}

/// Switches for the lenient stock and refund rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnginePolicy {
    /// Put refunded items back into stock.
    pub restock_on_refund: bool,

    /// Let a sale drive stock below zero instead of rejecting it.
    pub allow_oversell: bool,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        EnginePolicy {
            restock_on_refund: true,
            allow_oversell: true,
        }
    }
}

/// The transaction engine.
#[derive(Debug, Clone, Default)]
pub struct OrderEngine {
    store: Store,
    policy: EnginePolicy,
}

impl OrderEngine {
    pub fn new(store: Store, policy: EnginePolicy) -> Self {
        OrderEngine { store, policy }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Administrative access to the collections (product edits, customer
    /// maintenance, imports).
    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn into_store(self) -> Store {
        self.store
    }

    pub fn policy(&self) -> EnginePolicy {
        self.policy
    }

    /// Commits the cart using the local clock. See [`OrderEngine::commit_at`].
    pub fn commit(
        &mut self,
        cart: &mut Cart,
        customer_id: Option<&str>,
        cashier: &str,
        method: PaymentMethod,
    ) -> Result<Order> {
        self.commit_at(cart, customer_id, cashier, method, Local::now().naive_local())
    }

    /// Turns the cart into a completed order.
    ///
    /// Decrements stock for every line, charges the total to the customer's
    /// balance for tab orders, appends the order to history and clears the
    /// cart. Fails with [`StoreError::InvalidCommit`] on an empty cart or a
    /// missing customer, in which case nothing changes.
    pub fn commit_at(
        &mut self,
        cart: &mut Cart,
        customer_id: Option<&str>,
        cashier: &str,
        method: PaymentMethod,
        at: NaiveDateTime,
    ) -> Result<Order> {
        if cart.is_empty() {
            return Err(StoreError::InvalidCommit("cart is empty".to_string()));
        }
        let customer_id = customer_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StoreError::InvalidCommit("no customer selected".to_string()))?;
        let customer = self
            .store
            .ledger
            .get(customer_id)
            .ok_or_else(|| StoreError::not_found("Customer", customer_id))?;

        let items: Vec<CartLine> = cart.lines().to_vec();
        let total = checked_line_total(items.iter().map(|l| (l.price, l.qty)))
            .ok_or_else(|| StoreError::OutOfRange("order total".to_string()))?;

        let stock_changes = self.plan_sale(&items)?;
        match method {
            PaymentMethod::Tab => {
                customer
                    .balance
                    .checked_add(total)
                    .ok_or_else(|| StoreError::OutOfRange(format!("balance of {customer_id}")))?;
            }
            PaymentMethod::Cash => {}
        }

        let order = Order {
            order_id: self.store.history.next_order_id(),
            date: format_timestamp(at),
            cashier: cashier.to_string(),
            customer_id: customer.id.clone(),
            customer_name: customer.name.clone(),
            items,
            total,
            method,
            status: OrderStatus::Completed,
        };

        // Everything below has been validated; apply in one go.
        for (product_id, qty) in &stock_changes {
            let remaining = self.store.catalog.adjust_stock(product_id, -qty)?;
            if remaining < 0 {
                warn!(
                    "Order {}: product {} oversold, stock now {}",
                    order.order_id, product_id, remaining
                );
            }
        }
        match method {
            PaymentMethod::Tab => {
                self.store.ledger.adjust_balance(&order.customer_id, total)?;
            }
            PaymentMethod::Cash => {}
        }
        self.store.history.append(order.clone())?;
        cart.clear();

        info!(
            "Committed order {} ({} {} for {})",
            order.order_id, method, order.total, order.customer_id
        );
        Ok(order)
    }

    /// Refunds a completed order.
    ///
    /// Marks it refunded, removes a tab order's total from the customer's
    /// balance and, under the default policy, restocks its items. A second
    /// refund of the same order fails with [`StoreError::AlreadyRefunded`]
    /// and changes nothing.
    pub fn refund(&mut self, order_id: &str) -> Result<Order> {
        let order = self
            .store
            .history
            .get(order_id)
            .ok_or_else(|| StoreError::not_found("Order", order_id))?;
        if order.status == OrderStatus::Refunded {
            return Err(StoreError::AlreadyRefunded(order_id.to_string()));
        }

        let balance_reversal = match order.method {
            PaymentMethod::Tab => self.plan_reversal(order)?,
            PaymentMethod::Cash => None,
        };
        let restock = if self.policy.restock_on_refund {
            self.plan_restock(order)?
        } else {
            Vec::new()
        };

        let refunded = self.store.history.mark_refunded(order_id)?.clone();
        if let Some((customer_id, amount)) = balance_reversal {
            self.store.ledger.adjust_balance(&customer_id, -amount)?;
        }
        for (product_id, qty) in &restock {
            self.store.catalog.adjust_stock(product_id, *qty)?;
        }

        info!(
            "Refunded order {} ({} {})",
            refunded.order_id, refunded.method, refunded.total
        );
        Ok(refunded)
    }

    /// Stock decrements for a sale, checked against overflow and, when
    /// oversell is disabled, against the stock on hand.
    fn plan_sale(&self, items: &[CartLine]) -> Result<Vec<(String, i64)>> {
        let mut changes = Vec::with_capacity(items.len());
        for line in items {
            let Some(product) = self.store.catalog.get(&line.product_id) else {
                warn!(
                    "Product {} ({}) no longer in catalog, selling without stock change",
                    line.product_id, line.name
                );
                continue;
            };

            let remaining = product
                .stock
                .checked_sub(line.qty)
                .ok_or_else(|| StoreError::OutOfRange(format!("stock of {}", product.id)))?;
            if remaining < 0 && !self.policy.allow_oversell {
                return Err(StoreError::InsufficientStock {
                    product_id: product.id.clone(),
                    available: product.stock,
                    requested: line.qty,
                });
            }
            changes.push((product.id.clone(), line.qty));
        }
        Ok(changes)
    }

    /// Balance reversal for a tab order, or `None` when the customer is gone.
    fn plan_reversal(&self, order: &Order) -> Result<Option<(String, i64)>> {
        let Some(customer) = self.store.ledger.get(&order.customer_id) else {
            warn!(
                "Order {}: customer {} no longer exists, no balance to reverse",
                order.order_id, order.customer_id
            );
            return Ok(None);
        };
        customer
            .balance
            .checked_sub(order.total)
            .ok_or_else(|| StoreError::OutOfRange(format!("balance of {}", customer.id)))?;
        Ok(Some((customer.id.clone(), order.total)))
    }

    fn plan_restock(&self, order: &Order) -> Result<Vec<(String, i64)>> {
        let mut changes = Vec::with_capacity(order.items.len());
        for line in &order.items {
            match self.store.catalog.get(&line.product_id) {
                Some(product) => {
                    product
                        .stock
                        .checked_add(line.qty)
                        .ok_or_else(|| StoreError::OutOfRange(format!("stock of {}", product.id)))?;
                    changes.push((product.id.clone(), line.qty));
                }
                None => warn!(
                    "Order {}: product {} deleted, not restocked",
                    order.order_id, line.product_id
                ),
            }
        }
        Ok(changes)
    }
}
