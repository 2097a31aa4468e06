//! Append-only order history with refund status mutation and reporting queries.
//!
//! Insertion order is the source of truth for order-id sequencing; displays
//! and query results are newest-first.

use crate::error::{Result, StoreError};
use crate::ids;
use crate::order::{date_key, Order, OrderStatus, PaymentMethod, DATE_FORMAT};
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;

/// Inclusive calendar-date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    start: String,
    end: String,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange {
            start: start.format(DATE_FORMAT).to_string(),
            end: end.format(DATE_FORMAT).to_string(),
        }
    }

    /// Parses `YYYY-MM-DD` bounds.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let parse = |field: &'static str, raw: &str| {
            NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
                .map_err(|_| StoreError::invalid(field, format!("{raw:?} is not YYYY-MM-DD")))
        };
        Ok(DateRange::new(parse("start date", start)?, parse("end date", end)?))
    }

    /// A single day.
    pub fn day(date: NaiveDate) -> Self {
        DateRange::new(date, date)
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    /// Whether a stored timestamp falls within the range.
    ///
    /// Plain string comparison on the zero-padded date prefix.
    pub fn contains(&self, timestamp: &str) -> bool {
        let key = date_key(timestamp);
        key >= self.start.as_str() && key <= self.end.as_str()
    }
}

/// Conjunctive filter over the history. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    pub customer_id: Option<String>,
    pub date_range: Option<DateRange>,
    pub status: Option<OrderStatus>,
    pub method: Option<PaymentMethod>,
}

impl OrderQuery {
    pub fn new() -> Self {
        OrderQuery::default()
    }

    pub fn customer(mut self, id: impl Into<String>) -> Self {
        self.customer_id = Some(id.into());
        self
    }

    pub fn between(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn method(mut self, method: PaymentMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.customer_id
            .as_deref()
            .map_or(true, |id| order.customer_id == id)
            && self
                .date_range
                .as_ref()
                .map_or(true, |range| range.contains(&order.date))
            && self.status.map_or(true, |s| order.status == s)
            && self.method.map_or(true, |m| order.method == m)
    }
}

/// Aggregate figures over a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SalesSummary {
    /// Orders of any status.
    pub receipt_count: usize,

    /// Total of completed orders.
    pub sales_total: i64,

    /// Total of refunded orders.
    pub refund_total: i64,

    /// `sales_total - refund_total`.
    pub net_revenue: i64,
}

/// The collection of committed and imported orders.
#[derive(Debug, Clone, Default)]
pub struct History {
    orders: Vec<Order>,
}

impl History {
    /// Wraps persisted orders, given in insertion order.
    pub fn new(orders: Vec<Order>) -> Self {
        History { orders }
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Orders in insertion order.
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Orders newest-first.
    pub fn recent(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().rev()
    }

    pub fn get(&self, order_id: &str) -> Option<&Order> {
        self.orders.iter().find(|o| o.order_id == order_id)
    }

    pub fn contains(&self, order_id: &str) -> bool {
        self.get(order_id).is_some()
    }

    /// Appends an order. Order ids are unique across the history.
    pub fn append(&mut self, order: Order) -> Result<&Order> {
        if self.contains(&order.order_id) {
            return Err(StoreError::invalid(
                "order_id",
                format!("{} already exists", order.order_id),
            ));
        }
        debug!("Appended order {}", order.order_id);
        self.orders.push(order);
        Ok(&self.orders[self.orders.len() - 1])
    }

    /// Files imported orders behind the live history, so listings show them
    /// after every order taken on this terminal, in file order.
    pub(crate) fn insert_imported(&mut self, order: Order) -> Result<()> {
        if self.contains(&order.order_id) {
            return Err(StoreError::invalid(
                "order_id",
                format!("{} already exists", order.order_id),
            ));
        }
        debug!("Imported order {}", order.order_id);
        self.orders.insert(0, order);
        Ok(())
    }

    /// Flips a completed order to refunded, in place.
    pub fn mark_refunded(&mut self, order_id: &str) -> Result<&Order> {
        let order = self
            .orders
            .iter_mut()
            .find(|o| o.order_id == order_id)
            .ok_or_else(|| StoreError::not_found("Order", order_id))?;

        if order.status == OrderStatus::Refunded {
            return Err(StoreError::AlreadyRefunded(order_id.to_string()));
        }
        order.status = OrderStatus::Refunded;
        Ok(&*order)
    }

    /// Orders matching `query`, newest-first.
    pub fn query(&self, query: &OrderQuery) -> Vec<&Order> {
        self.recent().filter(|o| query.matches(o)).collect()
    }

    /// Next `#NNNN` id: history size + 1, bumped past ids already taken by
    /// imported history.
    pub fn next_order_id(&self) -> String {
        let mut seq = self.orders.len() as u64 + 1;
        loop {
            let id = ids::format_id("#", 4, seq);
            if !self.contains(&id) {
                return id;
            }
            seq += 1;
        }
    }

    /// Receipt count and sales/refund totals for orders in `range`.
    ///
    /// Fails with `OutOfRange` when a total does not fit in `i64`, which only
    /// imported history can cause.
    pub fn summary(&self, range: &DateRange) -> Result<SalesSummary> {
        let overflow = || StoreError::OutOfRange("sales summary".to_string());
        let mut summary = SalesSummary::default();
        for order in self.orders.iter().filter(|o| range.contains(&o.date)) {
            summary.receipt_count += 1;
            let bucket = match order.status {
                OrderStatus::Completed => &mut summary.sales_total,
                OrderStatus::Refunded => &mut summary.refund_total,
            };
            *bucket = bucket.checked_add(order.total).ok_or_else(overflow)?;
        }
        summary.net_revenue = summary
            .sales_total
            .checked_sub(summary.refund_total)
            .ok_or_else(overflow)?;
        Ok(summary)
    }
}

/// Partitions orders by calendar date, newest date first.
///
/// Orders keep their relative order inside each group.
pub fn group_by_date<'a, I>(orders: I) -> Vec<(String, Vec<&'a Order>)>
where
    I: IntoIterator<Item = &'a Order>,
{
    let mut groups: BTreeMap<&str, Vec<&Order>> = BTreeMap::new();
    for order in orders {
        groups.entry(order.date_key()).or_default().push(order);
    }
    groups
        .into_iter()
        .rev()
        .map(|(day, orders)| (day.to_string(), orders))
        .collect()
}
