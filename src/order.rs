//! Committed orders and their payment method and status.

use crate::cart::CartLine;
use chrono::{NaiveDate, NaiveDateTime};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp layout of [`Order::date`].
///
/// Zero padding is part of the contract: date-range filters compare the
/// `YYYY-MM-DD` prefix as a plain string.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Layout of a date-only key.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// How an order was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Paid on the spot. No ledger effect.
    Cash,

    /// Charged to the customer's balance.
    Tab,
}

impl PaymentMethod {
    /// Label used in exported reports.
    pub fn label(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "現金",
            PaymentMethod::Tab => "記帳",
        }
    }

    /// Reads an exported label. Anything other than cash counts as tab.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "現金" | "cash" | "Cash" | "CASH" => PaymentMethod::Cash,
            _ => PaymentMethod::Tab,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => f.write_str("cash"),
            PaymentMethod::Tab => f.write_str("tab"),
        }
    }
}

/// Lifecycle of a committed order. `Completed → Refunded` happens at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Completed,
    Refunded,
}

/// An immutable record of a sale.
///
/// # Invariants
///
/// - `total == Σ item.price * item.qty` for orders created by commit.
///   Imported orders carry no items and keep the imported total.
/// - Only `status` ever changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// `#NNNN` for orders committed here; imported ids are kept verbatim.
    pub order_id: String,

    /// `YYYY-MM-DD HH:MM:SS`.
    pub date: String,

    /// Cashier name at the time of sale.
    pub cashier: String,

    pub customer_id: String,

    /// Customer name at the time of sale.
    pub customer_name: String,

    /// Cart lines as they were at checkout.
    #[serde(default)]
    pub items: Vec<CartLine>,

    pub total: i64,

    pub method: PaymentMethod,

    pub status: OrderStatus,
}

impl Order {
    /// The `YYYY-MM-DD` part of the timestamp.
    pub fn date_key(&self) -> &str {
        date_key(&self.date)
    }

    pub fn is_refunded(&self) -> bool {
        self.status == OrderStatus::Refunded
    }

    /// Human-readable item list, e.g. `2 X 可口可樂; 1 X 打火機`.
    ///
    /// Not meant to be parsed back into lines.
    pub fn item_summary(&self) -> String {
        self.items
            .iter()
            .map(|i| format!("{} X {}", i.qty, i.name))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Formats a timestamp in the stored order layout.
pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Returns the date part of a stored timestamp.
pub fn date_key(timestamp: &str) -> &str {
    timestamp.split(' ').next().unwrap_or_default()
}

/// Normalises an imported date cell into [`TIMESTAMP_FORMAT`].
///
/// Accepts `YYYY-MM-DD` or `YYYY/MM/DD`, with or without a time, and
/// unpadded components. Anything else is kept verbatim.
pub fn normalize_timestamp(raw: &str) -> String {
    let raw = raw.trim();
    let unified = raw.replace('/', "-");

    for layout in [TIMESTAMP_FORMAT, "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(&unified, layout) {
            return format_timestamp(at);
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(&unified, DATE_FORMAT)
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
    {
        return format_timestamp(midnight);
    }

    if !raw.is_empty() {
        warn!("Unrecognised order date {:?} kept verbatim", raw);
    }
    raw.to_string()
}
