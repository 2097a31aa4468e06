//! CSV exports and the tab settlement report.

use crate::catalog::Catalog;
use crate::csv_io::serialize_records;
use crate::error::{Result, StoreError};
use crate::history::{DateRange, History, OrderQuery};
use crate::ledger::Ledger;
use crate::order::{Order, OrderStatus, PaymentMethod};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write;

/// Header row of the receipts export, also accepted by the order import.
pub const ORDER_EXPORT_HEADERS: [&str; 7] = [
    "日期",
    "收據號碼",
    "付費方式",
    "銷售總額",
    "購買品項",
    "收銀員名稱",
    "客戶",
];

const UNKNOWN_DEPT: &str = "未知";
const OTHER_DEPT: &str = "其他";

/// Writes the catalog as `id,name,price,category,stock,barcode`.
pub fn export_products<W: Write>(catalog: &Catalog, writer: W) -> Result<()> {
    let rows = catalog.products().iter().map(|p| {
        vec![
            p.id.clone(),
            p.name.clone(),
            p.price.to_string(),
            p.category.clone(),
            p.stock.to_string(),
            p.barcode.clone().unwrap_or_default(),
        ]
    });
    serialize_records(
        writer,
        &["id", "name", "price", "category", "stock", "barcode"],
        rows,
    )
}

/// Writes customers as `id,name,dept,balance`.
pub fn export_customers<W: Write>(ledger: &Ledger, writer: W) -> Result<()> {
    let rows = ledger.customers().iter().map(|c| {
        vec![
            c.id.clone(),
            c.name.clone(),
            c.dept.clone(),
            c.balance.to_string(),
        ]
    });
    serialize_records(writer, &["id", "name", "dept", "balance"], rows)
}

/// Writes orders in the flattened receipts layout.
///
/// The item column is for people to read; it cannot be imported back into
/// structured lines.
pub fn export_orders<'a, W, I>(orders: I, writer: W) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a Order>,
{
    let rows = orders.into_iter().map(|o| {
        vec![
            o.date.clone(),
            o.order_id.clone(),
            o.method.label().to_string(),
            o.total.to_string(),
            o.item_summary(),
            o.cashier.clone(),
            o.customer_name.clone(),
        ]
    });
    serialize_records(writer, &ORDER_EXPORT_HEADERS, rows)
}

/// Builds the tab settlement text for completed tab orders in `range`.
///
/// Amounts are grouped by the customer's current department, then by the
/// customer name recorded on the order. Fails with `NotFound` when no tab
/// order falls in the range and with `OutOfRange` when a sum overflows.
pub fn tab_report(history: &History, ledger: &Ledger, range: &DateRange) -> Result<String> {
    let query = OrderQuery::new()
        .between(range.clone())
        .method(PaymentMethod::Tab)
        .status(OrderStatus::Completed);
    let orders = history.query(&query);
    if orders.is_empty() {
        return Err(StoreError::not_found(
            "Tab order",
            format!("{} - {}", range.start(), range.end()),
        ));
    }

    let mut departments: BTreeMap<&str, BTreeMap<&str, i64>> = BTreeMap::new();
    for order in orders {
        let dept = department_of(ledger, order);
        let amount = departments
            .entry(dept)
            .or_default()
            .entry(order.customer_name.as_str())
            .or_default();
        *amount = checked_sum(*amount, order.total)?;
    }

    let mut text = String::new();
    let _ = write!(
        text,
        "記帳日期：{} - {}\n\n",
        range.start().replace('-', "."),
        range.end().replace('-', ".")
    );

    let mut grand_total = 0;
    for (dept, customers) in &departments {
        let _ = writeln!(text, "{dept}");
        let mut dept_total = 0;
        for (name, amount) in customers {
            let _ = writeln!(text, " . {name}：${amount}");
            dept_total = checked_sum(dept_total, *amount)?;
        }
        let _ = write!(text, " 小計：${dept_total}元\n\n");
        grand_total = checked_sum(grand_total, dept_total)?;
    }
    let _ = write!(text, "記帳總金額合計：${grand_total}元");

    Ok(text)
}

fn checked_sum(acc: i64, amount: i64) -> Result<i64> {
    acc.checked_add(amount)
        .ok_or_else(|| StoreError::OutOfRange("tab report total".to_string()))
}

fn department_of<'a>(ledger: &'a Ledger, order: &'a Order) -> &'a str {
    match ledger.get(&order.customer_id) {
        Some(customer) if !customer.dept.is_empty() => customer.dept.as_str(),
        Some(_) => UNKNOWN_DEPT,
        None if order.customer_name.contains('(') => OTHER_DEPT,
        None => UNKNOWN_DEPT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartLine;
    use crate::ledger::Customer;

    fn ledger() -> Ledger {
        Ledger::new(
            vec![
                Customer {
                    id: "C001".into(),
                    name: "張三 (艦長)".into(),
                    dept: "指揮部".into(),
                    balance: 0,
                },
                Customer {
                    id: "C003".into(),
                    name: "王五 (輪機長)".into(),
                    dept: "輪機部".into(),
                    balance: 0,
                },
            ],
            Vec::new(),
        )
    }

    fn tab(id: &str, date: &str, customer_id: &str, name: &str, total: i64) -> Order {
        Order {
            order_id: id.into(),
            date: date.into(),
            cashier: "福利委員".into(),
            customer_id: customer_id.into(),
            customer_name: name.into(),
            items: Vec::new(),
            total,
            method: PaymentMethod::Tab,
            status: OrderStatus::Completed,
        }
    }

    #[test]
    fn test_tab_report_layout() {
        let mut history = History::new(vec![
            tab("#0001", "2024-03-01 09:00:00", "C001", "張三 (艦長)", 100),
            tab("#0002", "2024-03-02 09:00:00", "C003", "王五 (輪機長)", 45),
            tab("#0003", "2024-03-03 09:00:00", "C001", "張三 (艦長)", 75),
            tab("#0004", "2024-03-03 10:00:00", "C001", "張三 (艦長)", 999),
            tab("#0005", "2024-04-01 09:00:00", "C001", "張三 (艦長)", 500),
            tab("#0006", "2024-03-04 09:00:00", "C009", "老李 (退伍)", 30),
        ]);
        history.mark_refunded("#0004").unwrap();

        let range = DateRange::parse("2024-03-01", "2024-03-31").unwrap();
        let text = tab_report(&history, &ledger(), &range).unwrap();

        assert_eq!(
            text,
            "記帳日期：2024.03.01 - 2024.03.31\n\n\
             其他\n . 老李 (退伍)：$30\n 小計：$30元\n\n\
             指揮部\n . 張三 (艦長)：$175\n 小計：$175元\n\n\
             輪機部\n . 王五 (輪機長)：$45\n 小計：$45元\n\n\
             記帳總金額合計：$250元"
        );
    }

    #[test]
    fn test_tab_report_empty_range() {
        let history = History::default();
        let range = DateRange::parse("2024-03-01", "2024-03-31").unwrap();
        assert!(matches!(
            tab_report(&history, &ledger(), &range),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_tab_report_overflowing_department_total() {
        let history = History::new(vec![
            tab("#0001", "2024-03-01 09:00:00", "C001", "張三 (艦長)", i64::MAX),
            tab("#0002", "2024-03-02 09:00:00", "C002", "李四 (副長)", 1),
        ]);
        let mut ledger = ledger();
        ledger
            .add_customer(crate::ledger::CustomerDraft {
                id: Some("C002".into()),
                name: "李四 (副長)".into(),
                dept: "指揮部".into(),
            })
            .unwrap();

        let range = DateRange::parse("2024-03-01", "2024-03-31").unwrap();
        assert!(matches!(
            tab_report(&history, &ledger, &range),
            Err(StoreError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_export_orders_layout() {
        let mut order = tab("#0001", "2024-03-01 09:00:00", "C001", "張三 (艦長)", 80);
        order.items = vec![
            CartLine {
                product_id: "P002".into(),
                name: "可口可樂".into(),
                price: 30,
                qty: 2,
            },
            CartLine {
                product_id: "P005".into(),
                name: "打火機".into(),
                price: 20,
                qty: 1,
            },
        ];

        let mut out = Vec::new();
        export_orders([&order], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "\u{feff}日期,收據號碼,付費方式,銷售總額,購買品項,收銀員名稱,客戶\r\n\
             2024-03-01 09:00:00,#0001,記帳,80,2 X 可口可樂; 1 X 打火機,福利委員,張三 (艦長)\r\n"
        );
    }

    #[test]
    fn test_export_customers() {
        let mut out = Vec::new();
        export_customers(&ledger(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("\u{feff}id,name,dept,balance\r\n"));
        assert!(text.contains("C003,王五 (輪機長),輪機部,0\r\n"));
    }
}
