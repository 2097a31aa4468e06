//! Batch import of externally supplied rows into the catalog, ledger and
//! history.
//!
//! Each batch is validated in full before any row is applied: one row missing
//! a required column rejects the whole file with [`StoreError::Format`].
//! Malformed numbers are not errors; they become zero. Imported orders are
//! history only and never move stock or balances.

use crate::catalog::{normalize_barcode, Catalog, Product, DEFAULT_CATEGORY};
use crate::csv_io::{cell, Record};
use crate::error::{Result, StoreError};
use crate::history::History;
use crate::ids;
use crate::ledger::{Customer, Ledger};
use crate::money::{coerce_int, coerce_non_negative};
use crate::order::{normalize_timestamp, Order, OrderStatus, PaymentMethod};
use log::{debug, info, warn};
use std::collections::HashMap;

/// Customer id given to imported orders, whose buyer is only known by name.
pub const IMPORTED_CUSTOMER_ID: &str = "C-IMP";

const ORDER_ID_COLUMNS: &[&str] = &["收據號碼", "訂單編號"];
const DATE_COLUMNS: &[&str] = &["日期"];
const CASHIER_COLUMNS: &[&str] = &["收銀員", "收銀員名稱"];
const CUSTOMER_COLUMNS: &[&str] = &["客戶"];
const TOTAL_COLUMNS: &[&str] = &["總計", "銷售總額"];
const METHOD_COLUMNS: &[&str] = &["付費方式"];

/// Outcome of an accepted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportReport {
    /// New entities created.
    pub added: usize,

    /// Existing entities (matched by id) updated in place.
    pub updated: usize,

    /// Rows ignored, e.g. orders whose id is already in history.
    pub skipped: usize,
}

/// Imports products (`id?,name,category?,price?,stock?,barcode?`).
///
/// A row whose id matches an existing product replaces it, including its
/// stock count. Missing ids are generated; unseen categories are registered.
pub fn import_products(catalog: &mut Catalog, records: &[Record]) -> Result<ImportReport> {
    for (idx, record) in records.iter().enumerate() {
        require(record, idx, "name", &["name"])?;
    }

    let mut assigned: Vec<String> = Vec::new();
    let mut products = Vec::with_capacity(records.len());
    for record in records {
        let id = match cell(record, &["id"]) {
            Some(id) => id.to_string(),
            None => ids::next_id(
                "P",
                3,
                catalog
                    .products()
                    .iter()
                    .map(|p| p.id.as_str())
                    .chain(assigned.iter().map(String::as_str)),
            ),
        };
        assigned.push(id.clone());

        products.push(Product {
            id,
            name: cell(record, &["name"]).unwrap_or_default().to_string(),
            price: coerce_non_negative(cell(record, &["price"]).unwrap_or_default(), "price"),
            category: cell(record, &["category"])
                .unwrap_or(DEFAULT_CATEGORY)
                .to_string(),
            stock: coerce_int(cell(record, &["stock"]).unwrap_or_default()),
            barcode: normalize_barcode(cell(record, &["barcode"]).map(str::to_string)),
        });
    }
    check_barcodes(catalog, &products)?;

    let mut report = ImportReport::default();
    for product in products {
        if catalog.get(&product.id).is_some() {
            report.updated += 1;
        } else {
            report.added += 1;
        }
        debug!("Importing product {} ({})", product.id, product.name);
        catalog.upsert(product);
    }

    info!(
        "Imported products: {} added, {} updated",
        report.added, report.updated
    );
    Ok(report)
}

/// Imports customers (`id?,name,dept,balance?`).
///
/// New customers take the balance column as their opening balance. For an
/// existing id only name and department are updated.
pub fn import_customers(ledger: &mut Ledger, records: &[Record]) -> Result<ImportReport> {
    for (idx, record) in records.iter().enumerate() {
        require(record, idx, "name", &["name"])?;
        require(record, idx, "dept", &["dept"])?;
    }

    let mut assigned: Vec<String> = Vec::new();
    let mut customers = Vec::with_capacity(records.len());
    for record in records {
        let id = match cell(record, &["id"]) {
            Some(id) => id.to_string(),
            None => ids::next_id(
                "C",
                3,
                ledger
                    .customers()
                    .iter()
                    .map(|c| c.id.as_str())
                    .chain(assigned.iter().map(String::as_str)),
            ),
        };
        assigned.push(id.clone());

        customers.push(Customer {
            id,
            name: cell(record, &["name"]).unwrap_or_default().to_string(),
            dept: cell(record, &["dept"]).unwrap_or_default().to_string(),
            balance: coerce_int(cell(record, &["balance"]).unwrap_or_default()),
        });
    }

    let mut report = ImportReport::default();
    for customer in customers {
        ledger.add_department(&customer.dept)?;
        match ledger.get(&customer.id) {
            Some(existing) => {
                if existing.balance != customer.balance {
                    debug!(
                        "Customer {} already exists, keeping balance {}",
                        customer.id, existing.balance
                    );
                }
                report.updated += 1;
            }
            None => report.added += 1,
        }
        ledger.upsert_imported(customer);
    }

    info!(
        "Imported customers: {} added, {} updated",
        report.added, report.updated
    );
    Ok(report)
}

/// Imports flattened order history as exported by the receipts report.
///
/// Orders are recorded as completed with no line items; they count towards
/// totals but not per-item figures. Ids already present are skipped.
/// Imported orders are listed after the terminal's own orders.
pub fn import_orders(history: &mut History, records: &[Record]) -> Result<ImportReport> {
    for (idx, record) in records.iter().enumerate() {
        require(record, idx, "收據號碼", ORDER_ID_COLUMNS)?;
    }

    let mut report = ImportReport::default();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut orders = Vec::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        let row = idx + 2;
        let order_id = cell(record, ORDER_ID_COLUMNS).unwrap_or_default().to_string();

        if history.contains(&order_id) {
            warn!("Row {}: order {} already in history, skipping", row, order_id);
            report.skipped += 1;
            continue;
        }
        if let Some(first) = seen.insert(order_id.clone(), row) {
            warn!(
                "Row {}: order {} duplicates row {}, skipping",
                row, order_id, first
            );
            report.skipped += 1;
            continue;
        }

        orders.push(Order {
            order_id,
            date: normalize_timestamp(cell(record, DATE_COLUMNS).unwrap_or_default()),
            cashier: cell(record, CASHIER_COLUMNS)
                .unwrap_or("Imported")
                .to_string(),
            customer_id: IMPORTED_CUSTOMER_ID.to_string(),
            customer_name: cell(record, CUSTOMER_COLUMNS)
                .unwrap_or("Unknown")
                .to_string(),
            items: Vec::new(),
            total: coerce_non_negative(cell(record, TOTAL_COLUMNS).unwrap_or_default(), "total"),
            method: PaymentMethod::from_label(cell(record, METHOD_COLUMNS).unwrap_or_default()),
            status: OrderStatus::Completed,
        });
    }

    for order in orders {
        history.insert_imported(order)?;
        report.added += 1;
    }

    info!(
        "Imported orders: {} added, {} skipped",
        report.added, report.skipped
    );
    Ok(report)
}

fn require(record: &Record, idx: usize, column: &str, accepted: &[&str]) -> Result<()> {
    if cell(record, accepted).is_none() {
        return Err(StoreError::Format {
            row: idx + 2,
            message: format!("missing required column {column:?}"),
        });
    }
    Ok(())
}

fn check_barcodes(catalog: &Catalog, batch: &[Product]) -> Result<()> {
    let mut owners: HashMap<&str, &str> = HashMap::new();
    for (idx, product) in batch.iter().enumerate() {
        let Some(code) = product.barcode.as_deref() else {
            continue;
        };

        let clash = match owners.insert(code, product.id.as_str()) {
            Some(owner) if owner != product.id => Some(owner.to_string()),
            _ => catalog
                .find_by_barcode(code)
                .filter(|p| p.id != product.id && !batch.iter().any(|b| b.id == p.id))
                .map(|p| p.id.clone()),
        };
        if let Some(owner) = clash {
            return Err(StoreError::Format {
                row: idx + 2,
                message: format!("barcode {code} already belongs to {owner}"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_io::parse_records;
    use std::io::Cursor;

    fn records(text: &str) -> Vec<Record> {
        parse_records(Cursor::new(text)).unwrap()
    }

    fn seeded_catalog() -> Catalog {
        Catalog::new(
            vec![Product {
                id: "P002".into(),
                name: "可口可樂".into(),
                price: 30,
                category: "飲料".into(),
                stock: 110,
                barcode: Some("88002".into()),
            }],
            vec!["飲料".into()],
        )
    }

    #[test]
    fn test_import_products_defaults_and_coercion() {
        let mut catalog = seeded_catalog();
        let rows = records("name,price,stock,category\n礦泉水,20,abc,\n拖鞋,-3,12.9,雜貨\n");

        let report = import_products(&mut catalog, &rows).unwrap();
        assert_eq!(report, ImportReport { added: 2, updated: 0, skipped: 0 });

        let water = catalog.get("P003").unwrap();
        assert_eq!(water.name, "礦泉水");
        assert_eq!(water.stock, 0);
        assert_eq!(water.category, DEFAULT_CATEGORY);

        let slippers = catalog.get("P004").unwrap();
        assert_eq!(slippers.price, 0);
        assert_eq!(slippers.stock, 12);
        assert!(catalog.categories().iter().any(|c| c == DEFAULT_CATEGORY));
    }

    #[test]
    fn test_import_products_merges_existing_id() {
        let mut catalog = seeded_catalog();
        let rows = records("id,name,price,stock,barcode\nP002,可樂,35,50,88002\n");

        let report = import_products(&mut catalog, &rows).unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(catalog.products().len(), 1);
        assert_eq!(catalog.get("P002").unwrap().stock, 50);
    }

    #[test]
    fn test_import_products_missing_name_rejects_batch() {
        let mut catalog = seeded_catalog();
        let rows = records("name,price\n泡麵,45\n,10\n");

        assert!(matches!(
            import_products(&mut catalog, &rows),
            Err(StoreError::Format { row: 3, .. })
        ));
        assert_eq!(catalog.products().len(), 1);
    }

    #[test]
    fn test_import_products_barcode_clash_rejects_batch() {
        let mut catalog = seeded_catalog();
        let rows = records("name,barcode\n泡麵,88009\n水,88002\n");
        assert!(matches!(
            import_products(&mut catalog, &rows),
            Err(StoreError::Format { row: 3, .. })
        ));

        let rows = records("name,barcode\n泡麵,88009\n水,88009\n");
        assert!(import_products(&mut catalog, &rows).is_err());
        assert_eq!(catalog.products().len(), 1);
    }

    #[test]
    fn test_import_customers_all_or_nothing() {
        let mut ledger = Ledger::default();
        let rows = records("name,dept\n張三,指揮部\n李四,\n王五,輪機部\n");

        assert!(matches!(
            import_customers(&mut ledger, &rows),
            Err(StoreError::Format { row: 3, .. })
        ));
        assert!(ledger.customers().is_empty());
    }

    #[test]
    fn test_import_customers_opening_balance_and_merge() {
        let mut ledger = Ledger::default();
        let rows = records("id,name,dept,balance\nC001,張三,指揮部,120\n,李四,補給部,x\n");
        let report = import_customers(&mut ledger, &rows).unwrap();

        assert_eq!(report.added, 2);
        assert_eq!(ledger.get("C001").unwrap().balance, 120);
        assert_eq!(ledger.get("C002").unwrap().balance, 0);
        assert!(ledger.departments().iter().any(|d| d == "補給部"));

        let again = records("id,name,dept,balance\nC001,張三 (艦長),指揮部,0\n");
        let report = import_customers(&mut ledger, &again).unwrap();
        assert_eq!(report.updated, 1);
        let customer = ledger.get("C001").unwrap();
        assert_eq!(customer.name, "張三 (艦長)");
        assert_eq!(customer.balance, 120);
    }

    #[test]
    fn test_import_orders_reconstructs_history() {
        let mut history = History::default();
        let rows = records(
            "日期,收據號碼,付費方式,銷售總額,購買品項,收銀員名稱,客戶\n\
             2024/3/1 9:00:00,#0001,現金,60,2 X 可口可樂,福利委員,張三\n\
             2024-03-02 10:00:00,#0002,記帳,175.0,,,\n",
        );

        let report = import_orders(&mut history, &rows).unwrap();
        assert_eq!(report.added, 2);

        let first = history.get("#0001").unwrap();
        assert_eq!(first.date, "2024-03-01 09:00:00");
        assert_eq!(first.method, PaymentMethod::Cash);
        assert_eq!(first.total, 60);
        assert!(first.items.is_empty());
        assert_eq!(first.status, OrderStatus::Completed);
        assert_eq!(first.customer_id, IMPORTED_CUSTOMER_ID);

        let second = history.get("#0002").unwrap();
        assert_eq!(second.method, PaymentMethod::Tab);
        assert_eq!(second.total, 175);
        assert_eq!(second.cashier, "Imported");
        assert_eq!(second.customer_name, "Unknown");
    }

    #[test]
    fn test_import_orders_accepts_alternate_id_column_and_skips_duplicates() {
        let mut history = History::default();
        let rows = records("訂單編號,總計\n#0001,10\n#0001,20\n");
        let report = import_orders(&mut history, &rows).unwrap();
        assert_eq!(report, ImportReport { added: 1, updated: 0, skipped: 1 });

        let report = import_orders(&mut history, &rows).unwrap();
        assert_eq!(report.skipped, 2);
        assert_eq!(history.len(), 1);
        assert_eq!(history.get("#0001").unwrap().total, 10);
    }

    #[test]
    fn test_import_orders_missing_id_rejects_batch() {
        let mut history = History::default();
        let rows = records("日期,總計\n2024-03-01,10\n");
        assert!(matches!(
            import_orders(&mut history, &rows),
            Err(StoreError::Format { row: 2, .. })
        ));
        assert!(history.is_empty());
    }

    #[test]
    fn test_import_orders_list_after_existing_history() {
        let mut history = History::default();
        let live = records("收據號碼,日期,總計
#0001,2024-03-05,30
");
        import_orders(&mut history, &live).unwrap();
        let rows = records("收據號碼,日期,總計
#0101,2024-03-01,10
#0102,2024-03-02,20
");
        import_orders(&mut history, &rows).unwrap();

        let ids: Vec<_> = history.recent().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, ["#0001", "#0101", "#0102"]);
    }

    #[test]
    fn test_import_huge_order_totals_fail_reports() {
        let mut history = History::default();
        let rows = records(
            "收據號碼,日期,付費方式,總計
             #0001,2024-03-01,記帳,9223372036854775807
             #0002,2024-03-02,記帳,9223372036854775807
",
        );
        import_orders(&mut history, &rows).unwrap();

        let range = crate::history::DateRange::parse("2024-03-01", "2024-03-31").unwrap();
        assert!(matches!(
            history.summary(&range),
            Err(StoreError::OutOfRange(_))
        ));
        assert!(matches!(
            crate::report::tab_report(&history, &Ledger::default(), &range),
            Err(StoreError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_import_products_after_maximal_id_suffix() {
        let mut catalog = seeded_catalog();
        import_products(&mut catalog, &records("id,name
P18446744073709551615,x
")).unwrap();

        let report = import_products(&mut catalog, &records("name
y
")).unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(catalog.products().len(), 3);
        assert!(catalog.products().iter().any(|p| p.name == "y" && p.id == "P001"));
    }
}
