//! Crew Store CLI
//!
//! Back-office commands against the terminal's data directory: CSV imports
//! and exports, the tab settlement report, a sales summary and refunds.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- import-products products.csv
//! cargo run -- export-orders 2024-03-01 2024-03-31 > receipts.csv
//! cargo run -- tab-report 2024-03-01 2024-03-31
//! ```
//!
//! # Environment Variables
//!
//! - `CREW_STORE_DATA_DIR`: Directory of the persisted collections
//! - `CREW_STORE_RESTOCK_ON_REFUND`, `CREW_STORE_ALLOW_OVERSELL`: Engine policy
//! - `CREW_STORE_LOW_STOCK_THRESHOLD`: Cut-off for `low-stock`
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity

use crew_store::history::OrderQuery;
use crew_store::report::{export_customers, export_orders, export_products, tab_report};
use crew_store::{Config, DateRange, FileStore, ImportReport, Result, StoreError, Terminal};
use std::env;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::process;

const USAGE: &str = "crew-store <import-products|import-customers|import-orders> <csv> \
                     | <export-products|export-customers|low-stock> \
                     | <export-orders|tab-report|summary> <start> <end> \
                     | refund <order_id>";

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let command = arg(&args, 0)?;

    let config = Config::load()?;
    let kv = FileStore::open(&config.data_dir)?;
    let mut terminal = Terminal::open(Box::new(kv), config.policy())?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        "import-products" => {
            let report = terminal.import_products(open_csv(arg(&args, 1)?)?)?;
            print_report(&mut out, "products", report)?;
        }
        "import-customers" => {
            let report = terminal.import_customers(open_csv(arg(&args, 1)?)?)?;
            print_report(&mut out, "customers", report)?;
        }
        "import-orders" => {
            let report = terminal.import_orders(open_csv(arg(&args, 1)?)?)?;
            print_report(&mut out, "orders", report)?;
        }
        "export-products" => export_products(&terminal.store().catalog, out)?,
        "export-customers" => export_customers(&terminal.store().ledger, out)?,
        "low-stock" => {
            for product in terminal.store().catalog.low_stock(config.low_stock_threshold) {
                writeln!(out, "{}\t{}\t{}", product.id, product.name, product.stock)?;
            }
        }
        "export-orders" => {
            let range = DateRange::parse(arg(&args, 1)?, arg(&args, 2)?)?;
            let orders = terminal
                .store()
                .history
                .query(&OrderQuery::new().between(range));
            export_orders(orders, out)?;
        }
        "tab-report" => {
            let range = DateRange::parse(arg(&args, 1)?, arg(&args, 2)?)?;
            let store = terminal.store();
            writeln!(out, "{}", tab_report(&store.history, &store.ledger, &range)?)?;
        }
        "summary" => {
            let range = DateRange::parse(arg(&args, 1)?, arg(&args, 2)?)?;
            let summary = terminal.store().history.summary(&range)?;
            writeln!(out, "receipts: {}", summary.receipt_count)?;
            writeln!(out, "sales: {}", summary.sales_total)?;
            writeln!(out, "refunds: {}", summary.refund_total)?;
            writeln!(out, "net: {}", summary.net_revenue)?;
        }
        "refund" => {
            let order = terminal.refund(arg(&args, 1)?)?;
            writeln!(
                out,
                "Refunded {} ({} {} for {})",
                order.order_id, order.method, order.total, order.customer_name
            )?;
        }
        other => return Err(StoreError::UnknownCommand(other.to_string())),
    }

    Ok(())
}

fn arg(args: &[String], idx: usize) -> Result<&str> {
    args.get(idx)
        .map(String::as_str)
        .ok_or(StoreError::MissingArgument(USAGE))
}

fn open_csv(path: &str) -> Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}

fn print_report<W: Write>(out: &mut W, what: &str, report: ImportReport) -> Result<()> {
    writeln!(
        out,
        "Imported {}: {} added, {} updated, {} skipped",
        what, report.added, report.updated, report.skipped
    )?;
    Ok(())
}
