//! # Crew Store
//!
//! Point-of-sale engine for a ship's crew store: a product catalog with
//! stock, crew accounts that run a tab, a cart, and an order engine that
//! commits carts into an append-only sales history and reverses them on
//! refund.
//!
//! ## Design Principles
//!
//! - **Integer money**: all amounts are whole minor units (`i64`)
//! - **Frozen prices**: a cart line keeps the price it was added at
//! - **Validate then apply**: commits and refunds never half-apply
//! - **Wholesale persistence**: every collection is one JSON document
//!
//! ## Example
//!
//! ```
//! use crew_store::{load_store, Cart, EnginePolicy, MemoryStore, OrderEngine, PaymentMethod};
//!
//! let store = load_store(&MemoryStore::new()).unwrap();
//! let mut engine = OrderEngine::new(store, EnginePolicy::default());
//!
//! let mut cart = Cart::new();
//! cart.add_item(engine.store().catalog.get("P002").unwrap());
//! cart.set_qty("P002", 2).unwrap();
//!
//! let order = engine
//!     .commit(&mut cart, Some("C001"), "福利委員", PaymentMethod::Tab)
//!     .unwrap();
//! assert_eq!(order.total, 60);
//! assert_eq!(engine.store().ledger.get("C001").unwrap().balance, 60);
//! ```

pub mod cart;
pub mod catalog;
pub mod config;
pub mod csv_io;
pub mod engine;
pub mod error;
pub mod history;
pub mod ids;
pub mod import;
pub mod ledger;
pub mod money;
pub mod order;
pub mod persist;
pub mod report;
pub mod session;
pub mod users;

pub use cart::{Cart, CartLine};
pub use catalog::{Catalog, CategoryFilter, Product, ProductDraft, ProductPatch};
pub use config::{Config, ConfigError};
pub use engine::{EnginePolicy, OrderEngine, Store};
pub use error::{Result, StoreError};
pub use history::{group_by_date, DateRange, History, OrderQuery, SalesSummary};
pub use import::ImportReport;
pub use ledger::{Customer, CustomerDraft, CustomerPatch, Ledger};
pub use order::{Order, OrderStatus, PaymentMethod};
pub use persist::{load_store, save_store, FileStore, KeyValueStore, MemoryStore};
pub use session::Terminal;
pub use users::{Role, User, UserDirectory};
