//! Wholesale persistence of the store collections in a key-value store.
//!
//! Every collection is one JSON document under a fixed key. Collections are
//! read once at startup and rewritten in full after each mutation.

use crate::catalog::{Catalog, Product};
use crate::engine::Store;
use crate::error::Result;
use crate::history::History;
use crate::ledger::{Customer, Ledger};
use crate::order::Order;
use crate::users::{Role, User, UserDirectory};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const USERS_KEY: &str = "pos_users";
pub const PRODUCTS_KEY: &str = "pos_products";
pub const CUSTOMERS_KEY: &str = "pos_customers";
pub const ORDERS_KEY: &str = "pos_orders";
pub const CATEGORIES_KEY: &str = "pos_categories";
pub const DEPARTMENTS_KEY: &str = "pos_departments";

/// A durable string store.
pub trait KeyValueStore {
    /// Returns `None` when nothing has been saved under `key`.
    fn load(&self, key: &str) -> Result<Option<String>>;

    fn save(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Volatile store, for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (and creates if needed) the data directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(FileStore { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        // Readers only ever see a complete file.
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Loads every collection, seeding the ones never saved before.
pub fn load_store(kv: &dyn KeyValueStore) -> Result<Store> {
    let users = load_or(kv, USERS_KEY, seed_users)?;
    let products = load_or(kv, PRODUCTS_KEY, seed_products)?;
    let customers = load_or(kv, CUSTOMERS_KEY, seed_customers)?;
    let orders: Vec<Order> = load_or(kv, ORDERS_KEY, Vec::new)?;
    let categories = load_or(kv, CATEGORIES_KEY, || strings(&SEED_CATEGORIES))?;
    let departments = load_or(kv, DEPARTMENTS_KEY, || strings(&SEED_DEPARTMENTS))?;

    debug!(
        "Loaded {} products, {} customers, {} orders",
        products.len(),
        customers.len(),
        orders.len()
    );

    Ok(Store {
        catalog: Catalog::new(products, categories),
        ledger: Ledger::new(customers, departments),
        history: History::new(orders),
        users: UserDirectory::new(users),
    })
}

/// Rewrites every collection.
pub fn save_store(kv: &mut dyn KeyValueStore, store: &Store) -> Result<()> {
    save(kv, USERS_KEY, store.users.users())?;
    save(kv, PRODUCTS_KEY, store.catalog.products())?;
    save(kv, CUSTOMERS_KEY, store.ledger.customers())?;
    save(kv, ORDERS_KEY, store.history.orders())?;
    save(kv, CATEGORIES_KEY, store.catalog.categories())?;
    save(kv, DEPARTMENTS_KEY, store.ledger.departments())?;
    Ok(())
}

fn load_or<T, F>(kv: &dyn KeyValueStore, key: &str, seed: F) -> Result<T>
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match kv.load(key)? {
        Some(text) => Ok(serde_json::from_str(&text)?),
        None => Ok(seed()),
    }
}

fn save<T: Serialize + ?Sized>(kv: &mut dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let text = serde_json::to_string(value)?;
    kv.save(key, &text)
}

const SEED_CATEGORIES: [&str; 4] = ["雜貨", "飲料", "食品", "藥品"];
const SEED_DEPARTMENTS: [&str; 4] = ["指揮部", "輪機部", "補給部", "戰系部"];

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn seed_products() -> Vec<Product> {
    [
        ("P001", "暈船藥", 150, "藥品", 45, "88001"),
        ("P002", "可口可樂", 30, "飲料", 110, "88002"),
        ("P003", "海鮮泡麵", 45, "食品", 75, "88003"),
        ("P004", "七星香菸", 125, "雜貨", 190, "88004"),
        ("P005", "打火機", 20, "雜貨", 48, "88005"),
        ("P006", "礦泉水", 20, "飲料", 180, "88006"),
        ("P008", "藍白拖", 100, "雜貨", 20, "88007"),
    ]
    .into_iter()
    .map(|(id, name, price, category, stock, barcode)| Product {
        id: id.to_string(),
        name: name.to_string(),
        price,
        category: category.to_string(),
        stock,
        barcode: Some(barcode.to_string()),
    })
    .collect()
}

fn seed_customers() -> Vec<Customer> {
    [
        ("C001", "張三 (艦長)", "指揮部"),
        ("C002", "李四 (副長)", "指揮部"),
        ("C003", "王五 (輪機長)", "輪機部"),
        ("C005", "阿財 (伙房兵)", "補給部"),
    ]
    .into_iter()
    .map(|(id, name, dept)| Customer {
        id: id.to_string(),
        name: name.to_string(),
        dept: dept.to_string(),
        balance: 0,
    })
    .collect()
}

fn seed_users() -> Vec<User> {
    vec![
        User {
            id: "U001".to_string(),
            name: "值更官 (Admin)".to_string(),
            pin: "1234".to_string(),
            role: Role::Admin,
            require_change: true,
        },
        User {
            id: "U002".to_string(),
            name: "福利委員".to_string(),
            pin: "0000".to_string(),
            role: Role::Staff,
            require_change: false,
        },
    ]
}
