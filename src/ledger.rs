//! Customer accounts and their tab balances.
//!
//! A balance is the amount the customer owes the store. It may take any sign
//! and has no credit limit. [`Ledger::adjust_balance`] is the only mutator;
//! commit adds a tab order's total and refund subtracts it again.

use crate::error::{Result, StoreError};
use crate::ids;
use log::debug;
use serde::{Deserialize, Serialize};

/// A known customer who may buy on credit.
///
/// # Invariants
///
/// - `balance` changes only through [`Ledger::adjust_balance`], apart from the
///   initial value of a first-time import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Unique customer identifier.
    pub id: String,

    pub name: String,

    /// Department name, or empty.
    #[serde(default)]
    pub dept: String,

    /// Amount owed to the store, in minor units.
    #[serde(default)]
    pub balance: i64,
}

/// Input for [`Ledger::add_customer`]. New customers always start at zero.
#[derive(Debug, Clone, Default)]
pub struct CustomerDraft {
    pub id: Option<String>,
    pub name: String,
    pub dept: String,
}

/// Administrative edit. There is deliberately no balance field.
#[derive(Debug, Clone, Default)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub dept: Option<String>,
}

/// The authoritative customer list.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    customers: Vec<Customer>,
    departments: Vec<String>,
}

impl Ledger {
    pub fn new(customers: Vec<Customer>, departments: Vec<String>) -> Self {
        Ledger {
            customers,
            departments,
        }
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn departments(&self) -> &[String] {
        &self.departments
    }

    pub fn get(&self, id: &str) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == id)
    }

    /// Customers in a department, or all of them when `dept` is `None`.
    pub fn by_department(&self, dept: Option<&str>) -> Vec<&Customer> {
        self.customers
            .iter()
            .filter(|c| dept.map_or(true, |d| c.dept == d))
            .collect()
    }

    /// Adds a customer with a zero balance.
    pub fn add_customer(&mut self, draft: CustomerDraft) -> Result<&Customer> {
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            return Err(StoreError::invalid("name", "customer name is required"));
        }

        let id = match draft.id.filter(|id| !id.trim().is_empty()) {
            Some(id) => {
                if self.get(&id).is_some() {
                    return Err(StoreError::invalid("id", format!("{id} already exists")));
                }
                id
            }
            None => self.next_customer_id(),
        };

        debug!("Added customer {} ({})", id, name);
        self.customers.push(Customer {
            id,
            name,
            dept: draft.dept.trim().to_string(),
            balance: 0,
        });

        Ok(&self.customers[self.customers.len() - 1])
    }

    /// Edits name or department. The balance is untouched.
    pub fn update_customer(&mut self, id: &str, patch: CustomerPatch) -> Result<&Customer> {
        let index = self.index_of(id)?;
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(StoreError::invalid("name", "customer name is required"));
            }
        }

        let customer = &mut self.customers[index];
        if let Some(name) = patch.name {
            customer.name = name.trim().to_string();
        }
        if let Some(dept) = patch.dept {
            customer.dept = dept.trim().to_string();
        }
        Ok(&self.customers[index])
    }

    /// Removes a customer. Orders keep their `customer_id` and name snapshot.
    pub fn delete_customer(&mut self, id: &str) -> Result<Customer> {
        let index = self.index_of(id)?;
        debug!("Deleted customer {}", id);
        Ok(self.customers.remove(index))
    }

    /// Adds `delta` to a customer's balance and returns the new balance.
    pub fn adjust_balance(&mut self, id: &str, delta: i64) -> Result<i64> {
        let index = self.index_of(id)?;
        let customer = &mut self.customers[index];
        customer.balance = customer
            .balance
            .checked_add(delta)
            .ok_or_else(|| StoreError::OutOfRange(format!("balance of {id}")))?;

        debug!(
            "Balance of {} adjusted by {} to {}",
            id, delta, customer.balance
        );
        Ok(customer.balance)
    }

    /// Registers a department. Returns `false` if it already existed.
    pub fn add_department(&mut self, name: &str) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::invalid("department", "name is required"));
        }
        if self.departments.iter().any(|d| d == name) {
            return Ok(false);
        }
        self.departments.push(name.to_string());
        Ok(true)
    }

    /// Renames a department and moves its customers along.
    pub fn rename_department(&mut self, old: &str, new: &str) -> Result<usize> {
        let new = new.trim();
        if new.is_empty() {
            return Err(StoreError::invalid("department", "name is required"));
        }
        let position = self
            .departments
            .iter()
            .position(|d| d == old)
            .ok_or_else(|| StoreError::not_found("Department", old))?;
        if old == new {
            return Ok(0);
        }
        if self.departments.iter().any(|d| d == new) {
            return Err(StoreError::invalid("department", format!("{new} already exists")));
        }

        self.departments[position] = new.to_string();
        Ok(self.reassign(old, new))
    }

    /// Deletes a department; its customers are kept with an empty dept.
    pub fn delete_department(&mut self, name: &str) -> Result<usize> {
        let position = self
            .departments
            .iter()
            .position(|d| d == name)
            .ok_or_else(|| StoreError::not_found("Department", name))?;
        self.departments.remove(position);
        Ok(self.reassign(name, ""))
    }

    /// Inserts a new customer or updates name/dept of an existing one.
    ///
    /// The balance of an existing customer is never overwritten: it only
    /// moves through [`Ledger::adjust_balance`].
    pub(crate) fn upsert_imported(&mut self, customer: Customer) {
        match self.customers.iter_mut().find(|c| c.id == customer.id) {
            Some(existing) => {
                existing.name = customer.name;
                existing.dept = customer.dept;
            }
            None => self.customers.push(customer),
        }
    }

    pub(crate) fn next_customer_id(&self) -> String {
        ids::next_id("C", 3, self.customers.iter().map(|c| c.id.as_str()))
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.customers
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StoreError::not_found("Customer", id))
    }

    fn reassign(&mut self, from: &str, to: &str) -> usize {
        let mut moved = 0;
        for customer in self.customers.iter_mut().filter(|c| c.dept == from) {
            customer.dept = to.to_string();
            moved += 1;
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crew() -> Ledger {
        let mut ledger = Ledger::new(Vec::new(), vec!["指揮部".into(), "輪機部".into()]);
        for (id, name, dept) in [
            ("C001", "張三 (艦長)", "指揮部"),
            ("C003", "王五 (輪機長)", "輪機部"),
        ] {
            ledger
                .add_customer(CustomerDraft {
                    id: Some(id.into()),
                    name: name.into(),
                    dept: dept.into(),
                })
                .unwrap();
        }
        ledger
    }

    #[test]
    fn test_new_customer_has_zero_balance() {
        let mut ledger = crew();
        let customer = ledger
            .add_customer(CustomerDraft {
                name: "阿財 (伙房兵)".into(),
                dept: "補給部".into(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(customer.id, "C004");
        assert_eq!(customer.balance, 0);
    }

    #[test]
    fn test_adjust_balance_round_trip_nets_zero() {
        let mut ledger = crew();
        assert_eq!(ledger.adjust_balance("C001", 175).unwrap(), 175);
        assert_eq!(ledger.adjust_balance("C001", -175).unwrap(), 0);
    }

    #[test]
    fn test_balance_may_go_negative() {
        let mut ledger = crew();
        assert_eq!(ledger.adjust_balance("C003", -40).unwrap(), -40);
    }

    #[test]
    fn test_adjust_balance_unknown_customer() {
        let mut ledger = crew();
        assert!(matches!(
            ledger.adjust_balance("C404", 1),
            Err(StoreError::NotFound { entity: "Customer", .. })
        ));
    }

    #[test]
    fn test_adjust_balance_overflow() {
        let mut ledger = crew();
        ledger.adjust_balance("C001", i64::MAX).unwrap();
        assert!(matches!(
            ledger.adjust_balance("C001", 1),
            Err(StoreError::OutOfRange(_))
        ));
        assert_eq!(ledger.get("C001").unwrap().balance, i64::MAX);
    }

    #[test]
    fn test_update_customer_keeps_balance() {
        let mut ledger = crew();
        ledger.adjust_balance("C001", 50).unwrap();
        let patch = CustomerPatch {
            dept: Some("輪機部".into()),
            ..Default::default()
        };
        let customer = ledger.update_customer("C001", patch).unwrap();
        assert_eq!(customer.dept, "輪機部");
        assert_eq!(customer.balance, 50);
    }

    #[test]
    fn test_delete_department_blanks_customers() {
        let mut ledger = crew();
        assert_eq!(ledger.delete_department("指揮部").unwrap(), 1);
        assert_eq!(ledger.get("C001").unwrap().dept, "");
        assert_eq!(ledger.by_department(Some("")).len(), 1);
    }

    #[test]
    fn test_rename_department_cascades() {
        let mut ledger = crew();
        assert_eq!(ledger.rename_department("輪機部", "機艙").unwrap(), 1);
        assert_eq!(ledger.get("C003").unwrap().dept, "機艙");
        assert!(ledger.departments().iter().any(|d| d == "機艙"));
    }

    #[test]
    fn test_upsert_imported_preserves_existing_balance() {
        let mut ledger = crew();
        ledger.adjust_balance("C001", 90).unwrap();
        ledger.upsert_imported(Customer {
            id: "C001".into(),
            name: "張三".into(),
            dept: "指揮部".into(),
            balance: 0,
        });
        let customer = ledger.get("C001").unwrap();
        assert_eq!(customer.name, "張三");
        assert_eq!(customer.balance, 90);
    }
}
