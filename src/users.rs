//! Cashier accounts and PIN lookup.

use crate::error::{Result, StoreError};
use crate::ids;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
}

/// A cashier who can log in to the terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    /// Four ASCII digits.
    pub pin: String,
    pub role: Role,
    /// Set for seeded accounts until the user picks a PIN of their own.
    #[serde(default)]
    pub require_change: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Vec<User>,
}

impl UserDirectory {
    pub fn new(users: Vec<User>) -> Self {
        UserDirectory { users }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn get(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Finds the user owning `pin`.
    pub fn authenticate(&self, pin: &str) -> Option<&User> {
        self.users.iter().find(|u| u.pin == pin)
    }

    pub fn add_user(&mut self, name: &str, pin: &str, role: Role) -> Result<&User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::invalid("name", "cashier name is required"));
        }
        self.ensure_pin_usable(pin, None)?;

        let id = ids::next_id("U", 3, self.users.iter().map(|u| u.id.as_str()));
        self.users.push(User {
            id,
            name: name.to_string(),
            pin: pin.to_string(),
            role,
            require_change: false,
        });
        Ok(&self.users[self.users.len() - 1])
    }

    pub fn rename_user(&mut self, id: &str, name: &str) -> Result<&User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::invalid("name", "cashier name is required"));
        }
        let index = self.index_of(id)?;
        self.users[index].name = name.to_string();
        Ok(&self.users[index])
    }

    /// Sets a new PIN and clears the forced-change flag.
    pub fn change_pin(&mut self, id: &str, pin: &str) -> Result<&User> {
        let index = self.index_of(id)?;
        self.ensure_pin_usable(pin, Some(id))?;

        let user = &mut self.users[index];
        user.pin = pin.to_string();
        user.require_change = false;
        Ok(&self.users[index])
    }

    pub fn delete_user(&mut self, id: &str) -> Result<User> {
        let index = self.index_of(id)?;
        Ok(self.users.remove(index))
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| StoreError::not_found("User", id))
    }

    // PINs double as login identity, so two users may not share one.
    fn ensure_pin_usable(&self, pin: &str, owner: Option<&str>) -> Result<()> {
        if pin.len() != 4 || !pin.bytes().all(|b| b.is_ascii_digit()) {
            return Err(StoreError::invalid("pin", "must be exactly 4 digits"));
        }
        if self
            .users
            .iter()
            .any(|u| u.pin == pin && Some(u.id.as_str()) != owner)
        {
            return Err(StoreError::invalid("pin", "already in use"));
        }
        Ok(())
    }
}
